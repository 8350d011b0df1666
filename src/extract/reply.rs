//! Reply-export rows and the CSV files on either side of extraction.

use crate::types::CandidateEntry;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

/// Columns the reply export must carry. Order in the file does not matter;
/// detection is by header name.
pub const REQUIRED_COLUMNS: [&str; 6] = [
    "ID",
    "Name",
    "Handle",
    "TweetText",
    "TweetCreateTime",
    "TweetURL",
];

/// One row of the reply export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplyRecord {
    /// Record identifier
    #[serde(rename = "ID")]
    pub id: String,
    /// Display name of the author
    #[serde(rename = "Name")]
    pub name: String,
    /// Author handle
    #[serde(rename = "Handle")]
    pub handle: String,
    /// Free-text reply content the address is mined from
    #[serde(rename = "TweetText")]
    pub text: String,
    /// When the reply was posted
    #[serde(rename = "TweetCreateTime")]
    pub created_at: String,
    /// Permalink to the reply
    #[serde(rename = "TweetURL")]
    pub url: String,
}

impl ReplyRecord {
    /// Whether the row carries the fields extraction depends on.
    pub fn is_usable(&self) -> bool {
        !self.id.trim().is_empty() && !self.handle.trim().is_empty()
    }
}

/// Verify that every required column exists in the export header.
///
/// A missing column means the upstream export is malformed, so this is a
/// fatal schema error naming all absent columns, not a per-record error.
pub fn check_schema(headers: &csv::StringRecord) -> Result<()> {
    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .filter(|col| !headers.iter().any(|h| h == **col))
        .copied()
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(anyhow!("missing required columns: {}", missing.join(", ")))
    }
}

/// Read the reply export, validating the schema before any row is parsed.
pub fn read_replies(path: &Path) -> Result<Vec<ReplyRecord>> {
    // The csv reader strips a UTF-8 BOM from the header if the export has one
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("failed to open reply export {}", path.display()))?;

    let headers = reader.headers().context("failed to read export header")?;
    debug!("Detected columns: {:?}", headers);
    check_schema(headers)?;

    let headers = headers.clone();
    let mut rows = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("failed to read export row {}", i + 2))?;
        let row: ReplyRecord = record
            .deserialize(Some(&headers))
            .with_context(|| format!("failed to parse export row {}", i + 2))?;
        rows.push(row);
    }

    info!("Read {} reply rows from {}", rows.len(), path.display());
    Ok(rows)
}

/// Write the deduplicated candidate entries as the intermediate CSV.
pub fn write_candidates(path: &Path, entries: &[CandidateEntry]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("failed to create candidate file {}", path.display()))?;

    for entry in entries {
        writer.serialize(entry)?;
    }
    writer.flush()?;

    info!("Wrote {} candidates to {}", entries.len(), path.display());
    Ok(())
}

/// Read a candidate CSV produced by [`write_candidates`].
pub fn read_candidates(path: &Path) -> Result<Vec<CandidateEntry>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("failed to open candidate file {}", path.display()))?;

    let mut entries = Vec::new();
    for (i, record) in reader.deserialize::<CandidateEntry>().enumerate() {
        let entry = record.with_context(|| format!("failed to parse candidate row {}", i + 2))?;
        entries.push(entry);
    }

    info!("Read {} candidates from {}", entries.len(), path.display());
    Ok(entries)
}
