//! Output files and the operator-facing run summary.

use crate::types::{CandidateEntry, FundingEvidence, RunSummary};
use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;
use tracing::{info, warn};

/// One row of the funded-addresses output, the publicly auditable artifact.
#[derive(Debug, Serialize)]
struct FundedRow<'a> {
    #[serde(rename = "Address")]
    address: &'a str,
    #[serde(rename = "Handle")]
    handle: &'a str,
    #[serde(rename = "TweetCreateTime")]
    created_at: &'a str,
    #[serde(rename = "TweetURL")]
    url: &'a str,
    #[serde(rename = "FirstTxHash")]
    first_tx_hash: String,
    #[serde(rename = "Funder")]
    funder: String,
    #[serde(rename = "Block")]
    block: Option<u64>,
    #[serde(rename = "FundedAt")]
    funded_at: Option<i64>,
}

/// One row of the excluded-addresses output: who was checked and rejected,
/// without evidence columns.
#[derive(Debug, Serialize)]
struct ExcludedRow<'a> {
    #[serde(rename = "Address")]
    address: &'a str,
    #[serde(rename = "Handle")]
    handle: &'a str,
    #[serde(rename = "TweetCreateTime")]
    created_at: &'a str,
    #[serde(rename = "TweetURL")]
    url: &'a str,
}

/// Write funded entries with their first-funding evidence.
pub fn write_funded(path: &Path, entries: &[(CandidateEntry, FundingEvidence)]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("failed to create funded file {}", path.display()))?;

    for (entry, evidence) in entries {
        writer.serialize(FundedRow {
            address: &entry.address,
            handle: &entry.handle,
            created_at: &entry.created_at,
            url: &entry.url,
            first_tx_hash: evidence.first_tx_hash.clone().unwrap_or_default(),
            funder: evidence.funder.clone().unwrap_or_default(),
            block: evidence.block,
            funded_at: evidence.first_tx_timestamp,
        })?;
    }
    writer.flush()?;

    info!("Wrote {} funded addresses to {}", entries.len(), path.display());
    Ok(())
}

/// Write checked-and-rejected entries for transparency.
pub fn write_unfunded(path: &Path, entries: &[CandidateEntry]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("failed to create unfunded file {}", path.display()))?;

    for entry in entries {
        writer.serialize(ExcludedRow {
            address: &entry.address,
            handle: &entry.handle,
            created_at: &entry.created_at,
            url: &entry.url,
        })?;
    }
    writer.flush()?;

    info!(
        "Wrote {} unfunded addresses to {}",
        entries.len(),
        path.display()
    );
    Ok(())
}

/// List probe failures so operators can re-run exactly those addresses.
pub fn log_failures(failed: &[(CandidateEntry, String)]) {
    if failed.is_empty() {
        return;
    }

    warn!("{} addresses failed probing and need a re-run:", failed.len());
    for (entry, error) in failed {
        warn!("  {} ({}): {}", entry.address, entry.handle, error);
    }
}

/// Human-readable run summary, printed even after a partial run.
pub fn render_summary(summary: &RunSummary) -> String {
    format!(
        "Validation summary\n\
         ------------------\n\
         addresses:  {} of {} processed\n\
         funded:     {} ({:.1}%)\n\
         unfunded:   {}\n\
         failed:     {}\n\
         elapsed:    {:.1}s ({:.1} req/sec)",
        summary.processed,
        summary.total,
        summary.funded,
        summary.percent_funded(),
        summary.unfunded,
        summary.failed,
        summary.elapsed_secs,
        summary.requests_per_second(),
    )
}
