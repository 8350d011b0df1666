//! Address extraction and deduplication over reply rows.

use crate::extract::reply::ReplyRecord;
use crate::types::CandidateEntry;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use tracing::debug;

/// `0x` followed by exactly 40 hex digits, any case.
static ADDRESS_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"0x[0-9a-fA-F]{40}").unwrap());

/// Counts reported alongside the extracted candidates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractionSummary {
    /// Rows seen in the input
    pub total_rows: usize,
    /// Unique addresses emitted
    pub unique: usize,
    /// Rows whose address was already claimed by an earlier row
    pub duplicates: usize,
    /// Rows with no address pattern (or unusable required fields)
    pub unmatched: usize,
}

/// First address-shaped substring in a reply, if any.
///
/// Policy: when a reply contains several addresses, the earliest one is
/// treated as the author's submission and the rest are ignored.
pub fn first_address(text: &str) -> Option<&str> {
    ADDRESS_PATTERN.find(text).map(|m| m.as_str())
}

/// Extract one deduplicated candidate per unique address, in first-seen order.
///
/// Addresses are canonicalized to lowercase before dedup, so later case
/// variants of an already-seen address count as duplicates and never
/// overwrite the earlier entry.
pub fn extract_candidates(rows: &[ReplyRecord]) -> (Vec<CandidateEntry>, ExtractionSummary) {
    let mut seen: HashSet<String> = HashSet::new();
    let mut entries = Vec::new();
    let mut summary = ExtractionSummary {
        total_rows: rows.len(),
        ..Default::default()
    };

    for row in rows {
        if !row.is_usable() {
            debug!("Skipping row {} with empty required fields", row.id);
            summary.unmatched += 1;
            continue;
        }

        let Some(address) = first_address(&row.text) else {
            debug!("No address in reply {}", row.id);
            summary.unmatched += 1;
            continue;
        };
        let address = address.to_ascii_lowercase();

        if !seen.insert(address.clone()) {
            summary.duplicates += 1;
            continue;
        }

        entries.push(CandidateEntry {
            id: row.id.clone(),
            handle: row.handle.clone(),
            created_at: row.created_at.clone(),
            url: row.url.clone(),
            address,
        });
    }

    summary.unique = entries.len();
    (entries, summary)
}
