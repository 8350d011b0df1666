//! Reply-export ingestion and address extraction.
//!
//! This module turns the raw CSV export of giveaway replies into a
//! deduplicated sequence of candidate wallet addresses. No network access
//! happens here.

pub mod extractor;
pub mod reply;

// Re-export main types
pub use extractor::{extract_candidates, first_address, ExtractionSummary};
pub use reply::{
    check_schema, read_candidates, read_replies, write_candidates, ReplyRecord, REQUIRED_COLUMNS,
};
