//! dropsieve - giveaway reply filter and on-chain funding validator.
//!
//! Turns a raw CSV export of social-media replies into a verified list of
//! EVM addresses with real on-chain funding history: extract and dedup
//! candidate addresses, then probe each one against a chain-data API under
//! bounded concurrency and a global rate ceiling.

pub mod config;
pub mod extract;
pub mod probe;
pub mod report;
pub mod types;

// Re-export main types for convenience
pub use config::ValidatorConfig;
pub use types::{CandidateEntry, FundingEvidence, ProbeOutcome, RunReport, RunSummary};
