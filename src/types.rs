//! Core types and data structures for the dropsieve pipeline.

use serde::{Deserialize, Serialize};

/// A lowercased `0x`-prefixed 40-hex-digit EVM address.
pub type EvmAddress = String;

/// A unique wallet address extracted from a giveaway reply, not yet validated.
///
/// Exactly one entry exists per address across the whole input; the entry is
/// attributed to the first reply that mentioned it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateEntry {
    /// Reply record identifier from the export
    #[serde(rename = "ID")]
    pub id: String,
    /// Author handle of the reply
    #[serde(rename = "Handle")]
    pub handle: String,
    /// When the reply was posted (verbatim from the export)
    #[serde(rename = "TweetCreateTime")]
    pub created_at: String,
    /// Permalink to the reply
    #[serde(rename = "TweetURL")]
    pub url: String,
    /// The extracted wallet address, canonicalized to lowercase
    #[serde(rename = "Address")]
    pub address: EvmAddress,
}

/// Result of probing one address for on-chain funding.
///
/// The evidence fields are present if and only if `funded` is true; use the
/// constructors to keep that invariant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundingEvidence {
    /// The probed address
    pub address: EvmAddress,
    /// Whether the address has at least one incoming external transfer
    pub funded: bool,
    /// Hash of the earliest incoming transfer
    pub first_tx_hash: Option<String>,
    /// Unix timestamp (seconds) of the earliest incoming transfer
    pub first_tx_timestamp: Option<i64>,
    /// Address that sent the first funding transfer
    pub funder: Option<EvmAddress>,
    /// Block number of the first funding transfer
    pub block: Option<u64>,
}

impl FundingEvidence {
    /// Evidence for a funded address.
    pub fn funded(
        address: EvmAddress,
        first_tx_hash: String,
        first_tx_timestamp: i64,
        funder: EvmAddress,
        block: u64,
    ) -> Self {
        Self {
            address,
            funded: true,
            first_tx_hash: Some(first_tx_hash),
            first_tx_timestamp: Some(first_tx_timestamp),
            funder: Some(funder),
            block: Some(block),
        }
    }

    /// Evidence for an address with no incoming transfer history.
    pub fn unfunded(address: EvmAddress) -> Self {
        Self {
            address,
            funded: false,
            first_tx_hash: None,
            first_tx_timestamp: None,
            funder: None,
            block: None,
        }
    }
}

/// Terminal state of one probe.
///
/// A probe that exhausted its retries is `Failed`, which is reported
/// separately and never counted as unfunded.
#[derive(Debug, Clone, PartialEq)]
pub enum ProbeOutcome {
    /// The service answered; the address is classified by the evidence
    Evidence(FundingEvidence),
    /// Retries exhausted; the address needs a manual re-run
    Failed {
        /// Last error observed for this address
        error: String,
    },
}

/// One completed probe, fanned in from a worker to the scheduler.
#[derive(Debug, Clone)]
pub struct ProbeReport {
    /// The candidate that was probed
    pub entry: CandidateEntry,
    /// What the probe concluded
    pub outcome: ProbeOutcome,
}

/// Final accounting for one validation run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    /// Candidates handed to the scheduler
    pub total: usize,
    /// Candidates that reached a terminal state
    pub processed: usize,
    /// Addresses with funding evidence
    pub funded: usize,
    /// Addresses checked and found without incoming transfers
    pub unfunded: usize,
    /// Addresses whose probes exhausted retries
    pub failed: usize,
    /// Wall-clock duration of the run in seconds
    pub elapsed_secs: f64,
}

impl RunSummary {
    /// Effective throughput over the whole run.
    pub fn requests_per_second(&self) -> f64 {
        if self.elapsed_secs > 0.0 {
            self.processed as f64 / self.elapsed_secs
        } else {
            0.0
        }
    }

    /// Share of processed addresses that were funded.
    pub fn percent_funded(&self) -> f64 {
        if self.processed > 0 {
            self.funded as f64 / self.processed as f64 * 100.0
        } else {
            0.0
        }
    }
}

/// Everything a validation run produces: the partition plus the summary.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Funded candidates paired with their evidence
    pub funded: Vec<(CandidateEntry, FundingEvidence)>,
    /// Candidates checked and rejected
    pub unfunded: Vec<CandidateEntry>,
    /// Candidates that need a manual re-run, with the last error seen
    pub failed: Vec<(CandidateEntry, String)>,
    /// Final counts and timing
    pub summary: RunSummary,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn funded_evidence_carries_all_fields() {
        let ev = FundingEvidence::funded(
            "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa".to_string(),
            "0xhash".to_string(),
            1_700_000_000,
            "0xbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb".to_string(),
            12345,
        );

        assert!(ev.funded);
        assert_eq!(ev.first_tx_hash.as_deref(), Some("0xhash"));
        assert_eq!(ev.first_tx_timestamp, Some(1_700_000_000));
        assert_eq!(ev.block, Some(12345));
    }

    #[test]
    fn unfunded_evidence_has_no_fields() {
        let ev =
            FundingEvidence::unfunded("0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa".to_string());

        assert!(!ev.funded);
        assert!(ev.first_tx_hash.is_none());
        assert!(ev.first_tx_timestamp.is_none());
        assert!(ev.funder.is_none());
        assert!(ev.block.is_none());
    }

    #[test]
    fn summary_throughput_and_percentage() {
        let summary = RunSummary {
            total: 100,
            processed: 100,
            funded: 40,
            unfunded: 55,
            failed: 5,
            elapsed_secs: 10.0,
        };

        assert_eq!(summary.requests_per_second(), 10.0);
        assert_eq!(summary.percent_funded(), 40.0);
    }

    #[test]
    fn summary_handles_empty_run() {
        let summary = RunSummary {
            total: 0,
            processed: 0,
            funded: 0,
            unfunded: 0,
            failed: 0,
            elapsed_secs: 0.0,
        };

        assert_eq!(summary.requests_per_second(), 0.0);
        assert_eq!(summary.percent_funded(), 0.0);
    }
}
