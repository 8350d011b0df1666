//! Per-address funding probe with bounded retry.

use crate::probe::data_sources::{Transfer, TransferSource};
use crate::types::{FundingEvidence, ProbeOutcome};
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio_retry::{strategy::ExponentialBackoff, Retry};
use tracing::{instrument, warn};

/// Upper bound on history pages scanned per address. A qualifying incoming
/// transfer normally appears on the first page; the bound keeps one
/// pathological address from pinning a worker.
const MAX_TRANSFER_PAGES: usize = 10;

/// Classifies a single address as funded or unfunded against the chain-data
/// service, retrying transient errors before giving up.
pub struct FundingProbe {
    source: Arc<dyn TransferSource>,
    retry_attempts: usize,
}

impl FundingProbe {
    /// Create a probe over the given transfer source.
    pub fn new(source: Arc<dyn TransferSource>, retry_attempts: usize) -> Self {
        Self {
            source,
            retry_attempts,
        }
    }

    /// Probe one address and return its terminal outcome.
    ///
    /// Exhausted retries produce [`ProbeOutcome::Failed`], never an unfunded
    /// classification.
    #[instrument(skip(self), fields(address = %address))]
    pub async fn check(&self, address: &str) -> ProbeOutcome {
        let retry_strategy = ExponentialBackoff::from_millis(100)
            .max_delay(Duration::from_secs(5))
            .take(self.retry_attempts);

        match Retry::spawn(retry_strategy, || self.first_funding(address)).await {
            Ok(Some(transfer)) => ProbeOutcome::Evidence(FundingEvidence::funded(
                address.to_string(),
                transfer.hash,
                transfer.timestamp,
                transfer.from.to_ascii_lowercase(),
                transfer.block,
            )),
            Ok(None) => ProbeOutcome::Evidence(FundingEvidence::unfunded(address.to_string())),
            Err(e) => {
                warn!("Probe for {} exhausted retries: {:#}", address, e);
                ProbeOutcome::Failed {
                    error: format!("{:#}", e),
                }
            }
        }
    }

    /// Earliest qualifying incoming transfer, following pagination.
    async fn first_funding(&self, address: &str) -> Result<Option<Transfer>> {
        let mut page_key: Option<String> = None;

        for _ in 0..MAX_TRANSFER_PAGES {
            let page = self
                .source
                .incoming_transfers(address, page_key.as_deref())
                .await?;

            if let Some(transfer) = page
                .transfers
                .into_iter()
                .find(|t| is_incoming(address, t))
            {
                return Ok(Some(transfer));
            }

            match page.page_key {
                Some(key) => page_key = Some(key),
                None => return Ok(None),
            }
        }

        warn!(
            "Gave up scanning transfer history for {} after {} pages",
            address, MAX_TRANSFER_PAGES
        );
        Ok(None)
    }
}

/// A transfer counts as funding only when value actually moved into the
/// probed address.
fn is_incoming(address: &str, transfer: &Transfer) -> bool {
    transfer
        .to
        .as_deref()
        .is_some_and(|to| to.eq_ignore_ascii_case(address))
        && transfer.value.unwrap_or(0.0) > 0.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::data_sources::TransferPage;
    use anyhow::anyhow;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const ADDR: &str = "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
    const OTHER: &str = "0xbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";

    fn incoming(hash: &str, block: u64) -> Transfer {
        Transfer {
            hash: hash.to_string(),
            from: OTHER.to_string(),
            to: Some(ADDR.to_string()),
            value: Some(1.0),
            block,
            timestamp: 1_700_000_000 + block as i64,
        }
    }

    fn outgoing(hash: &str, block: u64) -> Transfer {
        Transfer {
            hash: hash.to_string(),
            from: ADDR.to_string(),
            to: Some(OTHER.to_string()),
            value: Some(1.0),
            block,
            timestamp: 1_700_000_000 + block as i64,
        }
    }

    /// Serves a fixed sequence of pages; page keys are indices.
    struct PagedSource {
        pages: Vec<TransferPage>,
    }

    #[async_trait]
    impl TransferSource for PagedSource {
        async fn incoming_transfers(
            &self,
            _address: &str,
            page_key: Option<&str>,
        ) -> Result<TransferPage> {
            let index: usize = page_key.map(|k| k.parse().unwrap()).unwrap_or(0);
            Ok(self.pages[index].clone())
        }
    }

    /// Errors a fixed number of times before delegating to a history.
    struct FlakySource {
        failures: AtomicUsize,
        history: Vec<Transfer>,
    }

    #[async_trait]
    impl TransferSource for FlakySource {
        async fn incoming_transfers(
            &self,
            _address: &str,
            _page_key: Option<&str>,
        ) -> Result<TransferPage> {
            if self.failures.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                n.checked_sub(1)
            }).is_ok()
            {
                return Err(anyhow!("simulated service error"));
            }
            Ok(TransferPage {
                transfers: self.history.clone(),
                page_key: None,
            })
        }
    }

    #[tokio::test]
    async fn empty_history_is_unfunded() {
        let source = Arc::new(PagedSource {
            pages: vec![TransferPage::default()],
        });
        let probe = FundingProbe::new(source, 0);

        let outcome = probe.check(ADDR).await;
        assert_eq!(
            outcome,
            ProbeOutcome::Evidence(FundingEvidence::unfunded(ADDR.to_string()))
        );
    }

    #[tokio::test]
    async fn outgoing_only_history_is_unfunded() {
        let source = Arc::new(PagedSource {
            pages: vec![TransferPage {
                transfers: vec![outgoing("0xout1", 1), outgoing("0xout2", 2)],
                page_key: None,
            }],
        });
        let probe = FundingProbe::new(source, 0);

        let outcome = probe.check(ADDR).await;
        match outcome {
            ProbeOutcome::Evidence(ev) => assert!(!ev.funded),
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[tokio::test]
    async fn earliest_incoming_wins_over_earlier_outgoing() {
        let source = Arc::new(PagedSource {
            pages: vec![TransferPage {
                transfers: vec![outgoing("0xout", 1), incoming("0xfund", 2), incoming("0xlate", 3)],
                page_key: None,
            }],
        });
        let probe = FundingProbe::new(source, 0);

        match probe.check(ADDR).await {
            ProbeOutcome::Evidence(ev) => {
                assert!(ev.funded);
                assert_eq!(ev.first_tx_hash.as_deref(), Some("0xfund"));
                assert_eq!(ev.block, Some(2));
                assert_eq!(ev.funder.as_deref(), Some(OTHER));
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[tokio::test]
    async fn pagination_is_followed_to_the_funding_transfer() {
        let source = Arc::new(PagedSource {
            pages: vec![
                TransferPage {
                    transfers: vec![outgoing("0xout", 1)],
                    page_key: Some("1".to_string()),
                },
                TransferPage {
                    transfers: vec![incoming("0xfund", 5)],
                    page_key: None,
                },
            ],
        });
        let probe = FundingProbe::new(source, 0);

        match probe.check(ADDR).await {
            ProbeOutcome::Evidence(ev) => {
                assert!(ev.funded);
                assert_eq!(ev.first_tx_hash.as_deref(), Some("0xfund"));
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[tokio::test]
    async fn zero_value_transfers_do_not_fund() {
        let mut dust = incoming("0xdust", 1);
        dust.value = Some(0.0);
        let source = Arc::new(PagedSource {
            pages: vec![TransferPage {
                transfers: vec![dust],
                page_key: None,
            }],
        });
        let probe = FundingProbe::new(source, 0);

        match probe.check(ADDR).await {
            ProbeOutcome::Evidence(ev) => assert!(!ev.funded),
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[tokio::test]
    async fn transient_errors_are_retried_to_success() {
        let source = Arc::new(FlakySource {
            failures: AtomicUsize::new(2),
            history: vec![incoming("0xfund", 7)],
        });
        let probe = FundingProbe::new(source, 3);

        match probe.check(ADDR).await {
            ProbeOutcome::Evidence(ev) => {
                assert!(ev.funded);
                assert_eq!(ev.first_tx_hash.as_deref(), Some("0xfund"));
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[tokio::test]
    async fn exhausted_retries_fail_instead_of_unfunded() {
        let source = Arc::new(FlakySource {
            failures: AtomicUsize::new(usize::MAX),
            history: vec![],
        });
        let probe = FundingProbe::new(source, 1);

        match probe.check(ADDR).await {
            ProbeOutcome::Failed { error } => assert!(error.contains("simulated")),
            other => panic!("unexpected outcome {:?}", other),
        }
    }
}
