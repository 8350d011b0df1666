//! Concurrent validation of the candidate set.
//!
//! A fixed pool of workers pulls candidates from a shared queue, probes each
//! one under the global rate ceiling, and fans results into the scheduler
//! loop, which owns the output partition.

use crate::config::ValidatorConfig;
use crate::probe::data_sources::TransferSource;
use crate::probe::funding::FundingProbe;
use crate::probe::progress::ProgressTracker;
use crate::probe::rate_limit::ProbeRateLimiter;
use crate::types::{CandidateEntry, ProbeOutcome, ProbeReport, RunReport};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::{mpsc, watch, Mutex};
use tracing::{debug, info, warn};

/// Drives [`FundingProbe`] over the full candidate set.
pub struct ValidationScheduler {
    probe: Arc<FundingProbe>,
    limiter: Arc<ProbeRateLimiter>,
    concurrency: usize,
    progress_interval: usize,
}

impl ValidationScheduler {
    /// Assemble a scheduler from its parts.
    pub fn new(
        probe: Arc<FundingProbe>,
        limiter: Arc<ProbeRateLimiter>,
        concurrency: usize,
        progress_interval: usize,
    ) -> Self {
        Self {
            probe,
            limiter,
            concurrency: concurrency.max(1),
            progress_interval: progress_interval.max(1),
        }
    }

    /// Build a scheduler for a validated config over the given source.
    pub fn from_config(config: &ValidatorConfig, source: Arc<dyn TransferSource>) -> Self {
        Self::new(
            Arc::new(FundingProbe::new(source, config.retry_attempts)),
            Arc::new(ProbeRateLimiter::new(config.rate_limit_per_second)),
            config.concurrency,
            config.progress_interval,
        )
    }

    /// Validate every candidate and partition the results.
    ///
    /// Completes when each candidate has a terminal outcome, or early when
    /// `cancel` flips; results already computed stay valid either way.
    pub async fn run(
        &self,
        candidates: Vec<CandidateEntry>,
        cancel: watch::Receiver<bool>,
    ) -> RunReport {
        let total = candidates.len();
        let progress = Arc::new(ProgressTracker::new(total));
        let queue = Arc::new(Mutex::new(VecDeque::from(candidates)));
        let (report_sender, mut report_receiver) = mpsc::channel::<ProbeReport>(self.concurrency);

        info!(
            "Starting validation for {} addresses ({} workers, {} req/s ceiling)",
            total,
            self.concurrency,
            self.limiter.per_second()
        );

        let mut workers = Vec::with_capacity(self.concurrency);
        for worker_id in 0..self.concurrency {
            workers.push(tokio::spawn(Self::worker(
                worker_id,
                queue.clone(),
                self.probe.clone(),
                self.limiter.clone(),
                report_sender.clone(),
                cancel.clone(),
            )));
        }
        // Workers hold the remaining senders; the fan-in loop ends when the
        // last one exits
        drop(report_sender);

        let mut funded = Vec::new();
        let mut unfunded = Vec::new();
        let mut failed = Vec::new();

        while let Some(report) = report_receiver.recv().await {
            let done = progress.record(&report.outcome);

            match report.outcome {
                ProbeOutcome::Evidence(evidence) if evidence.funded => {
                    funded.push((report.entry, evidence));
                }
                ProbeOutcome::Evidence(_) => {
                    unfunded.push(report.entry);
                }
                ProbeOutcome::Failed { error } => {
                    warn!("Probe failed for {}: {}", report.entry.address, error);
                    failed.push((report.entry, error));
                }
            }

            if done % self.progress_interval == 0 || done == total {
                info!(
                    "Processed {}/{} addresses ({:.1}/sec)",
                    done,
                    total,
                    progress.throughput()
                );
            }
        }

        for worker in workers {
            let _ = worker.await;
        }

        let summary = progress.summary();
        if summary.processed < total {
            warn!(
                "Run ended early: {}/{} addresses processed",
                summary.processed, total
            );
        }

        RunReport {
            funded,
            unfunded,
            failed,
            summary,
        }
    }

    /// One worker: pull, probe, report, until the queue drains or the run is
    /// cancelled. No candidate is ever pulled twice.
    async fn worker(
        worker_id: usize,
        queue: Arc<Mutex<VecDeque<CandidateEntry>>>,
        probe: Arc<FundingProbe>,
        limiter: Arc<ProbeRateLimiter>,
        reports: mpsc::Sender<ProbeReport>,
        mut cancel: watch::Receiver<bool>,
    ) {
        loop {
            if *cancel.borrow() {
                debug!("Worker {} stopping on cancellation", worker_id);
                break;
            }

            let entry = { queue.lock().await.pop_front() };
            let Some(entry) = entry else {
                debug!("Worker {} drained the queue", worker_id);
                break;
            };

            let outcome = tokio::select! {
                _ = cancel.changed() => {
                    debug!("Worker {} abandoning in-flight probe", worker_id);
                    break;
                }
                outcome = Self::probe_one(&probe, &limiter, &entry) => outcome,
            };

            if reports.send(ProbeReport { entry, outcome }).await.is_err() {
                break;
            }
        }
    }

    async fn probe_one(
        probe: &FundingProbe,
        limiter: &ProbeRateLimiter,
        entry: &CandidateEntry,
    ) -> ProbeOutcome {
        limiter.acquire().await;
        probe.check(&entry.address).await
    }
}
