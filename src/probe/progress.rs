//! Run progress shared between workers and the fan-in loop.
//!
//! Counters are atomics so the totals stay accurate regardless of the order
//! workers complete in.

use crate::types::{ProbeOutcome, RunSummary};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

/// Atomically updated counters for one validation run.
pub struct ProgressTracker {
    total: usize,
    processed: AtomicUsize,
    funded: AtomicUsize,
    unfunded: AtomicUsize,
    failed: AtomicUsize,
    started: Instant,
}

impl ProgressTracker {
    /// Start tracking a run over `total` candidates.
    pub fn new(total: usize) -> Self {
        Self {
            total,
            processed: AtomicUsize::new(0),
            funded: AtomicUsize::new(0),
            unfunded: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
            started: Instant::now(),
        }
    }

    /// Record one terminal outcome; returns the processed count including it.
    pub fn record(&self, outcome: &ProbeOutcome) -> usize {
        match outcome {
            ProbeOutcome::Evidence(ev) if ev.funded => {
                self.funded.fetch_add(1, Ordering::Relaxed);
            }
            ProbeOutcome::Evidence(_) => {
                self.unfunded.fetch_add(1, Ordering::Relaxed);
            }
            ProbeOutcome::Failed { .. } => {
                self.failed.fetch_add(1, Ordering::Relaxed);
            }
        }
        self.processed.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Completions so far.
    pub fn processed(&self) -> usize {
        self.processed.load(Ordering::Relaxed)
    }

    /// Rolling requests-per-second since the run started.
    pub fn throughput(&self) -> f64 {
        let elapsed = self.started.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.processed() as f64 / elapsed
        } else {
            0.0
        }
    }

    /// Snapshot the final summary.
    pub fn summary(&self) -> RunSummary {
        RunSummary {
            total: self.total,
            processed: self.processed(),
            funded: self.funded.load(Ordering::Relaxed),
            unfunded: self.unfunded.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            elapsed_secs: self.started.elapsed().as_secs_f64(),
        }
    }
}
