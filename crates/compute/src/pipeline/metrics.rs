use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Counters and stage timings of one analysis run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunMetrics {
    /// When the run finished.
    pub completed_at: Option<DateTime<Utc>>,
    /// Events in the full dataset (drives the activity factor).
    pub total_events: usize,
    /// Distinct senders in the dataset.
    pub participants: usize,
    pub pairs_enumerated: usize,
    pub pairs_scored: usize,
    /// Pairs where one side never spoke.
    pub pairs_excluded: usize,
    /// Pairs dropped because extraction failed.
    pub pairs_failed: usize,
    pub worker_threads: usize,
    /// True when the worker pool could not be built and pairs ran inline.
    pub sequential_fallback: bool,

    pub enumerate_ms: u64,
    pub extract_ms: u64,
    pub normalize_ms: u64,
    pub score_ms: u64,
}

impl RunMetrics {
    pub fn record_enumerate(&mut self, pairs: usize, elapsed: Duration) {
        self.pairs_enumerated = pairs;
        self.enumerate_ms = elapsed.as_millis() as u64;
    }

    pub fn record_extract(&mut self, elapsed: Duration) {
        self.extract_ms = elapsed.as_millis() as u64;
    }

    pub fn record_normalize(&mut self, elapsed: Duration) {
        self.normalize_ms = elapsed.as_millis() as u64;
    }

    pub fn record_score(&mut self, scored: usize, elapsed: Duration) {
        self.pairs_scored = scored;
        self.score_ms = elapsed.as_millis() as u64;
        self.completed_at = Some(Utc::now());
    }

    /// Total wall time across stages in milliseconds.
    pub fn total_ms(&self) -> u64 {
        self.enumerate_ms + self.extract_ms + self.normalize_ms + self.score_ms
    }

    /// Pairs per second during extraction (0 when too fast to measure).
    pub fn extract_pairs_per_second(&self) -> f64 {
        if self.extract_ms == 0 {
            return 0.0;
        }
        self.pairs_enumerated as f64 / (self.extract_ms as f64 / 1000.0)
    }
}
