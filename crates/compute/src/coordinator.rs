//! Parallel fan-out of pair evaluation.
//!
//! The event store is borrowed read-only by every task for the lifetime of
//! the batch; tasks share no mutable state and need no locking. Results are
//! gathered in enumeration order so the later stable ranking is reproducible.

use std::time::Instant;

use indexmap::IndexMap;
use rapport_core::config::resolve_worker_threads;
use rapport_core::EventStore;
use rayon::prelude::*;
use rayon::ThreadPool;
use tracing::{debug, info, warn};

use crate::error::{ComputeError, PairError};
use crate::pairs::PairKey;
use crate::pipeline::extract::{extract_pair, PairRawMetrics};

type PairOutcome = Result<Option<PairRawMetrics>, PairError>;

/// Raw results of the fan-out phase.
#[derive(Debug, Default)]
pub struct FanOut {
    /// One record per scored pair, in enumeration order.
    pub results: IndexMap<PairKey, PairRawMetrics>,
    pub excluded: usize,
    pub failed: usize,
    pub worker_threads: usize,
    pub sequential_fallback: bool,
}

/// Distributes pairs across a fixed-size worker pool.
#[derive(Debug, Clone)]
pub struct Coordinator {
    worker_threads: usize,
}

impl Coordinator {
    /// `worker_threads == 0` sizes the pool to the available parallelism.
    pub fn new(worker_threads: usize) -> Self {
        Self {
            worker_threads: resolve_worker_threads(worker_threads),
        }
    }

    pub fn worker_threads(&self) -> usize {
        self.worker_threads
    }

    fn build_pool(&self) -> Result<ThreadPool, ComputeError> {
        rayon::ThreadPoolBuilder::new()
            .num_threads(self.worker_threads)
            .thread_name(|i| format!("rapport-pair-{}", i))
            .build()
            .map_err(|e| ComputeError::PoolUnavailable(e.to_string()))
    }

    /// Evaluate every pair. Never fails: unusable pairs are dropped and a
    /// missing pool falls back to inline evaluation.
    pub fn evaluate(&self, store: &EventStore, pairs: &[PairKey]) -> FanOut {
        self.evaluate_on(self.build_pool(), store, pairs)
    }

    fn evaluate_on(
        &self,
        pool: Result<ThreadPool, ComputeError>,
        store: &EventStore,
        pairs: &[PairKey],
    ) -> FanOut {
        let start = Instant::now();

        let (outcomes, worker_threads, sequential_fallback) = match pool {
            Ok(pool) => {
                let outcomes: Vec<PairOutcome> = pool.install(|| {
                    pairs
                        .par_iter()
                        .map(|pair| extract_pair(store, pair))
                        .collect()
                });
                (outcomes, pool.current_num_threads(), false)
            }
            Err(e) => {
                warn!("{}; evaluating {} pairs sequentially", e, pairs.len());
                let outcomes: Vec<PairOutcome> =
                    pairs.iter().map(|pair| extract_pair(store, pair)).collect();
                (outcomes, 1, true)
            }
        };

        let mut fan_out = FanOut {
            worker_threads,
            sequential_fallback,
            ..FanOut::default()
        };

        for (pair, outcome) in pairs.iter().zip(outcomes) {
            match outcome {
                Ok(Some(metrics)) => {
                    fan_out.results.insert(pair.clone(), metrics);
                }
                Ok(None) => {
                    fan_out.excluded += 1;
                }
                Err(e) => {
                    warn!("Pair {} dropped: {}", pair, e);
                    fan_out.failed += 1;
                }
            }
        }

        debug!(
            scored = fan_out.results.len(),
            excluded = fan_out.excluded,
            failed = fan_out.failed,
            "fan-out collected"
        );
        info!(
            "  Evaluated {} pairs on {} workers in {:.2}s",
            pairs.len(),
            worker_threads,
            start.elapsed().as_secs_f64()
        );

        fan_out
    }
}

impl Default for Coordinator {
    fn default() -> Self {
        Self::new(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use rapport_core::ChatEvent;

    use crate::pairs::enumerate_pairs;

    fn make_event(sender: &str, secs: i64) -> ChatEvent {
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        ChatEvent::new(sender, sender, "msg", base + Duration::seconds(secs))
    }

    fn sample_store() -> EventStore {
        let mut events = Vec::new();
        for i in 0..40 {
            let sender = ["a", "b", "c", "d"][(i % 4) as usize];
            events.push(make_event(sender, i * 7));
        }
        EventStore::new(events)
    }

    #[test]
    fn parallel_and_sequential_agree() {
        let store = sample_store();
        let pairs = enumerate_pairs(store.participants().keys(), None);

        let coordinator = Coordinator::new(3);
        let parallel = coordinator.evaluate(&store, &pairs);
        let sequential = coordinator.evaluate_on(
            Err(ComputeError::PoolUnavailable("test".into())),
            &store,
            &pairs,
        );

        assert!(!parallel.sequential_fallback);
        assert!(sequential.sequential_fallback);
        assert_eq!(sequential.worker_threads, 1);
        assert_eq!(parallel.results.len(), 6);
        assert_eq!(parallel.results, sequential.results);
    }

    #[test]
    fn results_keep_enumeration_order() {
        let store = sample_store();
        let pairs = enumerate_pairs(store.participants().keys(), None);
        let fan_out = Coordinator::new(4).evaluate(&store, &pairs);

        let keys: Vec<&PairKey> = fan_out.results.keys().collect();
        let expected: Vec<&PairKey> = pairs.iter().collect();
        assert_eq!(keys, expected);
    }

    #[test]
    fn silent_pairs_are_excluded_not_fatal() {
        let store = sample_store();
        let mut pairs = enumerate_pairs(store.participants().keys(), None);
        pairs.push(PairKey::new("a", "ghost").unwrap());

        let fan_out = Coordinator::new(2).evaluate(&store, &pairs);
        assert_eq!(fan_out.results.len(), 6);
        assert_eq!(fan_out.excluded, 1);
        assert_eq!(fan_out.failed, 0);
    }

    #[test]
    fn failing_pair_is_dropped_and_batch_continues() {
        let mut events = vec![
            ChatEvent::new("x", "X", "far past", chrono::DateTime::<Utc>::MIN_UTC),
            ChatEvent::new("y", "Y", "far future", chrono::DateTime::<Utc>::MAX_UTC),
        ];
        events.push(make_event("a", 0));
        events.push(make_event("b", 5));
        let store = EventStore::new(events);

        let pairs = vec![
            PairKey::new("x", "y").unwrap(),
            PairKey::new("a", "b").unwrap(),
        ];
        let fan_out = Coordinator::new(2).evaluate(&store, &pairs);
        assert_eq!(fan_out.failed, 1);
        assert_eq!(fan_out.results.len(), 1);
        assert!(fan_out.results.contains_key(&PairKey::new("b", "a").unwrap()));
    }

    #[test]
    fn zero_threads_resolves_to_available_parallelism() {
        assert!(Coordinator::new(0).worker_threads() >= 1);
    }
}
