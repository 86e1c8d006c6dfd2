use std::collections::HashMap;
use std::time::Instant;

use chrono::{DateTime, Utc};
use rapport_core::config::AnalysisConfig;
use rapport_core::{EventStore, SenderId};
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::coordinator::Coordinator;
use crate::error::ComputeError;
use crate::pairs::{enumerate_pairs, PairKey};
use crate::pipeline::extract::PairRawMetrics;
use crate::pipeline::features::{FeatureVector, ScoringWeights};
use crate::pipeline::metrics::RunMetrics;
use crate::pipeline::normalize::{normalize_all, NormalizationMode};
use crate::pipeline::score::{activity_factor, closeness_score, rank_by};

/// Knobs of one analysis run.
#[derive(Debug, Clone)]
pub struct AnalysisOptions {
    /// Restrict the run to pairs containing this participant.
    pub focus: Option<SenderId>,
    /// 0 = available parallelism.
    pub worker_threads: usize,
    /// Event count at which scores stop being dampened.
    pub activity_baseline: u32,
    pub weights: ScoringWeights,
    pub normalization: NormalizationMode,
    /// Display names overriding the nicknames seen in the events.
    pub user_names: HashMap<SenderId, String>,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            focus: None,
            worker_threads: 0,
            activity_baseline: 1000,
            weights: ScoringWeights::default(),
            normalization: NormalizationMode::default(),
            user_names: HashMap::new(),
        }
    }
}

impl AnalysisOptions {
    pub fn from_config(config: &AnalysisConfig) -> Result<Self, ComputeError> {
        let weights = match config
            .weight_values()
            .map_err(|e| ComputeError::InvalidWeights(e.to_string()))?
        {
            Some(values) => ScoringWeights::from_values(&values)?,
            None => ScoringWeights::default(),
        };
        Ok(Self {
            worker_threads: config.worker_threads,
            activity_baseline: config.activity_baseline,
            weights,
            normalization: config.normalization.parse()?,
            ..Self::default()
        })
    }

    pub fn with_focus(mut self, focus: Option<impl ToString>) -> Self {
        self.focus = focus
            .map(|f| f.to_string().trim().to_string())
            .filter(|f| !f.is_empty());
        self
    }

    pub fn with_user_names(mut self, user_names: HashMap<SenderId, String>) -> Self {
        self.user_names = user_names;
        self
    }

    /// Display name: explicit mapping, else first observed nickname, else the id.
    pub fn display_name(&self, store: &EventStore, id: &str) -> String {
        self.user_names
            .get(id)
            .filter(|name| !name.trim().is_empty())
            .map(String::as_str)
            .or_else(|| store.nickname(id))
            .unwrap_or(id)
            .to_string()
    }
}

/// One row of the result table.
#[derive(Debug, Clone, Serialize)]
pub struct ClosenessRow {
    pub pair: PairKey,
    pub name_a: String,
    pub name_b: String,
    pub raw: PairRawMetrics,
    pub normalized: FeatureVector,
    /// Weighted sum of `normalized`, times the activity factor.
    pub closeness_score: f64,
}

/// Ranked result table of one run plus its provenance.
#[derive(Debug, Clone, Serialize)]
pub struct ClosenessReport {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub normalization: NormalizationMode,
    pub activity_factor: f64,
    /// Descending by `closeness_score`.
    pub rows: Vec<ClosenessRow>,
    pub metrics: RunMetrics,
}

impl ClosenessReport {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn top(&self, n: usize) -> &[ClosenessRow] {
        &self.rows[..n.min(self.rows.len())]
    }

    pub fn get(&self, pair: &PairKey) -> Option<&ClosenessRow> {
        self.rows.iter().find(|row| &row.pair == pair)
    }
}

/// Runs enumerate → extract → normalize → score over one static event batch.
pub struct ClosenessEngine;

impl ClosenessEngine {
    pub fn run(store: &EventStore, options: &AnalysisOptions) -> ClosenessReport {
        let start = Instant::now();
        let mut metrics = RunMetrics {
            total_events: store.len(),
            participants: store.participants().len(),
            ..RunMetrics::default()
        };

        info!(
            "Scoring closeness for {} participants over {} events...",
            metrics.participants, metrics.total_events
        );

        let stage = Instant::now();
        let pairs = enumerate_pairs(store.participants().keys(), options.focus.as_deref());
        metrics.record_enumerate(pairs.len(), stage.elapsed());

        let activity = activity_factor(store.len(), options.activity_baseline);
        if activity < 1.0 {
            info!(
                "  Sparse chat ({} < {} events): scores dampened by {:.3}",
                store.len(),
                options.activity_baseline,
                activity
            );
        }

        let stage = Instant::now();
        let coordinator = Coordinator::new(options.worker_threads);
        debug!(
            workers = coordinator.worker_threads(),
            pairs = pairs.len(),
            "fanning out pair evaluation"
        );
        let fan_out = coordinator.evaluate(store, &pairs);
        metrics.record_extract(stage.elapsed());
        metrics.pairs_excluded = fan_out.excluded;
        metrics.pairs_failed = fan_out.failed;
        metrics.worker_threads = fan_out.worker_threads;
        metrics.sequential_fallback = fan_out.sequential_fallback;

        if fan_out.results.is_empty() {
            warn!("No pair has messages from both sides; result table is empty");
        }

        // Barrier: every pair result is in hand before any feature is rescaled.
        let stage = Instant::now();
        let raw: Vec<FeatureVector> = fan_out.results.values().map(PairRawMetrics::features).collect();
        let normalized = normalize_all(options.normalization, &raw);
        metrics.record_normalize(stage.elapsed());

        let stage = Instant::now();
        let mut rows: Vec<ClosenessRow> = fan_out
            .results
            .into_iter()
            .zip(normalized)
            .map(|((pair, raw), normalized)| ClosenessRow {
                name_a: options.display_name(store, pair.a()),
                name_b: options.display_name(store, pair.b()),
                closeness_score: closeness_score(&options.weights, &normalized, activity),
                pair,
                raw,
                normalized,
            })
            .collect();
        rank_by(&mut rows, |row| row.closeness_score);
        metrics.record_score(rows.len(), stage.elapsed());

        info!(
            "Closeness complete in {:.1}s: {} pairs scored, {} excluded, {} failed",
            start.elapsed().as_secs_f64(),
            metrics.pairs_scored,
            metrics.pairs_excluded,
            metrics.pairs_failed
        );
        debug!(
            total_ms = metrics.total_ms(),
            pairs_per_second = metrics.extract_pairs_per_second(),
            "stage timings"
        );

        ClosenessReport {
            run_id: Uuid::new_v4(),
            generated_at: Utc::now(),
            normalization: options.normalization,
            activity_factor: activity,
            rows,
            metrics,
        }
    }
}
