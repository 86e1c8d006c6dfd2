//! Pairwise closeness scoring over a static batch of chat events.
//!
//! A run is a map phase over participant pairs followed by a reduce phase:
//!
//! 1. [`pairs`] enumerates the unordered pairs to evaluate.
//! 2. [`coordinator`] fans the pairs out to a worker pool; each worker runs
//!    [`pipeline::extract`] against the shared, read-only [`EventStore`].
//! 3. [`pipeline::normalize`] rescales every feature across the full result set.
//! 4. [`pipeline::score`] combines the normalized features and ranks pairs.
//!
//! [`EventStore`]: rapport_core::EventStore

pub mod coordinator;
pub mod engine;
pub mod error;
pub mod pairs;
pub mod pipeline;

pub use coordinator::{Coordinator, FanOut};
pub use engine::{AnalysisOptions, ClosenessEngine, ClosenessReport, ClosenessRow};
pub use error::{ComputeError, PairError};
pub use pairs::{enumerate_pairs, PairKey};
pub use pipeline::extract::{extract_pair, PairRawMetrics};
pub use pipeline::features::{Feature, FeatureVector, ScoringWeights};
pub use pipeline::metrics::RunMetrics;
pub use pipeline::normalize::NormalizationMode;
