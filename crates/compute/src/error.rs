use thiserror::Error;

/// Failure while evaluating a single pair. The pair is dropped, the run continues.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PairError {
    #[error("Timestamp gap between {from} and {to} cannot be represented")]
    TimestampOverflow { from: String, to: String },
    #[error("Feature {feature} is not finite ({value})")]
    NonFinite { feature: &'static str, value: f64 },
}

/// Run-level compute errors.
#[derive(Debug, Error)]
pub enum ComputeError {
    #[error("Worker pool unavailable: {0}")]
    PoolUnavailable(String),
    #[error("Invalid scoring weights: {0}")]
    InvalidWeights(String),
    #[error("Unknown normalization mode: {0}")]
    UnknownNormalization(String),
}
