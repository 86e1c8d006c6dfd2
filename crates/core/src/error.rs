use thiserror::Error;

#[derive(Error, Debug)]
pub enum RapportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("Invalid config value for {key}: {value}")]
    InvalidConfig { key: String, value: String },

    #[error("{0}")]
    Other(String),
}

pub type RapportResult<T> = Result<T, RapportError>;
