use thiserror::Error;

/// Failures of the collaborators around the scoring core.
///
/// The core itself (diff, validator, metrics, admission) never fails.
#[derive(Debug, Error)]
pub enum Error {
    #[error("result store error: {0}")]
    Store(#[from] rusqlite::Error),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("passage data error: {0}")]
    Passages(String),
}

pub type Result<T> = std::result::Result<T, Error>;
