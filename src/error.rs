#[derive(Debug, thiserror::Error)]
pub enum AnalyticsError {
    #[error("DuckDB error: {0}")]
    DuckDb(#[from] duckdb::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    #[error("Invalid period: {0}")]
    InvalidPeriod(String),

    #[error("Unknown normalization mode: {0}")]
    UnknownNormalization(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Query timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("Task error: {0}")]
    Task(String),
}

pub type Result<T> = std::result::Result<T, AnalyticsError>;
