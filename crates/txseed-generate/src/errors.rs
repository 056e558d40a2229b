use thiserror::Error;
use txseed_core::CoreError;
use txseed_spec::SpecError;

/// Errors emitted by the generation engine and its writers.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error(transparent)]
    Spec(#[from] SpecError),
    #[error("invalid spec: {0}")]
    InvalidSpec(String),
    #[error("frame error: {0}")]
    Frame(#[from] CoreError),
    #[error("column '{column}' row {row}: {message}")]
    Eval {
        column: String,
        row: u64,
        message: String,
    },
    #[error("column '{column}' is not nullable but row {row} produced NULL")]
    NullValue { column: String, row: u64 },
    #[error("column '{column}' overflowed at row {row}")]
    Overflow { column: String, row: u64 },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}
