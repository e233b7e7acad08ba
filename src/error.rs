// Error types shared by batches, operators and the executor

use arrow::error::ArrowError;
use thiserror::Error;

/// Errors raised while building or running an operator pipeline
#[derive(Debug, Error)]
pub enum QueryError {
    /// An internal invariant was violated. Always a bug in the caller,
    /// never retried; the pipeline is aborted.
    #[error("internal invariant violated: {0}")]
    Internal(String),

    /// The operator tree could not be built as requested
    #[error("invalid plan: {0}")]
    Plan(String),

    /// Malformed batch: column count or length mismatch, bad column lookup
    #[error("schema error: {0}")]
    Schema(String),

    #[error("arrow error: {0}")]
    Arrow(#[from] ArrowError),
}

/// Result type for query execution
pub type Result<T> = std::result::Result<T, QueryError>;
