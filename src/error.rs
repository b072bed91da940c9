//! Error types for condition-statistics

use thiserror::Error;

/// Errors raised by the aggregation and curve-fitting entry points.
///
/// Every variant is detected fail-fast, before any statistics or solver work
/// begins. Curve-fit non-convergence is deliberately absent: it is a normal
/// outcome encoded as NaN fields in [`crate::regression::CurveFit`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StatsError {
    #[error("grouping column '{column}' is not present in the annotation schema")]
    InvalidGrouping { column: String },

    #[error("at least one grouping column is required")]
    EmptyGrouping,

    #[error("shape mismatch: expected {expected} rows, got {got}")]
    ShapeMismatch { expected: usize, got: usize },

    #[error("input length mismatch: x has {x_len} values, y has {y_len}")]
    InputLengthMismatch { x_len: usize, y_len: usize },
}

/// Result type alias for condition-statistics operations
pub type Result<T> = std::result::Result<T, StatsError>;
