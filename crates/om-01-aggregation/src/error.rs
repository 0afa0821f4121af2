//! Error types for aggregation and encoding.

use shared_types::ValueError;
use thiserror::Error;

/// Aggregation error types
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AggregationError {
    #[error("Invalid aggregation config: {0}")]
    InvalidConfig(String),

    #[error("Aggregation method {0} not supported")]
    UnknownMethod(String),

    #[error("Encoder {0} not supported")]
    UnknownEncoder(String),

    #[error("Failed to decode outcome metadata: {0}")]
    Metadata(String),

    #[error("Failed to decode observation: {0}")]
    Observation(String),

    #[error("Failed to encode outcome: {0}")]
    Encode(String),

    #[error(transparent)]
    Value(#[from] ValueError),
}

/// Result type for aggregation operations
pub type Result<T> = std::result::Result<T, AggregationError>;
