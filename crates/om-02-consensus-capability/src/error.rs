//! Error types for the consensus capability.

use om_01_aggregation::AggregationError;
use shared_types::ValueError;
use thiserror::Error;

/// Request store errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("Request with id {0} already exists")]
    DuplicateId(String),

    #[error("Queue is empty")]
    QueueEmpty,

    #[error("Invalid batch size: must be greater than 0")]
    InvalidBatchSize,
}

/// Consensus capability errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CapabilityError {
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Invalid inputs: {0}")]
    InvalidInputs(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("no aggregator found for workflow {0}")]
    NoAggregatorFound(String),

    #[error("no encoder found for workflow {0}")]
    NoEncoderFound(String),

    #[error("Aggregation failed: {0}")]
    Aggregation(#[from] AggregationError),

    #[error("Codec error: {0}")]
    Codec(String),

    #[error("Capability not started")]
    NotStarted,

    #[error("Capability already started")]
    AlreadyStarted,

    #[error("Transmit failed: {0}")]
    Transmit(String),

    #[error("Capability registry: {0}")]
    Registry(String),
}

impl CapabilityError {
    /// Whether the agreement protocol driver may retry in a later round.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Store(StoreError::QueueEmpty) | Self::NotStarted | Self::Transmit(_)
        )
    }
}

impl From<ValueError> for CapabilityError {
    fn from(e: ValueError) -> Self {
        Self::Codec(e.to_string())
    }
}

/// Result type for consensus capability operations
pub type Result<T> = std::result::Result<T, CapabilityError>;
