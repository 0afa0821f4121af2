//! Encoders selectable per workflow.

use crate::error::{AggregationError, Result};
use crate::ports::Encoder;
use shared_types::{Value, ValueMap};

/// Name under which [`ValueEncoder`] is registered.
pub const VALUES_ENCODER: &str = "values";

/// Encodes the outcome as the binary form of a [`Value`] map.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValueEncoder;

impl Encoder for ValueEncoder {
    fn encode(&self, input: &ValueMap) -> Result<Vec<u8>> {
        Value::Map(input.clone())
            .to_bytes()
            .map_err(|e| AggregationError::Encode(e.to_string()))
    }
}
