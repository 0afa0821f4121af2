//! Configuration for the consensus capability and its reporting plugin.

use crate::error::{CapabilityError, Result};
use om_01_aggregation::VALUES_ENCODER;
use serde::{Deserialize, Serialize};
use shared_types::{Value, ValueMap};
use std::time::Duration;

/// Default lifetime of a pending request.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 3600;

/// Default capacity of a caller's response channel.
pub const DEFAULT_CALLBACK_BUFFER_SIZE: usize = 10;

/// Default number of requests proposed per round.
pub const DEFAULT_MAX_BATCH_SIZE: usize = 20;

/// Rounds a workflow may go unseen before its outcome is pruned.
pub const DEFAULT_OUTCOME_PRUNING_THRESHOLD: u64 = 3600;

/// Default limit for every protocol blob.
pub const DEFAULT_MAX_LENGTH_BYTES: usize = 1024 * 1024;

/// Default number of reports per round.
pub const DEFAULT_MAX_REPORT_COUNT: usize = 20;

/// Capability front-end configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CapabilityConfig {
    /// Seconds a request may wait for a transmitted outcome
    pub request_timeout_secs: u64,

    /// Buffer of each caller's response channel
    pub callback_buffer_size: usize,
}

impl Default for CapabilityConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            callback_buffer_size: DEFAULT_CALLBACK_BUFFER_SIZE,
        }
    }
}

impl CapabilityConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Reporting plugin configuration, carried in the agreement protocol's
/// offchain config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginConfig {
    /// Requests proposed per round
    pub max_batch_size: usize,

    /// Rounds without F+1 nodes reporting a workflow before it is pruned
    pub outcome_pruning_threshold: u64,

    pub max_query_length_bytes: usize,
    pub max_observation_length_bytes: usize,
    pub max_outcome_length_bytes: usize,
    pub max_report_length_bytes: usize,
    pub max_report_count: usize,
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
            outcome_pruning_threshold: DEFAULT_OUTCOME_PRUNING_THRESHOLD,
            max_query_length_bytes: DEFAULT_MAX_LENGTH_BYTES,
            max_observation_length_bytes: DEFAULT_MAX_LENGTH_BYTES,
            max_outcome_length_bytes: DEFAULT_MAX_LENGTH_BYTES,
            max_report_length_bytes: DEFAULT_MAX_LENGTH_BYTES,
            max_report_count: DEFAULT_MAX_REPORT_COUNT,
        }
    }
}

impl PluginConfig {
    /// Decode the offchain config (JSON). Empty input and zero-valued fields
    /// fall back to defaults.
    pub fn from_offchain_config(bytes: &[u8]) -> Result<Self> {
        if bytes.is_empty() {
            return Ok(Self::default());
        }

        let mut config: Self = serde_json::from_slice(bytes)
            .map_err(|e| CapabilityError::InvalidConfig(format!("offchain config: {e}")))?;

        let defaults = Self::default();
        fn or_default<T: PartialEq + Default + Copy>(value: &mut T, default: T) {
            if *value == T::default() {
                *value = default;
            }
        }
        or_default(&mut config.max_batch_size, defaults.max_batch_size);
        or_default(
            &mut config.outcome_pruning_threshold,
            defaults.outcome_pruning_threshold,
        );
        or_default(
            &mut config.max_query_length_bytes,
            defaults.max_query_length_bytes,
        );
        or_default(
            &mut config.max_observation_length_bytes,
            defaults.max_observation_length_bytes,
        );
        or_default(
            &mut config.max_outcome_length_bytes,
            defaults.max_outcome_length_bytes,
        );
        or_default(
            &mut config.max_report_length_bytes,
            defaults.max_report_length_bytes,
        );
        or_default(&mut config.max_report_count, defaults.max_report_count);

        Ok(config)
    }

    /// Requests proposed per round; never more than fit in one round's
    /// reports.
    pub fn batch_size(&self) -> usize {
        self.max_batch_size.min(self.max_report_count)
    }
}

/// Per-workflow registration config.
///
/// ```text
/// { "aggregation_method": "data_feeds_2_0",
///   "aggregation_config": { .. },
///   "encoder": "values",
///   "encoder_config": { .. },
///   "report_id": "0001",
///   "key_id": "evm" }
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RequestConfig {
    pub aggregation_method: String,
    pub aggregation_config: Value,
    pub encoder: String,
    pub encoder_config: Value,
    /// Four lowercase hex characters
    pub report_id: String,
    pub key_id: String,
}

impl RequestConfig {
    pub fn from_value(config: &Value) -> Result<Self> {
        let map = config.as_map().ok_or_else(|| {
            CapabilityError::InvalidConfig(format!("expected map, got {}", config.kind()))
        })?;

        let aggregation_method = required_str(map, "aggregation_method")?.to_string();
        let report_id = required_str(map, "report_id")?.to_string();
        if !is_report_id(&report_id) {
            return Err(CapabilityError::InvalidConfig(format!(
                "report_id {report_id} must be 4 lowercase hex characters"
            )));
        }

        let encoder = match optional_str(map, "encoder")? {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => VALUES_ENCODER.to_string(),
        };
        let key_id = optional_str(map, "key_id")?.unwrap_or_default().to_string();

        Ok(Self {
            aggregation_method,
            aggregation_config: map.get("aggregation_config").cloned().unwrap_or_default(),
            encoder,
            encoder_config: map.get("encoder_config").cloned().unwrap_or_default(),
            report_id,
            key_id,
        })
    }
}

fn is_report_id(id: &str) -> bool {
    id.len() == 4 && id.chars().all(|c| matches!(c, '0'..='9' | 'a'..='f'))
}

fn required_str<'a>(map: &'a ValueMap, key: &str) -> Result<&'a str> {
    optional_str(map, key)?
        .filter(|s| !s.is_empty())
        .ok_or_else(|| CapabilityError::InvalidConfig(format!("missing {key}")))
}

fn optional_str<'a>(map: &'a ValueMap, key: &str) -> Result<Option<&'a str>> {
    match map.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(other) => Err(CapabilityError::InvalidConfig(format!(
            "{key} must be a string, got {}",
            other.kind()
        ))),
    }
}
