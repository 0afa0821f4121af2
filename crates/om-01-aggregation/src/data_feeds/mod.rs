//! # Data Feeds Aggregator
//!
//! Reports a price feed when its heartbeat elapses or its price moves by
//! more than the configured deviation since the last reported value.
//!
//! The last reported `{timestamp, price}` per feed travels between rounds in
//! [`AggregationOutcome::metadata`]. Feeds are always walked in sorted id
//! order, so every node derives the same outcome from the same inputs.

mod config;

pub use config::{DataFeedsConfig, FeedConfig};

use crate::codec::TriggerEventCodec;
use crate::domain::{AggregationOutcome, FeedId, FeedReport, OracleId};
use crate::error::{AggregationError, Result};
use crate::ports::{Aggregator, ReportCodec};
use primitive_types::U256;
use serde::{Deserialize, Serialize};
use shared_types::{Value, ValueMap};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, warn};

/// Registry name of this aggregation method.
pub const DATA_FEEDS_METHOD: &str = "data_feeds_2_0";

/// Key of the report list in the encodable outcome.
pub const REPORTS_KEY: &str = "Reports";

/// Last reported state of a feed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedState {
    pub timestamp: i64,
    pub price: U256,
}

/// Aggregator state carried in the outcome metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataFeedsMetadata {
    pub feed_info: BTreeMap<FeedId, FeedState>,
}

impl DataFeedsMetadata {
    pub fn encode(&self) -> Result<Vec<u8>> {
        bincode::serialize(self).map_err(|e| AggregationError::Encode(e.to_string()))
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        bincode::deserialize(bytes).map_err(|e| AggregationError::Metadata(e.to_string()))
    }
}

/// Heartbeat/deviation aggregator for price feeds.
pub struct DataFeedsAggregator {
    config: DataFeedsConfig,
    codec: Arc<dyn ReportCodec>,
}

impl DataFeedsAggregator {
    pub fn new(config: DataFeedsConfig) -> Self {
        Self::with_codec(config, Arc::new(TriggerEventCodec))
    }

    pub fn with_codec(config: DataFeedsConfig, codec: Arc<dyn ReportCodec>) -> Self {
        Self { config, codec }
    }

    /// Build from a registration config value.
    pub fn from_value(config: &Value) -> Result<Self> {
        Ok(Self::new(DataFeedsConfig::from_value(config)?))
    }

    pub fn config(&self) -> &DataFeedsConfig {
        &self.config
    }

    /// Newest report per feed across all nodes.
    fn latest_reports(
        &self,
        observations: &BTreeMap<OracleId, Vec<Value>>,
    ) -> BTreeMap<FeedId, FeedReport> {
        let mut latest: BTreeMap<FeedId, FeedReport> = BTreeMap::new();

        for (node, values) in observations {
            if values.len() != 1 {
                warn!(
                    node = *node,
                    count = values.len(),
                    "Expected exactly one observation from node"
                );
            }
            let Some(first) = values.first() else {
                continue;
            };

            let reports = match self.codec.decode(first) {
                Ok(reports) => reports,
                Err(e) => {
                    warn!(node = *node, error = %e, "Skipping undecodable observation");
                    continue;
                }
            };

            for report in reports {
                match latest.get(&report.feed_id) {
                    Some(current) if current.observation_timestamp >= report.observation_timestamp => {}
                    _ => {
                        latest.insert(report.feed_id, report);
                    }
                }
            }
        }

        latest
    }

    /// Previous per-feed state, reconciled with the current configuration.
    fn previous_state(&self, previous: Option<&AggregationOutcome>) -> Result<DataFeedsMetadata> {
        let mut state = match previous {
            Some(outcome) if !outcome.metadata.is_empty() => {
                DataFeedsMetadata::decode(&outcome.metadata)?
            }
            _ => DataFeedsMetadata::default(),
        };

        state
            .feed_info
            .retain(|feed_id, _| self.config.feeds.contains_key(feed_id));
        for feed_id in self.config.feeds.keys() {
            state.feed_info.entry(*feed_id).or_default();
        }

        Ok(state)
    }
}

impl Aggregator for DataFeedsAggregator {
    fn aggregate(
        &self,
        previous: Option<&AggregationOutcome>,
        observations: &BTreeMap<OracleId, Vec<Value>>,
        f: usize,
    ) -> Result<AggregationOutcome> {
        let latest = self.latest_reports(observations);
        let mut state = self.previous_state(previous)?;

        let mut included = BTreeSet::new();
        let mut candidates = Vec::new();

        for (feed_id, feed) in &self.config.feeds {
            let Some(report) = latest.get(feed_id) else {
                debug!(feed_id = %feed_id, "No new report for feed");
                continue;
            };
            let last = state.feed_info.get(feed_id).cloned().unwrap_or_default();
            if report.observation_timestamp < last.timestamp {
                debug!(
                    feed_id = %feed_id,
                    observed = report.observation_timestamp,
                    last_reported = last.timestamp,
                    "Ignoring report older than the last reported one"
                );
                continue;
            }

            let elapsed = report.observation_timestamp.saturating_sub(last.timestamp);
            let change = deviation(&last.price, &report.benchmark_price);
            if elapsed > heartbeat_secs(feed.heartbeat) || change > feed.deviation {
                debug!(
                    feed_id = %feed_id,
                    elapsed,
                    deviation = change,
                    "Feed triggered"
                );
                included.insert(*feed_id);
            } else {
                candidates.push((*feed_id, elapsed, feed.heartbeat));
            }
        }

        if !included.is_empty() && self.config.allowed_partial_staleness > 0.0 {
            let factor = 1.0 - self.config.allowed_partial_staleness;
            for (feed_id, elapsed, heartbeat) in candidates {
                if elapsed as f64 > heartbeat as f64 * factor {
                    debug!(feed_id = %feed_id, elapsed, "Including partially stale feed");
                    included.insert(feed_id);
                }
            }
        }

        let mut reports = Vec::with_capacity(included.len());
        for feed_id in &included {
            let Some(report) = latest.get(feed_id) else {
                continue;
            };
            state.feed_info.insert(
                *feed_id,
                FeedState {
                    timestamp: report.observation_timestamp,
                    price: report.benchmark_price,
                },
            );

            let emitted_id = self
                .config
                .feeds
                .get(feed_id)
                .and_then(|feed| feed.remapped_id)
                .unwrap_or(*feed_id);
            reports.push(report_value(emitted_id, report));
        }

        debug!(
            nodes = observations.len(),
            f,
            reported = reports.len(),
            "Data feeds aggregation complete"
        );

        let should_report = !reports.is_empty();
        let mut encodable_outcome = ValueMap::new();
        encodable_outcome.insert(REPORTS_KEY.to_string(), Value::List(reports));

        Ok(AggregationOutcome::new(
            encodable_outcome,
            state.encode()?,
            should_report,
        ))
    }
}

fn report_value(feed_id: FeedId, report: &FeedReport) -> Value {
    let mut entry = ValueMap::new();
    entry.insert("FeedID".to_string(), Value::String(feed_id.to_string()));
    entry.insert(
        "RawReport".to_string(),
        Value::Bytes(report.full_report.clone()),
    );
    entry.insert("Price".to_string(), Value::BigInt(report.benchmark_price));
    entry.insert(
        "Timestamp".to_string(),
        Value::Int64(report.observation_timestamp),
    );
    Value::Map(entry)
}

fn heartbeat_secs(heartbeat: u64) -> i64 {
    i64::try_from(heartbeat).unwrap_or(i64::MAX)
}

/// `|new - old| / old`; a move away from zero is infinite.
fn deviation(old: &U256, new: &U256) -> f64 {
    if old.is_zero() {
        return if new.is_zero() { 0.0 } else { f64::MAX };
    }
    let diff = if new > old { *new - *old } else { *old - *new };
    u256_to_f64(&diff) / u256_to_f64(old)
}

fn u256_to_f64(value: &U256) -> f64 {
    value
        .0
        .iter()
        .rev()
        .fold(0.0, |acc, limb| acc * 18_446_744_073_709_551_616.0 + *limb as f64)
}
