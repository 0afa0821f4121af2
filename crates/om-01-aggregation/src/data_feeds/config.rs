use crate::domain::FeedId;
use crate::error::{AggregationError, Result};
use serde::Deserialize;
use shared_types::Value;
use std::collections::BTreeMap;

#[derive(Deserialize)]
struct RawFeedConfig {
    deviation: String,
    heartbeat: u64,
    #[serde(rename = "remappedID", default)]
    remapped_id: Option<FeedId>,
}

#[derive(Deserialize)]
struct RawConfig {
    #[serde(default)]
    feeds: BTreeMap<FeedId, RawFeedConfig>,
    #[serde(rename = "allowedPartialStaleness", default)]
    allowed_partial_staleness: Option<String>,
}

/// Trigger thresholds for one feed.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedConfig {
    /// Relative price change that forces a report, e.g. `0.05` for 5%.
    pub deviation: f64,
    /// Seconds after which a report is forced regardless of price.
    pub heartbeat: u64,
    /// Feed id to emit instead of the observed one.
    pub remapped_id: Option<FeedId>,
}

/// Static configuration of a [`DataFeedsAggregator`](super::DataFeedsAggregator).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataFeedsConfig {
    pub feeds: BTreeMap<FeedId, FeedConfig>,
    /// Fraction of the heartbeat, in `[0, 1)`. Once any feed triggers, feeds
    /// past `heartbeat * (1 - allowed_partial_staleness)` are reported too.
    pub allowed_partial_staleness: f64,
}

impl DataFeedsConfig {
    /// Parse the registration config value:
    ///
    /// ```text
    /// { "feeds": { "0x..": { "deviation": "0.05", "heartbeat": 60 } },
    ///   "allowedPartialStaleness": "0.2" }
    /// ```
    pub fn from_value(config: &Value) -> Result<Self> {
        let raw: RawConfig = config
            .unwrap_to()
            .map_err(|e| AggregationError::InvalidConfig(e.to_string()))?;

        let mut feeds = BTreeMap::new();
        for (feed_id, feed) in raw.feeds {
            let deviation = parse_fraction(&feed.deviation).ok_or_else(|| {
                AggregationError::InvalidConfig(format!(
                    "feed {feed_id}: invalid deviation {}",
                    feed.deviation
                ))
            })?;
            feeds.insert(
                feed_id,
                FeedConfig {
                    deviation,
                    heartbeat: feed.heartbeat,
                    remapped_id: feed.remapped_id,
                },
            );
        }

        let allowed_partial_staleness = match raw.allowed_partial_staleness.as_deref() {
            None | Some("") => 0.0,
            Some(text) => parse_fraction(text)
                .filter(|v| *v < 1.0)
                .ok_or_else(|| {
                    AggregationError::InvalidConfig(format!(
                        "invalid allowedPartialStaleness {text}"
                    ))
                })?,
        };

        Ok(Self {
            feeds,
            allowed_partial_staleness,
        })
    }
}

/// Non-negative finite decimal.
fn parse_fraction(text: &str) -> Option<f64> {
    text.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v >= 0.0)
}
