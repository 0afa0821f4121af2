//! Trigger payload codec for data feeds.

use crate::domain::FeedReport;
use crate::error::{AggregationError, Result};
use crate::ports::ReportCodec;
use serde::Deserialize;
use shared_types::{Value, ValueMap};

const PAYLOAD_KEY: &str = "Payload";
const PRICE_KEY: &str = "BenchmarkPrice";

#[derive(Deserialize)]
struct TriggerEvent {
    #[serde(rename = "Payload")]
    payload: Vec<FeedReport>,
}

/// Decodes `{"Payload": [FeedReport, ...]}` trigger events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TriggerEventCodec;

impl ReportCodec for TriggerEventCodec {
    fn decode(&self, raw: &Value) -> Result<Vec<FeedReport>> {
        let event: TriggerEvent = raw
            .unwrap_to()
            .map_err(|e| AggregationError::Observation(e.to_string()))?;
        Ok(event.payload)
    }

    /// Prices are emitted as [`Value::BigInt`].
    fn encode(&self, reports: &[FeedReport]) -> Result<Value> {
        let mut payload = Vec::with_capacity(reports.len());
        for report in reports {
            let mut wrapped = Value::wrap(report)?;
            if let Value::Map(fields) = &mut wrapped {
                fields.insert(PRICE_KEY.to_string(), Value::BigInt(report.benchmark_price));
            }
            payload.push(wrapped);
        }

        let mut event = ValueMap::new();
        event.insert(PAYLOAD_KEY.to_string(), Value::List(payload));
        Ok(Value::Map(event))
    }
}
