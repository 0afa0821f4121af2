//! Ports implemented by aggregation policies and encoders.

use crate::domain::{AggregationOutcome, FeedReport, OracleId};
use crate::error::Result;
use shared_types::{Value, ValueMap};
use std::collections::BTreeMap;

/// Turns per-node observations plus the previous agreed state into a new
/// agreed state.
///
/// Implementations must be deterministic: every honest node calls
/// `aggregate` with the same inputs and the serialized results are compared
/// byte for byte.
pub trait Aggregator: Send + Sync {
    /// `observations` maps each participating node to the values it observed
    /// for one execution. `f` is the fault threshold of the committee.
    fn aggregate(
        &self,
        previous: Option<&AggregationOutcome>,
        observations: &BTreeMap<OracleId, Vec<Value>>,
        f: usize,
    ) -> Result<AggregationOutcome>;
}

/// Serializes a reported outcome into the bytes that get transmitted.
pub trait Encoder: Send + Sync {
    fn encode(&self, input: &ValueMap) -> Result<Vec<u8>>;
}

/// Decodes a raw trigger payload into feed reports.
pub trait ReportCodec: Send + Sync {
    fn decode(&self, raw: &Value) -> Result<Vec<FeedReport>>;

    fn encode(&self, reports: &[FeedReport]) -> Result<Value>;
}
