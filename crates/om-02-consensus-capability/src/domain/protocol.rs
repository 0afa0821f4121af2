//! # Round Protocol Messages
//!
//! Blobs exchanged between nodes in each round. All of them are bincode
//! encoded; maps are `BTreeMap`s and lists are built in a fixed order, so two
//! nodes that hold the same logical state emit identical bytes.

use crate::error::{CapabilityError, Result};
use om_01_aggregation::{AggregationOutcome, OracleId};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use shared_types::Value;
use std::collections::BTreeMap;

/// Addressing of one execution, carried through every phase of a round.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Id {
    pub workflow_execution_id: String,
    pub workflow_id: String,
    pub workflow_owner: String,
    pub workflow_name: String,
    pub workflow_don_id: u32,
    pub workflow_don_config_version: u32,
    pub report_id: String,
    pub key_id: String,
}

/// The leader's proposal of which executions to reconcile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    pub ids: Vec<Id>,
}

/// One node's payload for one execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub id: Id,
    pub observations: Vec<Value>,
}

/// Everything one node contributes to a round.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Observations {
    pub observations: Vec<Observation>,
    /// Sorted workflow ids registered on the observing node.
    pub registered_workflow_ids: Vec<String>,
}

/// A freshly aggregated outcome waiting to become a report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub id: Id,
    pub outcome: AggregationOutcome,
}

/// The agreed state carried from round to round.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    /// Workflow id to its latest agreed outcome.
    pub outcomes: BTreeMap<String, AggregationOutcome>,
    /// Reports of this round only; rebuilt every round.
    pub current_reports: Vec<Report>,
}

impl Outcome {
    /// Decode a previous outcome; the first round has none.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.is_empty() {
            return Ok(Self::default());
        }
        decode_blob(bytes, "outcome")
    }
}

/// Per-report attributes read back by the transmitter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportInfo {
    pub id: Id,
    pub should_report: bool,
}

/// An encoded report plus its encoded [`ReportInfo`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportWithInfo {
    pub report: Vec<u8>,
    pub info: Vec<u8>,
}

/// Round context supplied by the agreement protocol driver.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutcomeContext {
    /// Monotonically increasing round number.
    pub seq_nr: u64,
    /// Outcome bytes agreed in the previous round, empty in the first.
    pub previous_outcome: Vec<u8>,
}

/// An observation blob together with the node that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributedObservation {
    pub observer: OracleId,
    pub observation: Vec<u8>,
}

pub fn encode_blob<T: Serialize>(value: &T, what: &'static str) -> Result<Vec<u8>> {
    bincode::serialize(value)
        .map_err(|e| CapabilityError::Codec(format!("failed to encode {what}: {e}")))
}

pub fn decode_blob<T: DeserializeOwned>(bytes: &[u8], what: &'static str) -> Result<T> {
    bincode::deserialize(bytes)
        .map_err(|e| CapabilityError::Codec(format!("failed to decode {what}: {e}")))
}
