use serde::{Deserialize, Serialize};
use shared_types::ValueMap;

/// Agreed state for one workflow after a round.
///
/// Carried from round to round inside the serialized plugin outcome: the
/// aggregator reads `metadata` from the previous round and writes the next.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregationOutcome {
    /// Payload handed to the workflow's encoder when `should_report` is set.
    pub encodable_outcome: ValueMap,

    /// Aggregator-private state, opaque to everything else.
    pub metadata: Vec<u8>,

    /// Whether this round produced something worth transmitting.
    pub should_report: bool,

    /// Last round in which enough nodes still had the workflow registered.
    pub last_seen_at: u64,
}

impl AggregationOutcome {
    pub fn new(encodable_outcome: ValueMap, metadata: Vec<u8>, should_report: bool) -> Self {
        Self {
            encodable_outcome,
            metadata,
            should_report,
            last_seen_at: 0,
        }
    }
}
