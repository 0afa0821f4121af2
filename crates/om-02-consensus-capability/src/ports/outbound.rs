//! Driven ports (Outbound dependencies)

use crate::error::Result;
use crate::ports::ConsensusCapabilityApi;
use om_01_aggregation::{Aggregator, Encoder};
use std::sync::Arc;

/// Per-workflow aggregators and encoders, as the reporting plugin needs
/// them.
pub trait WorkflowRegistry: Send + Sync {
    /// Fails with `NoAggregatorFound` for unregistered workflows.
    fn get_aggregator(&self, workflow_id: &str) -> Result<Arc<dyn Aggregator>>;

    /// Fails with `NoEncoderFound` for unregistered workflows.
    fn get_encoder(&self, workflow_id: &str) -> Result<Arc<dyn Encoder>>;

    /// Sorted ids of every registered workflow.
    fn registered_workflow_ids(&self) -> Vec<String>;

    /// Tear down a workflow whose outcome was pruned.
    fn unregister_workflow(&self, workflow_id: &str);
}

/// Registry the capability is published to.
pub trait CapabilityRegistry: Send + Sync {
    fn add(&self, capability: Arc<dyn ConsensusCapabilityApi>) -> Result<()>;

    /// Returns whether the id was registered.
    fn remove(&self, id: &str) -> bool;
}
