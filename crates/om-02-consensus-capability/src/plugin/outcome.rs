//! Outcome reconciliation for one round.
//!
//! A pure function of the previous outcome and this round's observations,
//! so it can be exercised without a store or a capability.

use crate::domain::{Outcome, Query, Report};
use crate::error::Result;
use crate::ports::WorkflowRegistry;
use om_01_aggregation::OracleId;
use shared_types::Value;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Observations of one execution, by node.
pub type NodeObservations = BTreeMap<OracleId, Vec<Value>>;

/// Round parameters fixed by the driver and the plugin config.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundParams {
    pub seq_nr: u64,
    pub f: usize,
    pub pruning_threshold: u64,
}

impl RoundParams {
    /// Observing nodes required before an execution is aggregated.
    pub fn quorum(&self) -> usize {
        2 * self.f + 1
    }
}

/// Next outcome plus the workflows whose state was pruned.
#[derive(Debug, Clone, PartialEq)]
pub struct RoundResult {
    pub outcome: Outcome,
    pub pruned: Vec<String>,
}

/// Fold this round's observations into the previous outcome.
///
/// - `observations`: execution id to the observations of each node.
/// - `registered_by`: workflow id to the number of distinct nodes that
///   reported it registered.
///
/// Aggregator errors abort the round. An execution without quorum, or whose
/// workflow has no aggregator here, is skipped and stays pending.
pub fn reconcile(
    previous: Outcome,
    query: &Query,
    observations: &BTreeMap<String, NodeObservations>,
    registered_by: &BTreeMap<String, usize>,
    params: RoundParams,
    registry: &dyn WorkflowRegistry,
) -> Result<RoundResult> {
    let mut outcomes = previous.outcomes;
    let mut current_reports = Vec::new();

    for id in &query.ids {
        let Some(by_node) = observations.get(&id.workflow_execution_id) else {
            debug!(
                workflow_execution_id = %id.workflow_execution_id,
                "No observations for queried execution"
            );
            continue;
        };
        if by_node.len() < params.quorum() {
            debug!(
                workflow_execution_id = %id.workflow_execution_id,
                observers = by_node.len(),
                required = params.quorum(),
                "Insufficient observations, leaving request pending"
            );
            continue;
        }

        let aggregator = match registry.get_aggregator(&id.workflow_id) {
            Ok(aggregator) => aggregator,
            Err(e) => {
                warn!(
                    workflow_id = %id.workflow_id,
                    workflow_execution_id = %id.workflow_execution_id,
                    error = %e,
                    "Skipping execution"
                );
                continue;
            }
        };

        let previous_outcome = outcomes.get(&id.workflow_id);
        let last_seen_at = previous_outcome.map_or(params.seq_nr, |o| o.last_seen_at);
        let mut next = aggregator.aggregate(previous_outcome, by_node, params.f)?;
        next.last_seen_at = last_seen_at;

        debug!(
            workflow_id = %id.workflow_id,
            workflow_execution_id = %id.workflow_execution_id,
            should_report = next.should_report,
            "Aggregated execution"
        );
        outcomes.insert(id.workflow_id.clone(), next.clone());
        current_reports.push(Report {
            id: id.clone(),
            outcome: next,
        });
    }

    let mut pruned = Vec::new();
    for (workflow_id, outcome) in outcomes.iter_mut() {
        let seen = registered_by.get(workflow_id).copied().unwrap_or(0);
        if seen >= params.f + 1 {
            outcome.last_seen_at = params.seq_nr;
        } else if params.seq_nr.saturating_sub(outcome.last_seen_at) > params.pruning_threshold {
            info!(
                workflow_id = %workflow_id,
                last_seen_at = outcome.last_seen_at,
                seq_nr = params.seq_nr,
                "Pruning workflow outcome"
            );
            pruned.push(workflow_id.clone());
        }
    }
    for workflow_id in &pruned {
        outcomes.remove(workflow_id);
    }

    Ok(RoundResult {
        outcome: Outcome {
            outcomes,
            current_reports,
        },
        pruned,
    })
}
