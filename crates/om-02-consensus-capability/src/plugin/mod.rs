//! # Reporting Plugin
//!
//! Agreement protocol phases for the consensus capability:
//!
//! ```text
//! Query ──→ Observation ──→ Outcome ──→ Reports ──→ Accept/Transmit
//!  (ids)     (payloads +      (reconcile,   (encode
//!             registered ids)  prune)        reported outcomes)
//! ```
//!
//! Apart from the request store all round state lives in the outcome blob
//! handed back by the driver, so every node recomputes the same outcome from
//! the same inputs.

mod factory;
mod outcome;


pub use factory::{
    ReportingPluginConfig, ReportingPluginFactory, ReportingPluginInfo, ReportingPluginLimits,
    PLUGIN_NAME,
};
pub use outcome::{reconcile, NodeObservations, RoundParams, RoundResult};

use crate::config::PluginConfig;
use crate::domain::{
    decode_blob, encode_blob, AttributedObservation, Id, Observation, Observations, Outcome,
    OutcomeContext, Query, ReportInfo, ReportWithInfo, RequestStore,
};
use crate::error::{CapabilityError, Result};
use crate::metrics;
use crate::ports::{ReportingPlugin, WorkflowRegistry};
use om_01_aggregation::OracleId;
use shared_types::{Value, ValueMap};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Key under which transmission metadata is merged into a reported outcome.
pub const METADATA_KEY: &str = "Metadata";

/// Version of the merged metadata layout.
pub const METADATA_VERSION: i64 = 1;

/// Reporting plugin for one node.
pub struct ConsensusReportingPlugin {
    store: Arc<RequestStore>,
    registry: Arc<dyn WorkflowRegistry>,
    config: PluginConfig,
    oracle_id: OracleId,
    f: usize,
}

impl ConsensusReportingPlugin {
    pub fn new(
        store: Arc<RequestStore>,
        registry: Arc<dyn WorkflowRegistry>,
        config: PluginConfig,
        oracle_id: OracleId,
        f: usize,
    ) -> Self {
        Self {
            store,
            registry,
            config,
            oracle_id,
            f,
        }
    }

    pub fn config(&self) -> &PluginConfig {
        &self.config
    }

    fn check_length(&self, what: &str, len: usize, max: usize) -> Result<()> {
        if len > max {
            return Err(CapabilityError::Codec(format!(
                "{what} of {len} bytes exceeds limit of {max}"
            )));
        }
        Ok(())
    }

    /// Group decoded observations by execution id and count registrations.
    ///
    /// Only the first blob from each observer counts.
    fn group(
        observations: &[AttributedObservation],
    ) -> Result<(BTreeMap<String, NodeObservations>, BTreeMap<String, usize>)> {
        let mut by_execution: BTreeMap<String, NodeObservations> = BTreeMap::new();
        let mut registered: BTreeMap<String, BTreeSet<OracleId>> = BTreeMap::new();
        let mut observers = BTreeSet::new();

        for attributed in observations {
            if !observers.insert(attributed.observer) {
                warn!(observer = attributed.observer, "Duplicate observation from node");
                continue;
            }
            let decoded: Observations = decode_blob(&attributed.observation, "observation")?;

            for observation in decoded.observations {
                by_execution
                    .entry(observation.id.workflow_execution_id)
                    .or_default()
                    .entry(attributed.observer)
                    .or_insert(observation.observations);
            }
            for workflow_id in decoded.registered_workflow_ids {
                registered
                    .entry(workflow_id)
                    .or_default()
                    .insert(attributed.observer);
            }
        }

        let counts = registered
            .into_iter()
            .map(|(workflow_id, nodes)| (workflow_id, nodes.len()))
            .collect();
        Ok((by_execution, counts))
    }
}

/// Transmission metadata merged into a reported outcome.
fn metadata_value(id: &Id) -> Value {
    let mut metadata = ValueMap::new();
    metadata.insert("version".to_string(), Value::Int64(METADATA_VERSION));
    metadata.insert(
        "execution_id".to_string(),
        Value::from(id.workflow_execution_id.as_str()),
    );
    metadata.insert("workflow_id".to_string(), Value::from(id.workflow_id.as_str()));
    metadata.insert(
        "workflow_owner".to_string(),
        Value::from(id.workflow_owner.as_str()),
    );
    metadata.insert(
        "workflow_name".to_string(),
        Value::from(id.workflow_name.as_str()),
    );
    metadata.insert("don_id".to_string(), Value::Int64(id.workflow_don_id.into()));
    metadata.insert(
        "don_config_version".to_string(),
        Value::Int64(id.workflow_don_config_version.into()),
    );
    metadata.insert("report_id".to_string(), Value::from(id.report_id.as_str()));
    Value::Map(metadata)
}

impl ReportingPlugin for ConsensusReportingPlugin {
    fn query(&self, ctx: &OutcomeContext) -> Result<Vec<u8>> {
        let batch = self.store.first_n(self.config.batch_size())?;
        let query = Query {
            ids: batch.iter().map(|request| request.id()).collect(),
        };

        debug!(
            oracle_id = self.oracle_id,
            seq_nr = ctx.seq_nr,
            batch = query.ids.len(),
            "Query built"
        );
        let bytes = encode_blob(&query, "query")?;
        self.check_length("query", bytes.len(), self.config.max_query_length_bytes)?;
        Ok(bytes)
    }

    fn observation(&self, ctx: &OutcomeContext, query: &[u8]) -> Result<Vec<u8>> {
        let query: Query = decode_blob(query, "query")?;
        let ids: Vec<String> = query
            .ids
            .iter()
            .map(|id| id.workflow_execution_id.clone())
            .collect();

        let local = self.store.get_n(&ids);
        if local.len() < ids.len() {
            debug!(
                oracle_id = self.oracle_id,
                seq_nr = ctx.seq_nr,
                queried = ids.len(),
                found = local.len(),
                "Some queried executions are not pending locally"
            );
        }

        let observations = Observations {
            observations: local
                .iter()
                .map(|request| Observation {
                    id: request.id(),
                    observations: request.observations.clone(),
                })
                .collect(),
            registered_workflow_ids: self.registry.registered_workflow_ids(),
        };

        let bytes = encode_blob(&observations, "observation")?;
        self.check_length(
            "observation",
            bytes.len(),
            self.config.max_observation_length_bytes,
        )?;
        Ok(bytes)
    }

    fn validate_observation(
        &self,
        _ctx: &OutcomeContext,
        _query: &[u8],
        observation: &AttributedObservation,
    ) -> Result<()> {
        self.check_length(
            "observation",
            observation.observation.len(),
            self.config.max_observation_length_bytes,
        )?;
        decode_blob::<Observations>(&observation.observation, "observation")?;
        Ok(())
    }

    fn observation_quorum(
        &self,
        _ctx: &OutcomeContext,
        _query: &[u8],
        observations: &[AttributedObservation],
    ) -> Result<bool> {
        Ok(observations.len() >= 2 * self.f + 1)
    }

    fn outcome(
        &self,
        ctx: &OutcomeContext,
        query: &[u8],
        observations: &[AttributedObservation],
    ) -> Result<Vec<u8>> {
        let query: Query = decode_blob(query, "query")?;
        let (by_execution, registered_by) = Self::group(observations)?;
        let previous = Outcome::decode(&ctx.previous_outcome)?;

        let params = RoundParams {
            seq_nr: ctx.seq_nr,
            f: self.f,
            pruning_threshold: self.config.outcome_pruning_threshold,
        };
        let result = reconcile(
            previous,
            &query,
            &by_execution,
            &registered_by,
            params,
            self.registry.as_ref(),
        )?;

        for workflow_id in &result.pruned {
            self.registry.unregister_workflow(workflow_id);
            metrics::record_workflow_pruned();
        }

        debug!(
            oracle_id = self.oracle_id,
            seq_nr = ctx.seq_nr,
            reports = result.outcome.current_reports.len(),
            workflows = result.outcome.outcomes.len(),
            "Outcome computed"
        );
        let bytes = encode_blob(&result.outcome, "outcome")?;
        self.check_length("outcome", bytes.len(), self.config.max_outcome_length_bytes)?;
        Ok(bytes)
    }

    fn reports(&self, seq_nr: u64, outcome: &[u8]) -> Result<Vec<ReportWithInfo>> {
        let outcome = Outcome::decode(outcome)?;
        let mut reports = Vec::with_capacity(outcome.current_reports.len());

        for report in outcome.current_reports {
            if reports.len() >= self.config.max_report_count {
                warn!(
                    seq_nr,
                    limit = self.config.max_report_count,
                    "Report count limit reached, deferring the rest"
                );
                break;
            }

            let should_report = report.outcome.should_report;
            let mut payload = Vec::new();
            if should_report {
                let mut merged = report.outcome.encodable_outcome;
                merged.insert(METADATA_KEY.to_string(), metadata_value(&report.id));

                let encoded = self
                    .registry
                    .get_encoder(&report.id.workflow_id)
                    .and_then(|encoder| encoder.encode(&merged).map_err(CapabilityError::from));
                payload = match encoded {
                    Ok(bytes) if bytes.len() <= self.config.max_report_length_bytes => bytes,
                    Ok(bytes) => {
                        error!(
                            seq_nr,
                            workflow_execution_id = %report.id.workflow_execution_id,
                            len = bytes.len(),
                            "Encoded report exceeds length limit, dropping"
                        );
                        continue;
                    }
                    Err(e) => {
                        error!(
                            seq_nr,
                            workflow_execution_id = %report.id.workflow_execution_id,
                            error = %e,
                            "Failed to encode report, dropping"
                        );
                        continue;
                    }
                };
            }

            let info = ReportInfo {
                id: report.id,
                should_report,
            };
            reports.push(ReportWithInfo {
                report: payload,
                info: encode_blob(&info, "report info")?,
            });
        }

        metrics::record_reports_produced(reports.len());
        debug!(seq_nr, reports = reports.len(), "Reports built");
        Ok(reports)
    }

    fn should_accept_attested_report(&self, _seq_nr: u64, _report: &ReportWithInfo) -> Result<bool> {
        Ok(true)
    }

    fn should_transmit_accepted_report(
        &self,
        _seq_nr: u64,
        _report: &ReportWithInfo,
    ) -> Result<bool> {
        Ok(true)
    }

    fn close(&self) -> Result<()> {
        debug!(oracle_id = self.oracle_id, "Reporting plugin closed");
        Ok(())
    }
}
