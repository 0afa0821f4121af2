//! # In-process Test Network
//!
//! `n` nodes, each with its own capability, reporting plugin and
//! transmitter. The harness stands in for the agreement protocol driver: it
//! rotates the leader per round, gathers every node's observation, checks
//! that all nodes compute the same outcome and transmits the resulting
//! reports from every node to its own capability.

use anyhow::{ensure, Context, Result};
use om_01_aggregation::OracleId;
use om_02_consensus_capability::{
    AttributedObservation, CapabilityConfig, CapabilityError, CapabilityTransmitter,
    ConsensusCapability, ConsensusCapabilityApi, ConsensusReportingPlugin, ContractTransmitter,
    InMemoryCapabilityRegistry, Outcome, OutcomeContext, ReportingPlugin, ReportingPluginConfig,
    ReportingPluginFactory, StoreError,
};
use shared_types::{
    CapabilityRequest, CapabilityResponse, RegistrationRequest, RequestMetadata, Service, Value,
    ValueMap,
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

const CONFIG_DIGEST: [u8; 32] = [0xcd; 32];

/// One participant of the network.
pub struct Node {
    pub oracle_id: OracleId,
    pub capability: Arc<ConsensusCapability>,
    pub registry: Arc<InMemoryCapabilityRegistry>,
    pub factory: ReportingPluginFactory,
    pub plugin: ConsensusReportingPlugin,
    pub transmitter: CapabilityTransmitter,
}

/// What one round agreed on.
#[derive(Debug, Clone, PartialEq)]
pub struct RoundSummary {
    pub seq_nr: u64,
    pub leader: OracleId,
    pub outcome: Outcome,
    /// Reports transmitted, summed over all nodes
    pub transmitted: usize,
}

pub struct TestNetwork {
    pub nodes: Vec<Node>,
    pub f: usize,
    seq_nr: u64,
    previous_outcome: Vec<u8>,
}

impl TestNetwork {
    /// Start `n` nodes tolerating `f` faulty ones.
    pub async fn start(n: usize, f: usize, config: CapabilityConfig) -> Result<Self> {
        ensure!(n > 3 * f, "need n > 3f, got n = {n}, f = {f}");

        let mut nodes = Vec::with_capacity(n);
        for i in 0..n {
            let oracle_id = OracleId::try_from(i).context("too many nodes")?;
            let capability = Arc::new(ConsensusCapability::new(config.clone()));
            capability.start().await?;

            let registry = Arc::new(InMemoryCapabilityRegistry::new());
            let factory = ReportingPluginFactory::new(Arc::clone(&capability), registry.clone())?;
            let (plugin, _info) = factory.new_reporting_plugin(ReportingPluginConfig {
                config_digest: CONFIG_DIGEST,
                oracle_id,
                n,
                f,
                offchain_config: Vec::new(),
            })?;
            let transmitter = CapabilityTransmitter::new(capability.clone(), format!("node-{i}"));

            nodes.push(Node {
                oracle_id,
                capability,
                registry,
                factory,
                plugin,
                transmitter,
            });
        }

        Ok(Self {
            nodes,
            f,
            seq_nr: 0,
            previous_outcome: Vec::new(),
        })
    }

    pub fn seq_nr(&self) -> u64 {
        self.seq_nr
    }

    /// Register `workflow_id` on every node.
    pub async fn register(&self, workflow_id: &str, config: &Value) -> Result<()> {
        for node in &self.nodes {
            node.capability
                .register_to_workflow(RegistrationRequest {
                    metadata: metadata(workflow_id, ""),
                    config: config.clone(),
                })
                .await?;
        }
        Ok(())
    }

    /// Submit the same execution to every node.
    pub async fn execute(
        &self,
        workflow_id: &str,
        execution_id: &str,
        config: &Value,
        observation: &Value,
    ) -> Result<Vec<mpsc::Receiver<CapabilityResponse>>> {
        let all: Vec<usize> = (0..self.nodes.len()).collect();
        self.execute_on(&all, workflow_id, execution_id, config, observation)
            .await
    }

    /// Submit an execution to the listed nodes only.
    pub async fn execute_on(
        &self,
        nodes: &[usize],
        workflow_id: &str,
        execution_id: &str,
        config: &Value,
        observation: &Value,
    ) -> Result<Vec<mpsc::Receiver<CapabilityResponse>>> {
        let mut inputs = ValueMap::new();
        inputs.insert(
            "observations".to_string(),
            Value::List(vec![observation.clone()]),
        );
        let request = CapabilityRequest {
            metadata: metadata(workflow_id, execution_id),
            config: config.clone(),
            inputs: Value::Map(inputs),
            method: String::new(),
        };

        let mut receivers = Vec::with_capacity(nodes.len());
        for &i in nodes {
            let node = self.nodes.get(i).context("no such node")?;
            let rx = node
                .capability
                .execute(CancellationToken::new(), request.clone())
                .await?;
            receivers.push(rx);
        }
        Ok(receivers)
    }

    /// Drive one full round. Returns `None` when the leader has nothing
    /// pending.
    pub async fn run_round(&mut self) -> Result<Option<RoundSummary>> {
        self.seq_nr += 1;
        let seq_nr = self.seq_nr;
        let ctx = OutcomeContext {
            seq_nr,
            previous_outcome: self.previous_outcome.clone(),
        };

        let leader = &self.nodes[(seq_nr as usize) % self.nodes.len()];
        let query = match leader.plugin.query(&ctx) {
            Ok(query) => query,
            Err(CapabilityError::Store(StoreError::QueueEmpty)) => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let mut observations = Vec::with_capacity(self.nodes.len());
        for node in &self.nodes {
            observations.push(AttributedObservation {
                observer: node.oracle_id,
                observation: node.plugin.observation(&ctx, &query)?,
            });
        }
        for node in &self.nodes {
            for observation in &observations {
                node.plugin.validate_observation(&ctx, &query, observation)?;
            }
        }
        ensure!(
            leader.plugin.observation_quorum(&ctx, &query, &observations)?,
            "observation quorum not reached in round {seq_nr}"
        );

        // Every node sees the observations in a different order
        let mut agreed: Option<Vec<u8>> = None;
        for (i, node) in self.nodes.iter().enumerate() {
            let mut view = observations.clone();
            view.rotate_left(i);
            let outcome = node.plugin.outcome(&ctx, &query, &view)?;
            match &agreed {
                Some(bytes) => ensure!(
                    *bytes == outcome,
                    "node {i} computed a different outcome in round {seq_nr}"
                ),
                None => agreed = Some(outcome),
            }
        }
        let outcome = agreed.context("network has no nodes")?;

        let signatures: Vec<Vec<u8>> = self
            .nodes
            .iter()
            .take(self.f + 1)
            .map(|node| vec![node.oracle_id; 65])
            .collect();

        let mut transmitted = 0;
        for node in &self.nodes {
            for report in node.plugin.reports(seq_nr, &outcome)? {
                if !node.plugin.should_accept_attested_report(seq_nr, &report)?
                    || !node.plugin.should_transmit_accepted_report(seq_nr, &report)?
                {
                    continue;
                }
                node.transmitter
                    .transmit(CONFIG_DIGEST, seq_nr, report, signatures.clone())
                    .await?;
                transmitted += 1;
            }
        }

        let summary = RoundSummary {
            seq_nr,
            leader: leader.oracle_id,
            outcome: Outcome::decode(&outcome)?,
            transmitted,
        };
        self.previous_outcome = outcome;
        Ok(Some(summary))
    }

    /// Close every plugin, withdraw every capability and stop every worker.
    pub async fn shutdown(&self) -> Result<()> {
        for node in &self.nodes {
            node.plugin.close()?;
            node.factory.close()?;
            node.capability.close().await?;
        }
        Ok(())
    }
}

fn metadata(workflow_id: &str, execution_id: &str) -> RequestMetadata {
    RequestMetadata {
        workflow_id: workflow_id.to_string(),
        workflow_execution_id: execution_id.to_string(),
        workflow_owner: "0x00000000000000000000000000000000000000aa".to_string(),
        workflow_name: "price-feeds".to_string(),
        workflow_don_id: 1,
        workflow_don_config_version: 1,
    }
}
