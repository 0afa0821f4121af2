use super::ConsensusReportingPlugin;
use crate::config::PluginConfig;
use crate::error::Result;
use crate::ports::{CapabilityRegistry, ConsensusCapabilityApi};
use crate::service::ConsensusCapability;
use om_01_aggregation::OracleId;
use std::sync::Arc;
use tracing::info;

/// Name reported to the agreement protocol.
pub const PLUGIN_NAME: &str = "OCR3 Capability Plugin";

/// Parameters the agreement protocol supplies for each configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportingPluginConfig {
    pub config_digest: [u8; 32],
    pub oracle_id: OracleId,
    /// Committee size
    pub n: usize,
    /// Fault threshold
    pub f: usize,
    /// JSON encoded [`PluginConfig`]; empty for defaults
    pub offchain_config: Vec<u8>,
}

/// Size limits announced to the agreement protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportingPluginLimits {
    pub max_query_length: usize,
    pub max_observation_length: usize,
    pub max_outcome_length: usize,
    pub max_report_length: usize,
    pub max_report_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportingPluginInfo {
    pub name: String,
    pub limits: ReportingPluginLimits,
}

/// Creates reporting plugins bound to one capability.
///
/// The capability is published to the registry for the lifetime of the
/// factory and withdrawn by [`ReportingPluginFactory::close`].
pub struct ReportingPluginFactory {
    capability: Arc<ConsensusCapability>,
    registry: Arc<dyn CapabilityRegistry>,
}

impl ReportingPluginFactory {
    pub fn new(
        capability: Arc<ConsensusCapability>,
        registry: Arc<dyn CapabilityRegistry>,
    ) -> Result<Self> {
        registry.add(Arc::clone(&capability) as Arc<dyn ConsensusCapabilityApi>)?;
        Ok(Self {
            capability,
            registry,
        })
    }

    pub fn new_reporting_plugin(
        &self,
        config: ReportingPluginConfig,
    ) -> Result<(ConsensusReportingPlugin, ReportingPluginInfo)> {
        let plugin_config = PluginConfig::from_offchain_config(&config.offchain_config)?;

        let info = ReportingPluginInfo {
            name: PLUGIN_NAME.to_string(),
            limits: ReportingPluginLimits {
                max_query_length: plugin_config.max_query_length_bytes,
                max_observation_length: plugin_config.max_observation_length_bytes,
                max_outcome_length: plugin_config.max_outcome_length_bytes,
                max_report_length: plugin_config.max_report_length_bytes,
                max_report_count: plugin_config.max_report_count,
            },
        };

        info!(
            oracle_id = config.oracle_id,
            n = config.n,
            f = config.f,
            config_digest = %hex::encode(config.config_digest),
            batch_size = plugin_config.batch_size(),
            "Creating reporting plugin"
        );

        let plugin = ConsensusReportingPlugin::new(
            self.capability.store(),
            Arc::clone(&self.capability) as Arc<dyn crate::ports::WorkflowRegistry>,
            plugin_config,
            config.oracle_id,
            config.f,
        );
        Ok((plugin, info))
    }

    /// Withdraw the capability from the registry.
    pub fn close(&self) -> Result<()> {
        let id = self.capability.info().id;
        if !self.registry.remove(&id) {
            info!(capability_id = %id, "Capability was not registered");
        }
        Ok(())
    }
}
