//! Transmitter that hands attested reports back to the local capability.
//!
//! Instead of writing to a chain, the "transmission" is a `sendResponse`
//! call into the capability, which releases the workflow step waiting on
//! the execution.

use crate::domain::{decode_blob, ReportInfo, ReportWithInfo};
use crate::error::{CapabilityError, Result};
use crate::ports::{ConsensusCapabilityApi, ContractTransmitter};
use async_trait::async_trait;
use shared_types::{CapabilityRequest, RequestMetadata, Value, ValueMap, METHOD_SEND_RESPONSE};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Report context: the config digest followed by the round number as a
/// big-endian integer in a 32-byte word.
pub fn report_context(config_digest: &[u8; 32], seq_nr: u64) -> Vec<u8> {
    let mut context = Vec::with_capacity(64);
    context.extend_from_slice(config_digest);
    context.extend_from_slice(&[0u8; 24]);
    context.extend_from_slice(&seq_nr.to_be_bytes());
    context
}

pub struct CapabilityTransmitter {
    capability: Arc<dyn ConsensusCapabilityApi>,
    from_account: String,
}

impl CapabilityTransmitter {
    pub fn new(capability: Arc<dyn ConsensusCapabilityApi>, from_account: impl Into<String>) -> Self {
        Self {
            capability,
            from_account: from_account.into(),
        }
    }

    fn response_value(
        info: &ReportInfo,
        config_digest: &[u8; 32],
        seq_nr: u64,
        report: Vec<u8>,
        signatures: Vec<Vec<u8>>,
    ) -> Result<Value> {
        if !info.should_report {
            return Ok(Value::empty_map());
        }

        let report_id = hex::decode(&info.id.report_id).map_err(|e| {
            CapabilityError::Transmit(format!("invalid report id {}: {e}", info.id.report_id))
        })?;

        let mut response = ValueMap::new();
        response.insert("report".to_string(), Value::Bytes(report));
        response.insert(
            "context".to_string(),
            Value::Bytes(report_context(config_digest, seq_nr)),
        );
        response.insert(
            "signatures".to_string(),
            Value::List(signatures.into_iter().map(Value::Bytes).collect()),
        );
        response.insert("id".to_string(), Value::Bytes(report_id));
        Ok(Value::Map(response))
    }
}

#[async_trait]
impl ContractTransmitter for CapabilityTransmitter {
    async fn transmit(
        &self,
        config_digest: [u8; 32],
        seq_nr: u64,
        report: ReportWithInfo,
        signatures: Vec<Vec<u8>>,
    ) -> Result<()> {
        let info: ReportInfo = decode_blob(&report.info, "report info")?;
        let response = Self::response_value(&info, &config_digest, seq_nr, report.report, signatures)?;

        let mut inputs = ValueMap::new();
        inputs.insert("response".to_string(), response);

        let request = CapabilityRequest {
            metadata: RequestMetadata {
                workflow_id: info.id.workflow_id.clone(),
                workflow_execution_id: info.id.workflow_execution_id.clone(),
                workflow_owner: info.id.workflow_owner.clone(),
                workflow_name: info.id.workflow_name.clone(),
                workflow_don_id: info.id.workflow_don_id,
                workflow_don_config_version: info.id.workflow_don_config_version,
            },
            config: Value::Null,
            inputs: Value::Map(inputs),
            method: METHOD_SEND_RESPONSE.to_string(),
        };

        debug!(
            seq_nr,
            workflow_execution_id = %info.id.workflow_execution_id,
            should_report = info.should_report,
            "Transmitting report to capability"
        );
        self.capability
            .execute(CancellationToken::new(), request)
            .await
            .map(drop)
    }

    fn from_account(&self) -> String {
        self.from_account.clone()
    }
}
