//! Driving ports (Inbound API)

use crate::domain::{AttributedObservation, OutcomeContext, ReportWithInfo, TransmitResponse};
use crate::error::Result;
use async_trait::async_trait;
use shared_types::{CapabilityInfo, CapabilityRequest, CapabilityResponse, RegistrationRequest};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Consensus capability as seen by a workflow engine.
#[async_trait]
pub trait ConsensusCapabilityApi: Send + Sync {
    /// Descriptor published to the capability registry.
    fn info(&self) -> CapabilityInfo;

    /// Submit an execution, or finalize one when the method is
    /// `sendResponse`.
    ///
    /// Returns immediately with a receiver that yields exactly one response
    /// and then closes. `caller` is cancelled when the caller stops waiting.
    async fn execute(
        &self,
        caller: CancellationToken,
        request: CapabilityRequest,
    ) -> Result<mpsc::Receiver<CapabilityResponse>>;

    /// Install the aggregator and encoder named by the registration config.
    async fn register_to_workflow(&self, request: RegistrationRequest) -> Result<()>;

    /// Remove a workflow's aggregator and encoder.
    async fn unregister_from_workflow(&self, request: RegistrationRequest) -> Result<()>;

    /// Hand a finalized result to the worker for delivery.
    async fn transmit_response(&self, response: TransmitResponse) -> Result<()>;
}

/// The five-phase agreement protocol callbacks.
///
/// Invoked by an external driver; rounds never overlap for one plugin
/// instance.
pub trait ReportingPlugin: Send + Sync {
    /// Propose the executions to reconcile this round.
    fn query(&self, ctx: &OutcomeContext) -> Result<Vec<u8>>;

    /// This node's observations for the proposed executions.
    fn observation(&self, ctx: &OutcomeContext, query: &[u8]) -> Result<Vec<u8>>;

    /// Reject observations that cannot be decoded.
    fn validate_observation(
        &self,
        ctx: &OutcomeContext,
        query: &[u8],
        observation: &AttributedObservation,
    ) -> Result<()>;

    /// Whether enough observations were collected to compute an outcome.
    fn observation_quorum(
        &self,
        ctx: &OutcomeContext,
        query: &[u8],
        observations: &[AttributedObservation],
    ) -> Result<bool>;

    /// Reconcile all observations into the next agreed outcome.
    fn outcome(
        &self,
        ctx: &OutcomeContext,
        query: &[u8],
        observations: &[AttributedObservation],
    ) -> Result<Vec<u8>>;

    /// Turn the round's outcome into transmittable reports.
    fn reports(&self, seq_nr: u64, outcome: &[u8]) -> Result<Vec<ReportWithInfo>>;

    fn should_accept_attested_report(&self, seq_nr: u64, report: &ReportWithInfo) -> Result<bool>;

    fn should_transmit_accepted_report(&self, seq_nr: u64, report: &ReportWithInfo)
        -> Result<bool>;

    fn close(&self) -> Result<()>;
}

/// Final stage of a round: hands an attested report back to the capability.
#[async_trait]
pub trait ContractTransmitter: Send + Sync {
    async fn transmit(
        &self,
        config_digest: [u8; 32],
        seq_nr: u64,
        report: ReportWithInfo,
        signatures: Vec<Vec<u8>>,
    ) -> Result<()>;

    fn from_account(&self) -> String;
}
