//! Ports layer: driving (inbound) and driven (outbound) interfaces.

pub mod inbound;
pub mod outbound;

pub use inbound::{ConsensusCapabilityApi, ContractTransmitter, ReportingPlugin};
pub use outbound::{CapabilityRegistry, WorkflowRegistry};
