//! # om-02-consensus-capability
//!
//! Exposes an OCR3-style agreement protocol to workflow engines as a
//! capability. A workflow step hands in its node-local observations and gets
//! back, exactly once, either the report the network agreed on or an error.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │                     CONSENSUS CAPABILITY (om-02)                      │
//! ├──────────────────────────────────────────────────────────────────────┤
//! │  execute / register ──→ ConsensusCapability ──→ RequestStore         │
//! │                             │   ▲                    │               │
//! │                        arm  │   │ sendResponse       │ first_n/get_n │
//! │                             ▼   │                    ▼               │
//! │                          Worker ◄── Transmitter ◄── ReportingPlugin  │
//! │                             │                   (Query → Observation │
//! │                             ▼                    → Outcome → Reports)│
//! │                    caller's response channel                         │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Guarantees
//!
//! - Every accepted request is answered at most once: by a transmitted
//!   report, by its expiry timer, or not at all if the caller cancelled.
//! - Outcomes are a deterministic function of the previous outcome and the
//!   round's attributed observations, independent of arrival order.
//! - Nothing is aggregated without `2F+1` distinct observers.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use om_02_consensus_capability::{CapabilityConfig, ConsensusCapability};
//! use shared_types::Service;
//!
//! let capability = Arc::new(ConsensusCapability::new(CapabilityConfig::default()));
//! capability.start().await?;
//! capability.register_to_workflow(registration).await?;
//! let mut rx = capability.execute(caller, request).await?;
//! let response = rx.recv().await;
//! ```
//!
//! ## Metrics
//!
//! Build with `--features metrics` to export Prometheus counters; without it
//! every recording call is a no-op.

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod adapters;
pub mod config;
pub mod domain;
pub mod error;
pub mod metrics;
pub mod plugin;
pub mod ports;
pub mod service;

pub use adapters::{report_context, CapabilityTransmitter, InMemoryCapabilityRegistry};
pub use config::{CapabilityConfig, PluginConfig, RequestConfig};
pub use domain::{
    AttributedObservation, Delivery, Id, Outcome, OutcomeContext, PendingRequest, Query,
    ReportInfo, ReportWithInfo, Request, RequestStore, TransmitResponse,
};
pub use error::{CapabilityError, Result, StoreError};
pub use plugin::{
    ConsensusReportingPlugin, ReportingPluginConfig, ReportingPluginFactory, ReportingPluginInfo,
    ReportingPluginLimits, METADATA_KEY, METADATA_VERSION, PLUGIN_NAME,
};
pub use ports::{
    CapabilityRegistry, ConsensusCapabilityApi, ContractTransmitter, ReportingPlugin,
    WorkflowRegistry,
};
pub use service::{ConsensusCapability, CAPABILITY_ID, SHUTDOWN_MESSAGE, TIMEOUT_MESSAGE};
