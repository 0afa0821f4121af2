//! # Consensus Capability Service
//!
//! Ingress/egress façade for workflow executions.
//!
//! ```text
//! execute ──→ [RequestStore] ←── Query/Observation (plugin)
//!    │              ↑ evict
//!    └─arm─→ [Worker] ←─transmit── ContractTransmitter
//!               │
//!               └──→ caller's response channel (exactly once)
//! ```
//!
//! `execute` never waits on a round: it stores the request, asks the worker
//! to arm its timer and returns the caller's receiver.

mod worker;


pub use worker::TIMEOUT_MESSAGE;

/// Error delivered to callers still waiting when the capability closes.
pub const SHUTDOWN_MESSAGE: &str = "consensus capability closed before the request was processed";

use crate::config::{CapabilityConfig, RequestConfig};
use crate::domain::{PendingRequest, Request, RequestStore, TransmitResponse};
use crate::error::{CapabilityError, Result};
use crate::metrics;
use crate::ports::{ConsensusCapabilityApi, WorkflowRegistry};
use async_trait::async_trait;
use om_01_aggregation::{Aggregator, AggregatorRegistry, Encoder, EncoderRegistry};
use parking_lot::{Mutex, RwLock};
use shared_types::{
    CapabilityInfo, CapabilityRequest, CapabilityResponse, CapabilityType, RegistrationRequest,
    Service, ServiceError, ServiceErrorKind, ServiceStatus, Value,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};
use worker::{ArmTimer, Worker};

/// Capability id published to the registry.
pub const CAPABILITY_ID: &str = "offchain_reporting@1.0.0";

const SERVICE_NAME: &str = "consensus-capability";

/// A workflow's aggregation policy and encoder.
#[derive(Clone)]
struct Registration {
    aggregator: Arc<dyn Aggregator>,
    encoder: Arc<dyn Encoder>,
}

enum WorkerState {
    Idle {
        arm_rx: mpsc::UnboundedReceiver<ArmTimer>,
        transmit_rx: mpsc::UnboundedReceiver<TransmitResponse>,
    },
    Running(JoinHandle<()>),
    Stopped,
}

/// Consensus capability front-end.
pub struct ConsensusCapability {
    config: CapabilityConfig,
    store: Arc<RequestStore>,
    registrations: RwLock<HashMap<String, Registration>>,
    aggregators: AggregatorRegistry,
    encoders: EncoderRegistry,
    arm_tx: mpsc::UnboundedSender<ArmTimer>,
    transmit_tx: mpsc::UnboundedSender<TransmitResponse>,
    worker: Mutex<WorkerState>,
    cancel: CancellationToken,
    timers: TaskTracker,
}

impl ConsensusCapability {
    /// Capability with the built-in aggregation methods and encoders.
    pub fn new(config: CapabilityConfig) -> Self {
        Self::with_registries(
            config,
            Arc::new(RequestStore::new()),
            AggregatorRegistry::default(),
            EncoderRegistry::default(),
        )
    }

    pub fn with_registries(
        config: CapabilityConfig,
        store: Arc<RequestStore>,
        aggregators: AggregatorRegistry,
        encoders: EncoderRegistry,
    ) -> Self {
        let (arm_tx, arm_rx) = mpsc::unbounded_channel();
        let (transmit_tx, transmit_rx) = mpsc::unbounded_channel();

        Self {
            config,
            store,
            registrations: RwLock::new(HashMap::new()),
            aggregators,
            encoders,
            arm_tx,
            transmit_tx,
            worker: Mutex::new(WorkerState::Idle {
                arm_rx,
                transmit_rx,
            }),
            cancel: CancellationToken::new(),
            timers: TaskTracker::new(),
        }
    }

    pub fn store(&self) -> Arc<RequestStore> {
        Arc::clone(&self.store)
    }

    pub fn config(&self) -> &CapabilityConfig {
        &self.config
    }

    /// Expiry timers still waiting.
    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    fn build_request(&self, request: &CapabilityRequest) -> Result<Request> {
        let observations = validate_inputs(&request.inputs)?;
        let config = RequestConfig::from_value(&request.config)?;
        let metadata = &request.metadata;
        if metadata.workflow_execution_id.is_empty() {
            return Err(CapabilityError::InvalidInputs(
                "missing workflow execution id".to_string(),
            ));
        }

        Ok(Request {
            workflow_execution_id: metadata.workflow_execution_id.clone(),
            workflow_id: metadata.workflow_id.clone(),
            workflow_owner: metadata.workflow_owner.clone(),
            workflow_name: metadata.workflow_name.clone(),
            workflow_don_id: metadata.workflow_don_id,
            workflow_don_config_version: metadata.workflow_don_config_version,
            report_id: config.report_id,
            key_id: config.key_id,
            observations,
            expires_at: Instant::now() + self.config.request_timeout(),
        })
    }

    fn service_error(kind: ServiceErrorKind, message: impl Into<String>) -> ServiceError {
        ServiceError::new(SERVICE_NAME, kind, message)
    }
}

/// Inputs must be a map whose `observations` entry is a list.
fn validate_inputs(inputs: &Value) -> Result<Vec<Value>> {
    let Some(map) = inputs.as_map() else {
        return Err(CapabilityError::InvalidInputs(format!(
            "expected map, got {}",
            inputs.kind()
        )));
    };
    match map.get("observations") {
        Some(Value::List(observations)) => Ok(observations.clone()),
        Some(other) => Err(CapabilityError::InvalidInputs(format!(
            "observations must be a list, got {}",
            other.kind()
        ))),
        None => Err(CapabilityError::InvalidInputs(
            "missing observations".to_string(),
        )),
    }
}

#[async_trait]
impl ConsensusCapabilityApi for ConsensusCapability {
    fn info(&self) -> CapabilityInfo {
        CapabilityInfo::new(
            CAPABILITY_ID,
            CapabilityType::Consensus,
            "OCR3 consensus exposed as a capability.",
        )
    }

    async fn execute(
        &self,
        caller: CancellationToken,
        request: CapabilityRequest,
    ) -> Result<mpsc::Receiver<CapabilityResponse>> {
        if request.is_send_response() {
            let response = TransmitResponse::from_request(&request)?;
            self.transmit_response(response).await?;
            // Nothing is sent back for a finalize call
            let (_, rx) = mpsc::channel(1);
            return Ok(rx);
        }

        let built = self.build_request(&request)?;
        let workflow_execution_id = built.workflow_execution_id.clone();
        let expires_at = built.expires_at;
        let timer = self.cancel.child_token();

        let (tx, rx) = mpsc::channel(self.config.callback_buffer_size.max(1));
        let seq = self
            .store
            .add(PendingRequest::new(built, tx, caller).with_timer(&timer))?;
        let arm = ArmTimer {
            workflow_execution_id,
            seq,
            expires_at,
            cancel: timer,
        };

        if self.arm_tx.send(arm).is_err() {
            // Worker is gone; nothing would ever answer this request
            self.store.evict_if(&request.metadata.workflow_execution_id, seq);
            return Err(CapabilityError::NotStarted);
        }

        metrics::record_request_accepted();
        info!(
            workflow_id = %request.metadata.workflow_id,
            workflow_execution_id = %request.metadata.workflow_execution_id,
            "Consensus request accepted"
        );
        Ok(rx)
    }

    async fn register_to_workflow(&self, request: RegistrationRequest) -> Result<()> {
        let config = RequestConfig::from_value(&request.config)?;

        let aggregator = self
            .aggregators
            .build(&config.aggregation_method, &config.aggregation_config)
            .map_err(|e| CapabilityError::InvalidConfig(e.to_string()))?;
        let encoder = self
            .encoders
            .build(&config.encoder, &config.encoder_config)
            .map_err(|e| CapabilityError::InvalidConfig(e.to_string()))?;

        self.registrations.write().insert(
            request.metadata.workflow_id.clone(),
            Registration {
                aggregator,
                encoder,
            },
        );

        info!(
            workflow_id = %request.metadata.workflow_id,
            method = %config.aggregation_method,
            encoder = %config.encoder,
            "Workflow registered"
        );
        Ok(())
    }

    async fn unregister_from_workflow(&self, request: RegistrationRequest) -> Result<()> {
        self.unregister_workflow(&request.metadata.workflow_id);
        Ok(())
    }

    async fn transmit_response(&self, response: TransmitResponse) -> Result<()> {
        debug!(
            workflow_execution_id = %response.workflow_execution_id,
            is_error = response.response.is_err(),
            "Queueing transmitted response"
        );
        self.transmit_tx
            .send(response)
            .map_err(|_| CapabilityError::NotStarted)
    }
}

impl WorkflowRegistry for ConsensusCapability {
    fn get_aggregator(&self, workflow_id: &str) -> Result<Arc<dyn Aggregator>> {
        self.registrations
            .read()
            .get(workflow_id)
            .map(|r| Arc::clone(&r.aggregator))
            .ok_or_else(|| CapabilityError::NoAggregatorFound(workflow_id.to_string()))
    }

    fn get_encoder(&self, workflow_id: &str) -> Result<Arc<dyn Encoder>> {
        self.registrations
            .read()
            .get(workflow_id)
            .map(|r| Arc::clone(&r.encoder))
            .ok_or_else(|| CapabilityError::NoEncoderFound(workflow_id.to_string()))
    }

    fn registered_workflow_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.registrations.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    fn unregister_workflow(&self, workflow_id: &str) {
        if self.registrations.write().remove(workflow_id).is_some() {
            info!(workflow_id, "Workflow unregistered");
        }
    }
}

#[async_trait]
impl Service for ConsensusCapability {
    fn name(&self) -> &'static str {
        SERVICE_NAME
    }

    async fn start(&self) -> std::result::Result<(), ServiceError> {
        let mut state = self.worker.lock();
        match std::mem::replace(&mut *state, WorkerState::Stopped) {
            WorkerState::Idle {
                arm_rx,
                transmit_rx,
            } => {
                let worker = Worker::new(
                    Arc::clone(&self.store),
                    arm_rx,
                    transmit_rx,
                    self.cancel.clone(),
                    self.timers.clone(),
                );
                *state = WorkerState::Running(tokio::spawn(worker.run()));
                Ok(())
            }
            other => {
                let message = match &other {
                    WorkerState::Stopped => "capability already closed",
                    _ => "worker already started",
                };
                *state = other;
                Err(Self::service_error(ServiceErrorKind::AlreadyStarted, message))
            }
        }
    }

    async fn close(&self) -> std::result::Result<(), ServiceError> {
        let handle = {
            let mut state = self.worker.lock();
            match std::mem::replace(&mut *state, WorkerState::Stopped) {
                WorkerState::Running(handle) => handle,
                other => {
                    *state = other;
                    return Err(Self::service_error(
                        ServiceErrorKind::NotStarted,
                        "worker not running",
                    ));
                }
            }
        };

        self.cancel.cancel();
        let joined = handle.await;

        self.timers.close();
        self.timers.wait().await;

        if let Err(e) = joined {
            warn!(error = %e, "Consensus capability worker ended abnormally");
            return Err(Self::service_error(
                ServiceErrorKind::ShutdownFailed,
                e.to_string(),
            ));
        }
        let remaining = self.store.drain();
        let pending = remaining.len();
        for request in remaining {
            let delivery = request
                .respond(CapabilityResponse::failure(SHUTDOWN_MESSAGE))
                .await;
            metrics::record_response_dropped("shutdown");
            debug!(reason = delivery.as_str(), "Pending request answered at shutdown");
        }
        info!(pending, "Consensus capability closed");
        Ok(())
    }

    async fn health_check(&self) -> ServiceStatus {
        match &*self.worker.lock() {
            WorkerState::Idle { .. } => ServiceStatus::Idle,
            WorkerState::Running(handle) if !handle.is_finished() => ServiceStatus::Healthy,
            WorkerState::Running(_) | WorkerState::Stopped => ServiceStatus::Stopped,
        }
    }
}
