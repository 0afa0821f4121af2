use crate::domain::Id;
use crate::error::{CapabilityError, Result};
use shared_types::{CapabilityRequest, CapabilityResponse, Value};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::{CancellationToken, DropGuard};

/// A consensus request waiting for an agreed outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub workflow_execution_id: String,
    pub workflow_id: String,
    pub workflow_owner: String,
    pub workflow_name: String,
    pub workflow_don_id: u32,
    pub workflow_don_config_version: u32,
    pub report_id: String,
    pub key_id: String,
    /// This node's observations for the execution
    pub observations: Vec<Value>,
    pub expires_at: Instant,
}

impl Request {
    pub fn id(&self) -> Id {
        Id {
            workflow_execution_id: self.workflow_execution_id.clone(),
            workflow_id: self.workflow_id.clone(),
            workflow_owner: self.workflow_owner.clone(),
            workflow_name: self.workflow_name.clone(),
            workflow_don_id: self.workflow_don_id,
            workflow_don_config_version: self.workflow_don_config_version,
            report_id: self.report_id.clone(),
            key_id: self.key_id.clone(),
        }
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// How a response left the capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Written to the caller's channel
    Delivered,
    /// Caller cancelled before the response was ready
    CallerGone,
    /// Caller dropped its receiver
    ChannelClosed,
}

impl Delivery {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Delivered => "delivered",
            Self::CallerGone => "caller_gone",
            Self::ChannelClosed => "channel_closed",
        }
    }
}

/// A stored request together with the only handle able to answer it.
///
/// Whoever evicts this from the store owns the response; consuming it with
/// [`PendingRequest::respond`] drops the sender and closes the caller's
/// channel. Dropping it also cancels its expiry timer, if one is attached.
#[derive(Debug)]
pub struct PendingRequest {
    pub request: Arc<Request>,
    callback: mpsc::Sender<CapabilityResponse>,
    caller: CancellationToken,
    timer: Option<DropGuard>,
}

impl PendingRequest {
    pub fn new(
        request: Request,
        callback: mpsc::Sender<CapabilityResponse>,
        caller: CancellationToken,
    ) -> Self {
        Self {
            request: Arc::new(request),
            callback,
            caller,
            timer: None,
        }
    }

    /// Tie an expiry timer to this request's lifetime.
    pub fn with_timer(mut self, timer: &CancellationToken) -> Self {
        self.timer = Some(timer.clone().drop_guard());
        self
    }

    pub fn workflow_execution_id(&self) -> &str {
        &self.request.workflow_execution_id
    }

    /// Send the single response, unless the caller is already gone.
    pub async fn respond(self, response: CapabilityResponse) -> Delivery {
        if self.caller.is_cancelled() {
            return Delivery::CallerGone;
        }
        tokio::select! {
            biased;
            _ = self.caller.cancelled() => Delivery::CallerGone,
            sent = self.callback.send(response) => match sent {
                Ok(()) => Delivery::Delivered,
                Err(_) => Delivery::ChannelClosed,
            },
        }
    }
}

/// A finalized result for one execution, on its way back to the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct TransmitResponse {
    pub workflow_execution_id: String,
    pub response: CapabilityResponse,
}

impl TransmitResponse {
    pub fn success(workflow_execution_id: impl Into<String>, value: Value) -> Self {
        Self {
            workflow_execution_id: workflow_execution_id.into(),
            response: CapabilityResponse::success(value),
        }
    }

    pub fn failure(workflow_execution_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            workflow_execution_id: workflow_execution_id.into(),
            response: CapabilityResponse::failure(error),
        }
    }

    /// Read a `sendResponse` request: inputs carry either
    /// `{"response": <value>}` or `{"error": <string>}`.
    pub fn from_request(request: &CapabilityRequest) -> Result<Self> {
        let id = request.metadata.workflow_execution_id.as_str();
        if id.is_empty() {
            return Err(CapabilityError::InvalidInputs(
                "sendResponse without workflow execution id".to_string(),
            ));
        }

        if let Some(error) = request.inputs.get("error") {
            let message = error.as_str().ok_or_else(|| {
                CapabilityError::InvalidInputs(format!("error must be a string, got {}", error.kind()))
            })?;
            return Ok(Self::failure(id, message));
        }

        match request.inputs.get("response") {
            Some(value) => Ok(Self::success(id, value.clone())),
            None => Err(CapabilityError::InvalidInputs(
                "sendResponse inputs need response or error".to_string(),
            )),
        }
    }
}
