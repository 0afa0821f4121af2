//! # Capability Envelope
//!
//! Request/response shapes exchanged between a workflow engine and a
//! capability. The consensus capability receives a [`CapabilityRequest`] per
//! workflow step and answers with exactly one [`CapabilityResponse`] over a
//! bounded channel that it closes afterwards.

use crate::values::Value;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Method discriminator for an ordinary execution.
pub const METHOD_EXECUTE: &str = "execute";

/// Method discriminator used by the transmitter to finalize an execution.
pub const METHOD_SEND_RESPONSE: &str = "sendResponse";

/// Routing metadata for one workflow execution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestMetadata {
    /// Workflow definition identifier.
    pub workflow_id: String,
    /// Unique per submission.
    pub workflow_execution_id: String,
    /// Workflow owner address.
    pub workflow_owner: String,
    /// Human readable workflow name.
    pub workflow_name: String,
    /// DON the workflow runs on.
    pub workflow_don_id: u32,
    /// Config version of that DON.
    pub workflow_don_config_version: u32,
}

/// A request addressed to a capability.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CapabilityRequest {
    pub metadata: RequestMetadata,
    /// Step configuration, a map value.
    pub config: Value,
    /// Step inputs, a map value.
    pub inputs: Value,
    /// Empty or [`METHOD_EXECUTE`] for executions, [`METHOD_SEND_RESPONSE`]
    /// for finalization.
    pub method: String,
}

impl CapabilityRequest {
    /// True if this request finalizes an execution rather than starting one.
    pub fn is_send_response(&self) -> bool {
        self.method == METHOD_SEND_RESPONSE
    }
}

/// Registration of a workflow with a capability.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegistrationRequest {
    pub metadata: RequestMetadata,
    pub config: Value,
}

/// Response delivered back to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapabilityResponse {
    pub value: Option<Value>,
    pub error: Option<String>,
}

impl CapabilityResponse {
    pub fn success(value: Value) -> Self {
        Self {
            value: Some(value),
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            value: None,
            error: Some(error.into()),
        }
    }

    pub fn is_err(&self) -> bool {
        self.error.is_some()
    }

    /// Collapse into a `Result`.
    pub fn into_result(self) -> Result<Value, String> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.value.unwrap_or_default()),
        }
    }
}

/// Kind of capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CapabilityType {
    Trigger,
    Action,
    Consensus,
    Target,
}

impl fmt::Display for CapabilityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Trigger => write!(f, "trigger"),
            Self::Action => write!(f, "action"),
            Self::Consensus => write!(f, "consensus"),
            Self::Target => write!(f, "target"),
        }
    }
}

/// Descriptor a capability publishes to a registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityInfo {
    /// `name@version`
    pub id: String,
    pub capability_type: CapabilityType,
    pub description: String,
}

impl CapabilityInfo {
    pub fn new(
        id: impl Into<String>,
        capability_type: CapabilityType,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            capability_type,
            description: description.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_into_result() {
        let ok = CapabilityResponse::success(Value::from(7i64));
        assert!(!ok.is_err());
        assert_eq!(ok.into_result(), Ok(Value::Int64(7)));

        let err = CapabilityResponse::failure("timeout exceeded");
        assert!(err.is_err());
        assert_eq!(err.into_result(), Err("timeout exceeded".to_string()));
    }

    #[test]
    fn test_send_response_discriminator() {
        let mut req = CapabilityRequest::default();
        assert!(!req.is_send_response());
        req.method = METHOD_SEND_RESPONSE.to_string();
        assert!(req.is_send_response());
    }
}
