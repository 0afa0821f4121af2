//! # Service Lifecycle
//!
//! Contract for long-lived components that own background tasks. A service
//! is started once, may be health-checked while running, and is closed once;
//! `close` returns only after every task it spawned has finished.
//!
//! ```rust,ignore
//! use shared_types::{Service, ServiceError, ServiceStatus};
//! use async_trait::async_trait;
//!
//! pub struct MyService { /* ... */ }
//!
//! #[async_trait]
//! impl Service for MyService {
//!     fn name(&self) -> &'static str { "my-service" }
//!     async fn start(&self) -> Result<(), ServiceError> { Ok(()) }
//!     async fn close(&self) -> Result<(), ServiceError> { Ok(()) }
//!     async fn health_check(&self) -> ServiceStatus { ServiceStatus::Healthy }
//! }
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Error type for lifecycle operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceError {
    /// The service that encountered the error.
    pub service: String,
    /// Error kind.
    pub kind: ServiceErrorKind,
    /// Human-readable error message.
    pub message: String,
}

impl ServiceError {
    pub fn new(service: impl Into<String>, kind: ServiceErrorKind, message: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.service, self.kind, self.message)
    }
}

impl std::error::Error for ServiceError {}

/// Categories of lifecycle errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServiceErrorKind {
    /// `start` called on a running service.
    AlreadyStarted,
    /// Operation requires a running service.
    NotStarted,
    /// A background task did not shut down cleanly.
    ShutdownFailed,
}

impl fmt::Display for ServiceErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyStarted => write!(f, "AlreadyStarted"),
            Self::NotStarted => write!(f, "NotStarted"),
            Self::ShutdownFailed => write!(f, "ShutdownFailed"),
        }
    }
}

/// Health status of a service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServiceStatus {
    /// Created but not started.
    Idle,
    /// Running normally.
    Healthy,
    /// Closed.
    Stopped,
}

/// Lifecycle of a component with background tasks.
#[async_trait]
pub trait Service: Send + Sync {
    /// Human-readable name, used in errors and logs.
    fn name(&self) -> &'static str;

    /// Start background tasks. Fails if already started.
    async fn start(&self) -> Result<(), ServiceError>;

    /// Stop background tasks and wait for them to finish.
    async fn close(&self) -> Result<(), ServiceError>;

    /// Current status.
    async fn health_check(&self) -> ServiceStatus;
}
