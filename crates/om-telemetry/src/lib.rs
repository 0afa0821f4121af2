//! # Oracle-Mesh Telemetry
//!
//! Structured logging for the consensus capability.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use om_telemetry::{init_logging, TelemetryConfig};
//!
//! let config = TelemetryConfig::from_env();
//! init_logging(&config).expect("Failed to init logging");
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `OM_SERVICE_NAME` | `oracle-mesh` | Service name in log lines |
//! | `OM_LOG_LEVEL` | `info` | Log level filter |
//! | `OM_LOG_JSON` | `false` | JSON output |
//! | `OM_LOG_ANSI` | `true` | Colorized pretty output |

mod config;
mod logging;

pub use config::TelemetryConfig;
pub use logging::{init_logging, init_test_logging};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Invalid log filter: {0}")]
    Filter(String),

    #[error("Global subscriber already initialized: {0}")]
    AlreadyInitialized(String),
}
