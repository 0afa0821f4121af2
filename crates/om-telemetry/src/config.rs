//! Telemetry configuration from environment variables.

use std::env;

/// Configuration for structured logging.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Service name attached to every log line
    pub service_name: String,

    /// Log level filter (trace, debug, info, warn, error) or a full
    /// `EnvFilter` directive
    pub log_level: String,

    /// Whether to emit JSON formatted logs
    pub json_logs: bool,

    /// Whether to colorize pretty output
    pub ansi: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "oracle-mesh".to_string(),
            log_level: "info".to_string(),
            json_logs: false,
            ansi: true,
        }
    }
}

impl TelemetryConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `OM_SERVICE_NAME`: Service name (default: oracle-mesh)
    /// - `OM_LOG_LEVEL` or `RUST_LOG`: Log level (default: info)
    /// - `OM_LOG_JSON`: Enable JSON logs (default: false in dev, true in containers)
    /// - `OM_LOG_ANSI`: Colorize pretty output (default: true)
    pub fn from_env() -> Self {
        let is_container =
            env::var("KUBERNETES_SERVICE_HOST").is_ok() || env::var("DOCKER_CONTAINER").is_ok();

        Self {
            service_name: env::var("OM_SERVICE_NAME")
                .unwrap_or_else(|_| "oracle-mesh".to_string()),

            log_level: env::var("OM_LOG_LEVEL")
                .or_else(|_| env::var("RUST_LOG"))
                .unwrap_or_else(|_| "info".to_string()),

            json_logs: env::var("OM_LOG_JSON")
                .map(|v| v.to_lowercase() == "true" || v == "1")
                .unwrap_or(is_container),

            ansi: env::var("OM_LOG_ANSI")
                .map(|v| v.to_lowercase() != "false" && v != "0")
                .unwrap_or(true),
        }
    }

    /// Configuration for tests: debug level, plain output.
    pub fn for_tests() -> Self {
        Self {
            service_name: "oracle-mesh-test".to_string(),
            log_level: "debug".to_string(),
            json_logs: false,
            ansi: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TelemetryConfig::default();
        assert_eq!(config.service_name, "oracle-mesh");
        assert_eq!(config.log_level, "info");
        assert!(!config.json_logs);
    }

    #[test]
    fn test_for_tests() {
        let config = TelemetryConfig::for_tests();
        assert_eq!(config.log_level, "debug");
        assert!(!config.ansi);
    }
}
