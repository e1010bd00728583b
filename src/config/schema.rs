//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from TOML files and fall
//! back to defaults for every missing field.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ShutdownConfig {
    /// Upper bound for the whole shutdown, in milliseconds.
    pub timeout_ms: u64,

    /// Logging settings.
    pub logging: LoggingConfig,

    /// Settings for the bundled demo server.
    pub demo: DemoConfig,
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 5_000,
            logging: LoggingConfig::default(),
            demo: DemoConfig::default(),
        }
    }
}

impl ShutdownConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset (e.g. "info").
    pub level: String,

    /// Output format.
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable, for development.
    #[default]
    Pretty,
    /// One JSON object per line, for log aggregation.
    Json,
}

/// Demo server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DemoConfig {
    /// Bind address (e.g., "127.0.0.1:8888").
    pub bind_address: String,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8888".to_string(),
        }
    }
}
