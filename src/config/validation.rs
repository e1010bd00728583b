//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeout > 0, address parses)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ShutdownConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;
use thiserror::Error;

use crate::config::schema::ShutdownConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error", "off"];

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: &'static str,
    pub message: String,
}

/// Check a parsed configuration, collecting every problem found.
pub fn validate_config(config: &ShutdownConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.timeout_ms == 0 {
        errors.push(ValidationError {
            field: "timeout_ms",
            message: "must be greater than zero".to_string(),
        });
    }

    let level = config.logging.level.to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ValidationError {
            field: "logging.level",
            message: format!("unknown level {:?}", config.logging.level),
        });
    }

    if config.demo.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError {
            field: "demo.bind_address",
            message: format!("invalid socket address {:?}", config.demo.bind_address),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(validate_config(&ShutdownConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = ShutdownConfig::default();
        config.timeout_ms = 0;
        config.logging.level = "loud".into();
        config.demo.bind_address = "not-an-address".into();

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert_eq!(fields, vec!["timeout_ms", "logging.level", "demo.bind_address"]);
        assert_eq!(errors[0].to_string(), "timeout_ms: must be greater than zero");
    }
}
