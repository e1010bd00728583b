//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ShutdownConfig (validated)
//!     → GracefulShutdown::from_config
//!
//! On file change:
//!     watcher.rs (TimeoutWatcher) skips blank writes
//!     → loader.rs parses and validates the new content
//!     → changed timeout sent as a Duration
//!     → applied via GracefulShutdown::set_timeout
//! ```
//!
//! # Design Decisions
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - Only the timeout is reloadable; it is read when shutdown starts

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, ConfigError};
pub use schema::{DemoConfig, LogFormat, LoggingConfig, ShutdownConfig};
pub use watcher::TimeoutWatcher;
