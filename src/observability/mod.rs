//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Registration and shutdown produce:
//!     → tracing events (key, parent, elapsed_ms, signal)
//!     → one `shutdown` span per run, tagged with a shutdown_id
//!
//! logging.rs installs the subscriber (stdout, pretty or JSON).
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing
//! - Shutdown ID flows through every event of a run

pub mod logging;

pub use logging::init_logging;
