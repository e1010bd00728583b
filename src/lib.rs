//! Dependency-ordered graceful shutdown for Tokio services.

pub mod config;
pub mod dependency;
pub mod error;
pub mod lifecycle;
pub mod observability;

pub use config::ShutdownConfig;
pub use dependency::{DependencyNode, DependencyTree};
pub use error::{Result, ShutdownError};
pub use lifecycle::{GracefulShutdown, ShutdownContext, ShutdownHandle, Signals, TerminationSignal};
