//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Registration (shutdown.rs):
//!     register / register_dependent → dependency tree
//!
//! Signals (signals.rs):
//!     first SIGTERM/SIGINT  → start graceful shutdown
//!     second SIGTERM/SIGINT → force stop
//!
//! Shutdown (shutdown.rs):
//!     ShutdownContext (context.rs) with deadline
//!     → tree traversal
//!     → race: completion | timeout | second signal
//!     → single-shot result to the caller
//! ```
//!
//! # Design Decisions
//! - Shutdown has timeout: waiting stops at the deadline, work is not killed
//! - Timeout is not an error; only a force stop is
//! - global.rs offers one shared instance for whole-program use

pub mod context;
pub mod global;
pub mod shutdown;
pub mod signals;

pub use context::ShutdownContext;
pub use shutdown::{GracefulShutdown, ShutdownHandle, DEFAULT_TIMEOUT};
pub use signals::{SignalSender, Signals, TerminationSignal};
