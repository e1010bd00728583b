//! Shared utilities for shutdown integration tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use shutdown_tree::lifecycle::SignalSender;
use shutdown_tree::{GracefulShutdown, Signals};

/// A shareable boolean set by shutdown callbacks.
#[derive(Clone, Default)]
pub struct Flag(Arc<AtomicBool>);

impl Flag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// An orchestrator driven by a programmatic signal source.
pub fn signalled_shutdown(timeout: Duration) -> (SignalSender, GracefulShutdown) {
    let (tx, signals) = Signals::channel();
    let shutdown = GracefulShutdown::with_timeout(timeout).with_signals(signals);
    (tx, shutdown)
}
