//! OS signal handling.
//!
//! # Responsibilities
//! - Subscribe to SIGINT and SIGTERM
//! - Forward every occurrence, so a second signal is observable
//! - Offer a programmatic source for tests and embedding
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - First SIGTERM/SIGINT starts the graceful shutdown
//! - Any further SIGTERM/SIGINT forces the shutdown to stop

use std::fmt;
use tokio::sync::mpsc;

/// Termination signals the orchestrator reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationSignal {
    /// SIGINT (Ctrl+C).
    Interrupt,
    /// SIGTERM.
    Terminate,
}

impl fmt::Display for TerminationSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TerminationSignal::Interrupt => write!(f, "SIGINT"),
            TerminationSignal::Terminate => write!(f, "SIGTERM"),
        }
    }
}

/// A stream of termination signals.
#[derive(Debug)]
pub struct Signals {
    rx: mpsc::UnboundedReceiver<TerminationSignal>,
}

/// Sending half of a programmatic [`Signals`] source.
#[derive(Debug, Clone)]
pub struct SignalSender {
    tx: mpsc::UnboundedSender<TerminationSignal>,
}

impl SignalSender {
    /// Deliver a signal. Returns `false` once the receiving side is gone.
    pub fn send(&self, signal: TerminationSignal) -> bool {
        self.tx.send(signal).is_ok()
    }
}

impl Signals {
    /// A source fed only through the returned [`SignalSender`].
    pub fn channel() -> (SignalSender, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (SignalSender { tx }, Self { rx })
    }

    /// Subscribe to the platform's termination signals.
    ///
    /// Must be called from within a Tokio runtime.
    #[cfg(unix)]
    pub fn os() -> std::io::Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigint = signal(SignalKind::interrupt())?;
        let mut sigterm = signal(SignalKind::terminate())?;
        let (tx, rx) = Self::channel();

        tokio::spawn(async move {
            loop {
                let received = tokio::select! {
                    Some(()) = sigint.recv() => TerminationSignal::Interrupt,
                    Some(()) = sigterm.recv() => TerminationSignal::Terminate,
                    else => break,
                };

                tracing::info!(signal = %received, "Termination signal received");
                if !tx.send(received) {
                    break;
                }
            }
        });

        Ok(rx)
    }

    /// Subscribe to Ctrl+C, the only termination signal off Unix.
    #[cfg(not(unix))]
    pub fn os() -> std::io::Result<Self> {
        let (tx, rx) = Self::channel();

        tokio::spawn(async move {
            while tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!(signal = %TerminationSignal::Interrupt, "Termination signal received");
                if !tx.send(TerminationSignal::Interrupt) {
                    break;
                }
            }
        });

        Ok(rx)
    }

    /// Wait for the next signal; `None` once every sender is gone.
    pub async fn recv(&mut self) -> Option<TerminationSignal> {
        self.rx.recv().await
    }
}
