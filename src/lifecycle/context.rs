//! Deadline context handed to every shutdown callback.

use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Roughly 30 years; used when `now + timeout` would overflow.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// A cancellable, time-bounded handle shared by one shutdown run.
///
/// The traversal consults [`ShutdownContext::is_expired`] before entering a
/// node; callbacks can await [`ShutdownContext::cancelled`] or bound their own
/// work with [`ShutdownContext::deadline`].
#[derive(Debug, Clone)]
pub struct ShutdownContext {
    deadline: Instant,
    token: CancellationToken,
}

impl ShutdownContext {
    /// Create a context that expires `timeout` from now.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(deadline_after(timeout))
    }

    /// Create a context that expires at `deadline`.
    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            deadline,
            token: CancellationToken::new(),
        }
    }

    /// Create a context that also expires when `parent` is cancelled.
    pub fn child_of(parent: &CancellationToken, timeout: Duration) -> Self {
        Self {
            deadline: deadline_after(timeout),
            token: parent.child_token(),
        }
    }

    /// Instant at which the context expires.
    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Time left before the deadline, zero once it has passed.
    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    /// True once the deadline has passed or the context was cancelled.
    pub fn is_expired(&self) -> bool {
        self.token.is_cancelled() || Instant::now() >= self.deadline
    }

    /// True if the context was cancelled explicitly (force stop).
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves when the deadline passes or the context is cancelled.
    pub async fn cancelled(&self) {
        tokio::select! {
            _ = self.token.cancelled() => {}
            _ = tokio::time::sleep_until(self.deadline) => {}
        }
    }

    /// Cancel this context and every context derived from the same token.
    pub fn cancel(&self) {
        self.token.cancel();
    }
}

fn deadline_after(timeout: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(timeout).unwrap_or(now + FAR_FUTURE)
}
