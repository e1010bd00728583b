//! Shutdown coordination.
//!
//! # States
//! ```text
//! Registering/AwaitingSignal → ShuttingDown: first SIGINT/SIGTERM
//! ShuttingDown → Completed:    every callback returned      → Ok(())
//! ShuttingDown → TimedOut:     timeout elapsed              → Ok(())
//! ShuttingDown → ForceStopped: second SIGINT/SIGTERM        → Err(ForceStop)
//! ```

use arc_swap::ArcSwap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context, Poll};
use std::time::{Duration, Instant};
use tokio::sync::{oneshot, watch};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

use crate::config::ShutdownConfig;
use crate::dependency::{callback, DependencyNode, DependencyTree, ROOT_KEY};
use crate::error::{Result, ShutdownError};
use crate::lifecycle::context::ShutdownContext;
use crate::lifecycle::signals::Signals;

/// Shutdown timeout used when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Orchestrates dependency-ordered, deadline-bounded shutdown.
///
/// Cloning is cheap and every clone drives the same tree, so components can
/// keep registering from other tasks until the first termination signal.
#[derive(Clone)]
pub struct GracefulShutdown {
    inner: Arc<Inner>,
}

struct Inner {
    tree: DependencyTree,
    timeout: ArcSwap<Duration>,
    signals: Mutex<Option<Signals>>,
    waiting: AtomicBool,
    /// Cancelled on the first termination signal.
    signalled: CancellationToken,
    /// Cancelled on force stop; parent of every callback context.
    abort: CancellationToken,
    done: watch::Sender<bool>,
}

impl GracefulShutdown {
    /// Create an orchestrator with the default 5 second timeout.
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        let (done, _) = watch::channel(false);
        Self {
            inner: Arc::new(Inner {
                tree: DependencyTree::new(),
                timeout: ArcSwap::from_pointee(timeout),
                signals: Mutex::new(None),
                waiting: AtomicBool::new(false),
                signalled: CancellationToken::new(),
                abort: CancellationToken::new(),
                done,
            }),
        }
    }

    pub fn from_config(config: &ShutdownConfig) -> Self {
        Self::with_timeout(config.timeout())
    }

    /// Use `signals` instead of subscribing to OS signals in [`wait`](Self::wait).
    #[must_use]
    pub fn with_signals(self, signals: Signals) -> Self {
        *self
            .inner
            .signals
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(signals);
        self
    }

    /// Register a callback with no dependency.
    pub fn register<F, Fut>(&self, name: impl Into<String>, f: F) -> Result<()>
    where
        F: Fn(ShutdownContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let name = name.into();
        reject_reserved(&name)?;

        self.inner
            .tree
            .insert_root_level(DependencyNode::new(name, callback(f)))
    }

    /// Register a callback that only runs after `depends_on` has finished.
    pub fn register_dependent<F, Fut>(
        &self,
        depends_on: &str,
        name: impl Into<String>,
        f: F,
    ) -> Result<()>
    where
        F: Fn(ShutdownContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let name = name.into();
        reject_reserved(depends_on)?;
        reject_reserved(&name)?;

        self.inner
            .tree
            .insert(depends_on, DependencyNode::new(name, callback(f)))
    }

    /// Like [`register`](Self::register), but a registration error is a bug.
    ///
    /// # Panics
    /// On any registration error.
    #[track_caller]
    pub fn must_register<F, Fut>(&self, name: impl Into<String>, f: F)
    where
        F: Fn(ShutdownContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        if let Err(e) = self.register(name, f) {
            panic!("failed to register shutdown callback: {e}");
        }
    }

    /// Like [`register_dependent`](Self::register_dependent), but a
    /// registration error is a bug.
    ///
    /// # Panics
    /// On any registration error.
    #[track_caller]
    pub fn must_register_dependent<F, Fut>(&self, depends_on: &str, name: impl Into<String>, f: F)
    where
        F: Fn(ShutdownContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        if let Err(e) = self.register_dependent(depends_on, name, f) {
            panic!("failed to register shutdown callback: {e}");
        }
    }

    /// Timeout applied to the next shutdown run.
    pub fn timeout(&self) -> Duration {
        **self.inner.timeout.load()
    }

    /// Replace the timeout; read when the shutdown starts.
    pub fn set_timeout(&self, timeout: Duration) {
        tracing::debug!(timeout_ms = timeout.as_millis() as u64, "Shutdown timeout updated");
        self.inner.timeout.store(Arc::new(timeout));
    }

    /// The registered callbacks.
    pub fn tree(&self) -> &DependencyTree {
        &self.inner.tree
    }

    /// Token cancelled as soon as the first termination signal arrives.
    pub fn signalled(&self) -> CancellationToken {
        self.inner.signalled.clone()
    }

    /// Flips to `true` each time a shutdown run finishes.
    pub fn completed(&self) -> watch::Receiver<bool> {
        self.inner.done.subscribe()
    }

    /// Run every callback now, bounded by the current timeout.
    ///
    /// Returns once the tree finished or the deadline passed; callbacks still
    /// running at the deadline keep running in the background. Each call runs
    /// every callback again.
    pub async fn force_shutdown(&self) {
        let timeout = self.timeout();
        let timeout_ms = timeout.as_millis() as u64;
        let ctx = ShutdownContext::child_of(&self.inner.abort, timeout);
        let started = Instant::now();

        tracing::info!(
            timeout_ms,
            callbacks = self.inner.tree.len(),
            "Running shutdown callbacks"
        );

        match tokio::time::timeout(timeout, self.inner.tree.shutdown(ctx)).await {
            Ok(()) => tracing::info!(
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Shutdown callbacks finished"
            ),
            Err(_) => tracing::warn!(
                timeout_ms,
                "Shutdown deadline elapsed before all callbacks finished"
            ),
        }

        self.inner.done.send_replace(true);
    }

    /// Subscribe to OS termination signals now rather than in [`wait`](Self::wait).
    ///
    /// Until some subscription exists, SIGINT/SIGTERM keep their default
    /// action and end the process immediately. Signals received after this
    /// call are queued for `wait`. No-op when a source is already set.
    pub fn listen(&self) -> Result<()> {
        let mut slot = self
            .inner
            .signals
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if slot.is_none() && !self.inner.waiting.load(Ordering::SeqCst) {
            *slot = Some(Signals::os()?);
            tracing::debug!("Subscribed to termination signals");
        }
        Ok(())
    }

    /// Wait for a termination signal, then shut down.
    ///
    /// Must be called within a Tokio runtime. Without an injected or
    /// [`listen`](Self::listen)ed source, OS signals are subscribed before
    /// this returns. The returned handle resolves with `Ok(())` when the
    /// callbacks finish or the timeout elapses, and with
    /// [`ShutdownError::ForceStop`] when a second signal arrives first.
    ///
    /// A second signal that lands before the traversal has entered any node
    /// cancels the context first, so no callback runs at all.
    pub fn wait(&self) -> ShutdownHandle {
        let (tx, rx) = oneshot::channel();

        match self.begin_waiting(Signals::os) {
            Ok(signals) => {
                let this = self.clone();
                tokio::spawn(async move {
                    let _ = tx.send(this.drive(signals).await);
                });
            }
            Err(e) => {
                let _ = tx.send(Err(e));
            }
        }

        ShutdownHandle { rx }
    }

    /// Claim the waiting slot and a signal source.
    ///
    /// The slot is released again when no source can be obtained.
    fn begin_waiting<S>(&self, subscribe: S) -> Result<Signals>
    where
        S: FnOnce() -> std::io::Result<Signals>,
    {
        if self.inner.waiting.swap(true, Ordering::SeqCst) {
            return Err(ShutdownError::AlreadyWaiting);
        }

        let injected = self
            .inner
            .signals
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        match injected {
            Some(signals) => Ok(signals),
            None => subscribe().map_err(|e| {
                self.inner.waiting.store(false, Ordering::SeqCst);
                tracing::error!(error = %e, "Failed to subscribe to termination signals");
                ShutdownError::from(e)
            }),
        }
    }

    async fn drive(self, mut signals: Signals) -> Result<()> {
        let Some(first) = signals.recv().await else {
            self.inner.waiting.store(false, Ordering::SeqCst);
            return Err(ShutdownError::SignalsClosed);
        };

        let span = tracing::info_span!("shutdown", shutdown_id = %Uuid::new_v4());
        async move {
            let timeout = self.timeout();
            tracing::info!(signal = %first, timeout_ms = timeout.as_millis() as u64, "Graceful shutdown started");

            self.inner.signalled.cancel();

            let mut done = self.inner.done.subscribe();
            let runner = self.clone();
            tokio::spawn(async move { runner.force_shutdown().await }.in_current_span());

            tokio::select! {
                _ = done.changed() => {
                    tracing::info!("Graceful shutdown completed");
                    Ok(())
                }
                () = tokio::time::sleep(timeout) => {
                    tracing::warn!(
                        timeout_ms = timeout.as_millis() as u64,
                        "Shutdown timeout elapsed, proceeding"
                    );
                    Ok(())
                }
                Some(second) = signals.recv() => {
                    self.inner.abort.cancel();
                    tracing::error!(signal = %second, "Shutdown force stopped");
                    Err(ShutdownError::ForceStop)
                }
            }
        }
        .instrument(span)
        .await
    }
}

impl Default for GracefulShutdown {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for GracefulShutdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GracefulShutdown")
            .field("timeout", &self.timeout())
            .field("callbacks", &self.inner.tree.len())
            .field("waiting", &self.inner.waiting.load(Ordering::Relaxed))
            .finish()
    }
}

fn reject_reserved(key: &str) -> Result<()> {
    if key == ROOT_KEY {
        return Err(ShutdownError::ReservedKey(key.to_string()));
    }
    Ok(())
}

/// Single-shot result of [`GracefulShutdown::wait`].
#[derive(Debug)]
pub struct ShutdownHandle {
    rx: oneshot::Receiver<Result<()>>,
}

impl Future for ShutdownHandle {
    type Output = Result<()>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(ShutdownError::Interrupted)))
    }
}
