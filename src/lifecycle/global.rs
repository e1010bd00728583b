//! Process-wide shutdown instance.
//!
//! Convenience for programs that want one orchestrator without threading a
//! handle through every component. Created lazily on first use and never
//! torn down.

use std::future::Future;
use std::sync::OnceLock;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::lifecycle::context::ShutdownContext;
use crate::lifecycle::shutdown::{GracefulShutdown, ShutdownHandle};

static GLOBAL: OnceLock<GracefulShutdown> = OnceLock::new();

/// The shared instance.
pub fn instance() -> &'static GracefulShutdown {
    GLOBAL.get_or_init(GracefulShutdown::new)
}

/// See [`GracefulShutdown::register`].
pub fn register<F, Fut>(name: impl Into<String>, f: F) -> Result<()>
where
    F: Fn(ShutdownContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    instance().register(name, f)
}

/// See [`GracefulShutdown::register_dependent`].
pub fn register_dependent<F, Fut>(depends_on: &str, name: impl Into<String>, f: F) -> Result<()>
where
    F: Fn(ShutdownContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    instance().register_dependent(depends_on, name, f)
}

/// See [`GracefulShutdown::must_register`].
#[track_caller]
pub fn must_register<F, Fut>(name: impl Into<String>, f: F)
where
    F: Fn(ShutdownContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    instance().must_register(name, f);
}

/// See [`GracefulShutdown::must_register_dependent`].
#[track_caller]
pub fn must_register_dependent<F, Fut>(depends_on: &str, name: impl Into<String>, f: F)
where
    F: Fn(ShutdownContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    instance().must_register_dependent(depends_on, name, f);
}

pub fn set_timeout(timeout: Duration) {
    instance().set_timeout(timeout);
}

pub fn timeout() -> Duration {
    instance().timeout()
}

/// See [`GracefulShutdown::signalled`].
pub fn signalled() -> CancellationToken {
    instance().signalled()
}

/// See [`GracefulShutdown::wait`]. Subscribes to OS signals.
pub fn wait() -> ShutdownHandle {
    instance().wait()
}
