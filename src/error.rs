//! Error definitions for registration and shutdown.

use thiserror::Error;

/// Errors surfaced by the dependency tree and the shutdown orchestrator.
#[derive(Debug, Error)]
pub enum ShutdownError {
    /// A dependent was registered under a key that is not in the tree.
    #[error("no dependency root for key {0}")]
    NoDependencyRoot(String),

    /// Attaching the node would make it depend on one of its own dependents.
    #[error("cyclic dependencies are not allowed: {parent} <-> {key}")]
    CyclicDependency { parent: String, key: String },

    /// The key is already registered somewhere in the tree.
    #[error("shutdown callback {0} is already registered")]
    DuplicateKey(String),

    /// The key collides with the tree's synthetic root.
    #[error("key {0} is reserved")]
    ReservedKey(String),

    /// A second termination signal arrived while shutting down.
    #[error("shutdown force stopped")]
    ForceStop,

    /// `wait` was already called on this instance.
    #[error("shutdown is already being awaited")]
    AlreadyWaiting,

    /// The signal source closed before delivering a termination signal.
    #[error("signal source closed before a termination signal arrived")]
    SignalsClosed,

    /// The task driving `wait` stopped before reporting a result.
    #[error("shutdown driver stopped before reporting a result")]
    Interrupted,

    /// Subscribing to OS signals failed.
    #[error("signal handler error: {0}")]
    Signal(#[from] std::io::Error),
}

/// Result type for shutdown operations.
pub type Result<T> = std::result::Result<T, ShutdownError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ShutdownError::CyclicDependency {
            parent: "cache".into(),
            key: "db".into(),
        };
        assert_eq!(
            err.to_string(),
            "cyclic dependencies are not allowed: cache <-> db"
        );

        let err = ShutdownError::NoDependencyRoot("db".into());
        assert_eq!(err.to_string(), "no dependency root for key db");

        assert_eq!(ShutdownError::ForceStop.to_string(), "shutdown force stopped");
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::Unsupported, "no signals");
        let err: ShutdownError = io.into();
        assert!(matches!(err, ShutdownError::Signal(_)));
        assert!(err.to_string().contains("no signals"));
    }
}
