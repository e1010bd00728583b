//! Shutdown timeout hot reload.
//!
//! Only `timeout_ms` is reloadable. The watcher forwards a new timeout when
//! the file holds a valid config whose timeout differs from the last one
//! sent. Empty content (the truncation step of an in-place rewrite) is never
//! read as a config, so it cannot reset the timeout to its default.

use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;

use crate::config::loader::{parse_config, ConfigError};

/// Watches a config file and streams changed shutdown timeouts.
pub struct TimeoutWatcher {
    path: PathBuf,
    current: Duration,
    update_tx: mpsc::UnboundedSender<Duration>,
}

impl TimeoutWatcher {
    /// `current` is the timeout already in effect; reloads equal to it are dropped.
    pub fn new(path: &Path, current: Duration) -> (Self, mpsc::UnboundedReceiver<Duration>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();

        (
            Self {
                path: path.to_path_buf(),
                current,
                update_tx,
            },
            update_rx,
        )
    }

    /// Start watching. Keep the returned watcher alive to keep watching.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let Self {
            path,
            mut current,
            update_tx,
        } = self;
        let watched = path.clone();

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let event = match res {
                Ok(event) => event,
                Err(e) => {
                    tracing::error!(path = ?path, error = %e, "Config watch error");
                    return;
                }
            };
            if !(event.kind.is_modify() || event.kind.is_create()) {
                return;
            }

            let content = match fs::read_to_string(&path) {
                Ok(content) => content,
                Err(e) => {
                    tracing::warn!(path = ?path, error = %e, "Config file unreadable, keeping shutdown timeout");
                    return;
                }
            };

            match next_timeout(&content, current) {
                Ok(Some(timeout)) => {
                    tracing::info!(
                        path = ?path,
                        timeout_ms = timeout.as_millis() as u64,
                        "Shutdown timeout reloaded"
                    );
                    current = timeout;
                    let _ = update_tx.send(timeout);
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(path = ?path, error = %e, "Config reload rejected, keeping shutdown timeout");
                }
            }
        })?;

        watcher.watch(&watched, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?watched, "Shutdown timeout watcher started");
        Ok(watcher)
    }
}

/// Timeout to apply for `content`, or `None` when nothing should change.
///
/// Blank content is a write in progress and is skipped.
pub fn next_timeout(content: &str, current: Duration) -> Result<Option<Duration>, ConfigError> {
    if content.trim().is_empty() {
        return Ok(None);
    }

    let timeout = parse_config(content)?.timeout();
    Ok((timeout != current).then_some(timeout))
}
