//! A single node of the shutdown dependency tree.
//!
//! # Responsibilities
//! - Hold one component's shutdown callback
//! - Own the nodes that depend on it
//! - Run its callback, then fan out to its children concurrently

use futures_util::future::{join_all, BoxFuture, FutureExt};
use std::fmt;
use std::future::Future;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Instant;

use crate::lifecycle::ShutdownContext;

/// A type-erased shutdown callback.
pub type Callback = Box<dyn Fn(ShutdownContext) -> BoxFuture<'static, ()> + Send + Sync>;

/// Box an async closure into a [`Callback`].
pub fn callback<F, Fut>(f: F) -> Callback
where
    F: Fn(ShutdownContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    Box::new(move |ctx| f(ctx).boxed())
}

/// A named node holding an optional callback and its dependents.
pub struct DependencyNode {
    key: String,
    callback: Option<Callback>,
    children: RwLock<Vec<Arc<DependencyNode>>>,
}

impl DependencyNode {
    /// Create a node for a registered component.
    pub fn new(key: impl Into<String>, callback: Callback) -> Arc<Self> {
        Arc::new(Self {
            key: key.into(),
            callback: Some(callback),
            children: RwLock::new(Vec::new()),
        })
    }

    /// Create a callback-less node (the tree's synthetic root).
    pub(crate) fn root(key: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            key: key.into(),
            callback: None,
            children: RwLock::new(Vec::new()),
        })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn has_callback(&self) -> bool {
        self.callback.is_some()
    }

    /// Snapshot of the current children, in insertion order.
    pub fn children(&self) -> Vec<Arc<DependencyNode>> {
        self.read_children().clone()
    }

    /// Number of nodes in this subtree, including this one.
    pub fn subtree_len(&self) -> usize {
        1 + self
            .read_children()
            .iter()
            .map(|child| child.subtree_len())
            .sum::<usize>()
    }

    /// Depth-first search for `key`; the first match in insertion order wins.
    pub fn find(self: &Arc<Self>, key: &str) -> Option<Arc<DependencyNode>> {
        if self.key == key {
            return Some(Arc::clone(self));
        }

        self.read_children().iter().find_map(|child| child.find(key))
    }

    /// Attach `node` under the first node in this subtree keyed `parent_key`.
    ///
    /// Returns `false` without touching anything when no such node exists;
    /// callers validate the parent beforehand.
    pub fn insert(&self, parent_key: &str, node: Arc<DependencyNode>) -> bool {
        if self.key == parent_key {
            self.write_children().push(node);
            return true;
        }

        self.read_children()
            .iter()
            .any(|child| child.insert(parent_key, Arc::clone(&node)))
    }

    /// Run this node's callback, then shut down every child concurrently.
    ///
    /// The callback completes before any child starts. If the context has
    /// already expired on entry, the whole subtree is skipped; a callback that
    /// is already running is never interrupted.
    pub fn shutdown(self: Arc<Self>, ctx: ShutdownContext) -> BoxFuture<'static, ()> {
        async move {
            if ctx.is_expired() {
                tracing::debug!(key = %self.key, "Shutdown deadline reached, skipping subtree");
                return;
            }

            if let Some(callback) = &self.callback {
                let started = Instant::now();
                tracing::debug!(key = %self.key, "Running shutdown callback");

                callback(ctx.clone()).await;

                tracing::debug!(
                    key = %self.key,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Shutdown callback finished"
                );
            }

            let (keys, tasks): (Vec<_>, Vec<_>) = self
                .children()
                .into_iter()
                .map(|child| {
                    let key = child.key.clone();
                    (key, tokio::spawn(child.shutdown(ctx.clone())))
                })
                .unzip();

            for (key, result) in keys.iter().zip(join_all(tasks).await) {
                if let Err(e) = result {
                    if e.is_panic() {
                        tracing::error!(key = %key, "Shutdown callback panicked");
                    } else {
                        tracing::warn!(key = %key, error = %e, "Shutdown task cancelled");
                    }
                }
            }
        }
        .boxed()
    }

    fn read_children(&self) -> RwLockReadGuard<'_, Vec<Arc<DependencyNode>>> {
        self.children.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_children(&self) -> RwLockWriteGuard<'_, Vec<Arc<DependencyNode>>> {
        self.children.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for DependencyNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DependencyNode")
            .field("key", &self.key)
            .field("has_callback", &self.callback.is_some())
            .field("children", &*self.read_children())
            .finish()
    }
}
