//! Validated dependency tree rooted at a synthetic node.

use std::sync::{Arc, Mutex, PoisonError};

use crate::dependency::node::DependencyNode;
use crate::error::{Result, ShutdownError};
use crate::lifecycle::ShutdownContext;

/// Reserved key of the synthetic root; top-level registrations attach here.
pub const ROOT_KEY: &str = "shutdown_dependencies_root";

/// Tree of shutdown callbacks.
///
/// A child's callback only runs after its parent's callback returned.
#[derive(Debug)]
pub struct DependencyTree {
    root: Arc<DependencyNode>,
    /// Serializes inserts so validation and placement are atomic.
    registration: Mutex<()>,
}

impl DependencyTree {
    pub fn new() -> Self {
        Self {
            root: DependencyNode::root(ROOT_KEY),
            registration: Mutex::new(()),
        }
    }

    /// Insert `node` under the node keyed `parent_key`.
    ///
    /// Rejects, in order: a reverse edge that would close a cycle, an unknown
    /// parent, and a key that is already registered. A rejected insert leaves
    /// the tree untouched.
    pub fn insert(&self, parent_key: &str, node: Arc<DependencyNode>) -> Result<()> {
        let _guard = self
            .registration
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let existing = self.root.find(node.key());

        if let Some(existing) = &existing {
            if existing.find(parent_key).is_some() {
                return Err(ShutdownError::CyclicDependency {
                    parent: parent_key.to_string(),
                    key: node.key().to_string(),
                });
            }
        }

        if self.root.find(parent_key).is_none() {
            return Err(ShutdownError::NoDependencyRoot(parent_key.to_string()));
        }

        if existing.is_some() {
            return Err(ShutdownError::DuplicateKey(node.key().to_string()));
        }

        let key = node.key().to_string();
        if self.root.insert(parent_key, node) {
            tracing::debug!(key = %key, parent = %parent_key, "Shutdown callback registered");
        }

        Ok(())
    }

    /// Insert `node` with no dependency.
    pub fn insert_root_level(&self, node: Arc<DependencyNode>) -> Result<()> {
        self.insert(ROOT_KEY, node)
    }

    /// True if `key` is registered (the root key never counts).
    pub fn contains(&self, key: &str) -> bool {
        key != ROOT_KEY && self.root.find(key).is_some()
    }

    /// Number of registered callbacks.
    pub fn len(&self) -> usize {
        self.root.subtree_len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.root.children().is_empty()
    }

    /// Top-level nodes, in registration order.
    pub fn roots(&self) -> Vec<Arc<DependencyNode>> {
        self.root.children()
    }

    /// Run every callback in dependency order, bounded by `ctx`.
    pub async fn shutdown(&self, ctx: ShutdownContext) {
        Arc::clone(&self.root).shutdown(ctx).await;
    }
}

impl Default for DependencyTree {
    fn default() -> Self {
        Self::new()
    }
}
