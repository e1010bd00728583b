//! Shutdown dependency tree.
//!
//! # Data Flow
//! ```text
//! Registration:
//!     register("db")              → root ── db
//!     register_dependent("db", …) → root ── db ── http
//!     tree.rs validates (cycle, parent exists, unique key)
//!     → node.rs attaches under the parent
//!
//! Shutdown:
//!     root (no callback)
//!     → spawn one task per top-level node
//!     → each node: run callback, then spawn its children, join them
//! ```
//!
//! # Design Decisions
//! - Strict parent → child ownership; no back-edges, no graph
//! - A node's callback finishes before any of its children start
//! - Siblings run concurrently on the tokio runtime
//! - Deadline checked once per node on entry; running callbacks are never killed

pub mod node;
pub mod tree;

pub use node::{callback, Callback, DependencyNode};
pub use tree::{DependencyTree, ROOT_KEY};
