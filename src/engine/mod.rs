//! Live graph synchronization engine.
//!
//! Derives a node/edge graph from a workspace's documents, keeps it patched
//! as real-time updates arrive and tracks short-lived presence sessions on
//! top of it. Nothing in here touches the browser; the async driver and the
//! canvas renderer sit on either side.

mod document;
pub mod graph;
pub mod identity;
pub mod metrics;
pub mod presence;
pub mod scan;
pub mod sync;
mod users;

pub use document::{Document, DocumentTarget};
pub use graph::{Edge, Graph, Node, NodeKind};
pub use metrics::DocumentMetrics;
pub use presence::{DEFAULT_IDLE_TIMEOUT_MS, PresenceTracker, Session, SessionId};
pub use sync::{Activity, EventOutcome, GraphSnapshot, Phase, SyncController};
pub use users::{CachedUser, UserCache, UserProfile, string_seed};
