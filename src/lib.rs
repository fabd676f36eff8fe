//! # Mediasync - Content/media relation synchronization
//!
//! Keeps a content tree and a media tree consistent with each other and tracks
//! which media items each content node references.
//!
//! Mediasync provides:
//! - A structural mirror: one media folder per content node, kept in step on
//!   create, rename, move, copy, trash and delete
//! - A usage graph: content node → media items referenced by its fields,
//!   reconciled by set-diff on every save
//! - A generic typed relation store backed by SQLite
//! - Pluggable field extractors for finding media references in field values

pub mod node;
pub mod relation;
pub mod storage;
pub mod tree;
pub mod event;
pub mod extractor;
pub mod sync;
pub mod engine;
pub mod host;
pub mod report;
pub mod scenario;
pub mod config;
pub mod ui;

// Re-exports for convenient access
pub use node::{Field, Node, NodeDraft, NodeId};
pub use relation::{Relation, RelationKind, RelationType};
pub use storage::{RelationStore, SqliteStore};
pub use tree::{MemoryTree, TreeKind, TreeStore};
pub use event::{Notification, Observer};
pub use engine::SyncEngine;
pub use host::ContentHost;

/// Result type alias for Mediasync operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for Mediasync operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{tree} node not found: {id}")]
    NodeNotFound { tree: TreeKind, id: NodeId },

    #[error("Relation type not defined: {0}")]
    UnknownRelationType(String),

    #[error("Unknown relation kind: {0}")]
    UnknownRelationKind(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Tree error: {0}")]
    Tree(String),

    #[error("Scenario error: {0}")]
    Scenario(String),

    #[error("Lock poisoned: {0}")]
    LockPoisoned(&'static str),
}
