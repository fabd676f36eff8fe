//! Storage Layer - the generic relation store
//!
//! Relations are typed, directed (parent → child) edges. The store offers
//! per-call atomicity only: there are no multi-edge transactions, and it may
//! already hold duplicate or orphaned edges when the engine reads it.
//!
//! System of record is SQLite with tables:
//! - relation_types(alias, name, parent_object, child_object)
//! - relations(id, parent_id, child_id, type_alias)

pub mod schema;
pub mod sqlite;

pub use sqlite::{DbStats, SqliteStore};

use crate::Result;
use crate::node::NodeId;
use crate::relation::{Relation, RelationKind, RelationType};

/// Typed-edge persistence consumed by the reconcilers.
pub trait RelationStore: Send + Sync {
    /// Create the relation type if it does not exist yet; returns its identity
    fn ensure_relation_type(&self, definition: &RelationType) -> Result<i64>;

    /// Fetch a relation type definition by alias
    fn get_relation_type(&self, alias: &str) -> Result<Option<RelationType>>;

    /// Create a new edge. Fails if the relation type has not been defined.
    fn relate(&self, parent_id: NodeId, child_id: NodeId, kind: RelationKind) -> Result<Relation>;

    /// All edges with the given parent, in creation order
    fn get_by_parent(&self, parent_id: NodeId) -> Result<Vec<Relation>>;

    /// All edges with the given child, in creation order
    fn get_by_child(&self, child_id: NodeId) -> Result<Vec<Relation>>;

    /// All edges of one kind, in creation order
    fn get_by_kind(&self, kind: RelationKind) -> Result<Vec<Relation>>;

    /// Delete one edge by identity. Deleting a missing edge is not an error.
    fn delete(&self, relation_id: i64) -> Result<()>;

    /// Number of edges of one kind
    fn count_by_kind(&self, kind: RelationKind) -> Result<usize> {
        Ok(self.get_by_kind(kind)?.len())
    }

    /// Edges of one kind with the given parent
    fn get_by_parent_and_kind(&self, parent_id: NodeId, kind: RelationKind) -> Result<Vec<Relation>> {
        Ok(self
            .get_by_parent(parent_id)?
            .into_iter()
            .filter(|r| r.is(kind))
            .collect())
    }

    /// Edges of one kind with the given child
    fn get_by_child_and_kind(&self, child_id: NodeId, kind: RelationKind) -> Result<Vec<Relation>> {
        Ok(self
            .get_by_child(child_id)?
            .into_iter()
            .filter(|r| r.is(kind))
            .collect())
    }
}
