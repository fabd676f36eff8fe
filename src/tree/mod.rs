//! Tree stores - the content and media hierarchies
//!
//! The engine never owns node data; it reads and mutates both trees through
//! [`TreeStore`]. Every call is synchronous and fallible.

pub mod memory;

pub use memory::MemoryTree;

use crate::Result;
use crate::node::{Node, NodeDraft, NodeId};
use serde::{Deserialize, Serialize};

/// Which of the two trees a store (or recycle bin) belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TreeKind {
    Content,
    Media,
}

impl TreeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TreeKind::Content => "content",
            TreeKind::Media => "media",
        }
    }
}

impl std::fmt::Display for TreeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Data access to one hierarchical store.
pub trait TreeStore: Send + Sync {
    /// Which tree this is
    fn kind(&self) -> TreeKind;

    /// Get a node by identity
    fn get_by_id(&self, id: NodeId) -> Result<Option<Node>>;

    /// Last published version of a node, if it was ever published
    fn get_published_version(&self, id: NodeId) -> Result<Option<Node>>;

    /// Direct children of a node
    fn get_children(&self, id: NodeId) -> Result<Vec<Node>>;

    fn has_children(&self, id: NodeId) -> Result<bool> {
        Ok(!self.get_children(id)?.is_empty())
    }

    /// Find the item whose binary payload is stored at `path`
    fn get_by_path(&self, path: &str) -> Result<Option<Node>>;

    /// Start a new unsaved item under `parent_id` (None = root)
    fn create_item(&self, name: &str, parent_id: Option<NodeId>, type_alias: &str) -> Result<NodeDraft>;

    /// Store `bytes` under a fresh storage location named `file_name` and point
    /// the draft's `alias` field at it
    fn set_binary_field(&self, draft: &mut NodeDraft, alias: &str, file_name: &str, bytes: &[u8]) -> Result<()>;

    /// Read a stored binary payload
    fn read_binary(&self, path: &str) -> Result<Option<Vec<u8>>>;

    /// Persist a new item, assigning its identity
    fn insert(&self, draft: NodeDraft) -> Result<Node>;

    /// Persist changes to an existing item
    fn save(&self, node: &Node) -> Result<()>;

    /// Record the current version as the published one
    fn publish(&self, id: NodeId) -> Result<()>;

    /// Move a node (and its subtree) under a new parent
    fn move_to(&self, id: NodeId, new_parent_id: Option<NodeId>) -> Result<()>;

    /// Flag a node and its descendants as trashed
    fn move_to_recycle_bin(&self, id: NodeId) -> Result<()>;

    /// Permanently delete a node and its descendants; returns the removed ids.
    /// Deleting a missing node removes nothing.
    fn delete(&self, id: NodeId) -> Result<Vec<NodeId>>;

    /// Trashed nodes whose parent is not itself trashed
    fn recycle_bin(&self) -> Result<Vec<Node>>;

    /// Permanently delete everything in the recycle bin; returns the removed ids
    fn empty_recycle_bin(&self) -> Result<Vec<NodeId>>;

    /// All nodes in the tree, ordered by identity
    fn all(&self) -> Result<Vec<Node>>;

    /// All descendants of a node, depth first
    fn descendants(&self, id: NodeId) -> Result<Vec<Node>> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            for child in self.get_children(current)? {
                stack.push(child.id);
                out.push(child);
            }
        }
        Ok(out)
    }

    /// Chain of nodes from the root down to `id` (inclusive)
    fn ancestry(&self, id: NodeId) -> Result<Vec<Node>> {
        let mut chain = Vec::new();
        let mut current = Some(id);
        while let Some(node_id) = current {
            match self.get_by_id(node_id)? {
                Some(node) => {
                    current = node.parent_id;
                    chain.push(node);
                }
                None => break,
            }
        }
        chain.reverse();
        Ok(chain)
    }
}
