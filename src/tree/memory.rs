//! In-memory tree store
//!
//! A thread-safe [`TreeStore`] holding nodes, published snapshots and binary
//! payloads in memory. Used by the in-process host, scenarios and tests.

use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::{TreeKind, TreeStore};
use crate::node::{Node, NodeDraft, NodeId};
use crate::{Error, Result};

#[derive(Debug, Default)]
struct TreeState {
    nodes: BTreeMap<NodeId, Node>,
    published: HashMap<NodeId, Node>,
    blobs: HashMap<String, Vec<u8>>,
    next_id: NodeId,
    next_slot: u64,
}

impl TreeState {
    fn children_of(&self, id: NodeId) -> impl Iterator<Item = &Node> {
        self.nodes.values().filter(move |n| n.parent_id == Some(id))
    }

    fn subtree_ids(&self, id: NodeId) -> Vec<NodeId> {
        let mut ids = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            ids.push(current);
            stack.extend(self.children_of(current).map(|n| n.id));
        }
        ids
    }

    fn remove_subtree(&mut self, id: NodeId) -> Vec<NodeId> {
        if !self.nodes.contains_key(&id) {
            return Vec::new();
        }
        let ids = self.subtree_ids(id);
        for removed in &ids {
            if let Some(node) = self.nodes.remove(removed) {
                if let Some(path) = node.file_path() {
                    self.blobs.remove(path);
                }
            }
            self.published.remove(removed);
        }
        ids
    }
}

/// In-memory [`TreeStore`]
#[derive(Debug)]
pub struct MemoryTree {
    kind: TreeKind,
    state: RwLock<TreeState>,
}

impl MemoryTree {
    /// Create an empty tree. Content ids start at 1000, media ids at 1, so the
    /// two id spaces are easy to tell apart.
    pub fn new(kind: TreeKind) -> Self {
        let first_id = match kind {
            TreeKind::Content => 1000,
            TreeKind::Media => 1,
        };
        Self::with_first_id(kind, first_id)
    }

    pub fn with_first_id(kind: TreeKind, first_id: NodeId) -> Self {
        Self {
            kind,
            state: RwLock::new(TreeState {
                next_id: first_id,
                next_slot: 1,
                ..TreeState::default()
            }),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, TreeState>> {
        self.state.read().map_err(|_| Error::LockPoisoned("tree store"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, TreeState>> {
        self.state.write().map_err(|_| Error::LockPoisoned("tree store"))
    }

    fn not_found(&self, id: NodeId) -> Error {
        Error::NodeNotFound { tree: self.kind, id }
    }

    fn check_parent(&self, state: &TreeState, parent_id: Option<NodeId>) -> Result<()> {
        match parent_id {
            Some(parent) if !state.nodes.contains_key(&parent) => Err(self.not_found(parent)),
            _ => Ok(()),
        }
    }

    /// Number of nodes currently stored
    pub fn len(&self) -> Result<usize> {
        Ok(self.read()?.nodes.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

impl TreeStore for MemoryTree {
    fn kind(&self) -> TreeKind {
        self.kind
    }

    fn get_by_id(&self, id: NodeId) -> Result<Option<Node>> {
        Ok(self.read()?.nodes.get(&id).cloned())
    }

    fn get_published_version(&self, id: NodeId) -> Result<Option<Node>> {
        Ok(self.read()?.published.get(&id).cloned())
    }

    fn get_children(&self, id: NodeId) -> Result<Vec<Node>> {
        Ok(self.read()?.children_of(id).cloned().collect())
    }

    fn has_children(&self, id: NodeId) -> Result<bool> {
        Ok(self.read()?.children_of(id).next().is_some())
    }

    fn get_by_path(&self, path: &str) -> Result<Option<Node>> {
        let state = self.read()?;
        Ok(state
            .nodes
            .values()
            .find(|n| n.file_path().is_some_and(|p| p.eq_ignore_ascii_case(path)))
            .cloned())
    }

    fn create_item(&self, name: &str, parent_id: Option<NodeId>, type_alias: &str) -> Result<NodeDraft> {
        let state = self.read()?;
        self.check_parent(&state, parent_id)?;
        Ok(NodeDraft::new(name, parent_id, type_alias))
    }

    fn set_binary_field(&self, draft: &mut NodeDraft, alias: &str, file_name: &str, bytes: &[u8]) -> Result<()> {
        if file_name.is_empty() || file_name.contains('/') {
            return Err(Error::Tree(format!("invalid file name: {:?}", file_name)));
        }
        let mut state = self.write()?;
        let path = format!("/{}/{}/{}", self.kind.as_str(), state.next_slot, file_name);
        state.next_slot += 1;
        state.blobs.insert(path.clone(), bytes.to_vec());
        draft.set_field(alias, crate::node::FILE_EDITOR, Some(path));
        Ok(())
    }

    fn read_binary(&self, path: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.read()?.blobs.get(path).cloned())
    }

    fn insert(&self, draft: NodeDraft) -> Result<Node> {
        let mut state = self.write()?;
        self.check_parent(&state, draft.parent_id)?;
        let id = state.next_id;
        state.next_id += 1;
        let node = draft.into_node(id);
        state.nodes.insert(id, node.clone());
        Ok(node)
    }

    fn save(&self, node: &Node) -> Result<()> {
        let mut state = self.write()?;
        self.check_parent(&state, node.parent_id)?;
        match state.nodes.get_mut(&node.id) {
            Some(existing) => {
                *existing = node.clone();
                Ok(())
            }
            None => Err(self.not_found(node.id)),
        }
    }

    fn publish(&self, id: NodeId) -> Result<()> {
        let mut state = self.write()?;
        let node = match state.nodes.get_mut(&id) {
            Some(node) => {
                node.published = true;
                node.clone()
            }
            None => return Err(self.not_found(id)),
        };
        state.published.insert(id, node);
        Ok(())
    }

    fn move_to(&self, id: NodeId, new_parent_id: Option<NodeId>) -> Result<()> {
        let mut state = self.write()?;
        if !state.nodes.contains_key(&id) {
            return Err(self.not_found(id));
        }
        self.check_parent(&state, new_parent_id)?;
        if let Some(parent) = new_parent_id {
            if state.subtree_ids(id).contains(&parent) {
                return Err(Error::Tree(format!(
                    "cannot move {} node {} beneath itself ({})",
                    self.kind, id, parent
                )));
            }
        }
        if let Some(node) = state.nodes.get_mut(&id) {
            node.parent_id = new_parent_id;
        }
        Ok(())
    }

    fn move_to_recycle_bin(&self, id: NodeId) -> Result<()> {
        let mut state = self.write()?;
        if !state.nodes.contains_key(&id) {
            return Err(self.not_found(id));
        }
        for trashed in state.subtree_ids(id) {
            if let Some(node) = state.nodes.get_mut(&trashed) {
                node.trashed = true;
                node.published = false;
            }
            state.published.remove(&trashed);
        }
        Ok(())
    }

    fn delete(&self, id: NodeId) -> Result<Vec<NodeId>> {
        Ok(self.write()?.remove_subtree(id))
    }

    fn recycle_bin(&self) -> Result<Vec<Node>> {
        let state = self.read()?;
        Ok(state
            .nodes
            .values()
            .filter(|n| n.trashed)
            .filter(|n| {
                n.parent_id
                    .and_then(|p| state.nodes.get(&p))
                    .is_none_or(|parent| !parent.trashed)
            })
            .cloned()
            .collect())
    }

    fn empty_recycle_bin(&self) -> Result<Vec<NodeId>> {
        let roots: Vec<NodeId> = self.recycle_bin()?.into_iter().map(|n| n.id).collect();
        let mut state = self.write()?;
        let mut removed = Vec::new();
        for root in roots {
            removed.extend(state.remove_subtree(root));
        }
        Ok(removed)
    }

    fn all(&self) -> Result<Vec<Node>> {
        Ok(self.read()?.nodes.values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{FILE_FIELD, FOLDER_TYPE};

    fn folder(tree: &MemoryTree, name: &str, parent: Option<NodeId>) -> Node {
        let draft = tree.create_item(name, parent, FOLDER_TYPE).unwrap();
        tree.insert(draft).unwrap()
    }

    #[test]
    fn test_insert_assigns_sequential_ids() {
        let tree = MemoryTree::new(TreeKind::Media);
        let a = folder(&tree, "a", None);
        let b = folder(&tree, "b", Some(a.id));

        assert_eq!(a.id, 1);
        assert_eq!(b.id, 2);
        assert_eq!(tree.get_children(a.id).unwrap(), vec![b]);
        assert!(tree.has_children(a.id).unwrap());
    }

    #[test]
    fn test_create_under_missing_parent_fails() {
        let tree = MemoryTree::new(TreeKind::Content);
        let err = tree.create_item("orphan", Some(42), "page").unwrap_err();
        assert!(matches!(err, Error::NodeNotFound { tree: TreeKind::Content, id: 42 }));
    }

    #[test]
    fn test_binary_payload_roundtrip() {
        let tree = MemoryTree::new(TreeKind::Media);
        let mut draft = tree.create_item("logo", None, "Image").unwrap();
        tree.set_binary_field(&mut draft, FILE_FIELD, "logo.png", b"png-bytes").unwrap();
        let node = tree.insert(draft).unwrap();

        let path = node.file_path().unwrap().to_string();
        assert!(path.ends_with("/logo.png"));
        assert_eq!(tree.read_binary(&path).unwrap(), Some(b"png-bytes".to_vec()));
        assert_eq!(tree.get_by_path(&path).unwrap().map(|n| n.id), Some(node.id));
    }

    #[test]
    fn test_removed_items_drop_payloads() {
        let tree = MemoryTree::new(TreeKind::Media);
        let dir = folder(&tree, "dir", None);
        let mut draft = tree.create_item("logo", Some(dir.id), "Image").unwrap();
        tree.set_binary_field(&mut draft, FILE_FIELD, "logo.png", b"png").unwrap();
        let logo = tree.insert(draft).unwrap();
        let mut draft = tree.create_item("old", None, "Image").unwrap();
        tree.set_binary_field(&mut draft, FILE_FIELD, "old.png", b"old").unwrap();
        let old = tree.insert(draft).unwrap();

        tree.delete(dir.id).unwrap();
        assert_eq!(tree.read_binary(logo.file_path().unwrap()).unwrap(), None);

        tree.move_to_recycle_bin(old.id).unwrap();
        tree.empty_recycle_bin().unwrap();
        assert_eq!(tree.read_binary(old.file_path().unwrap()).unwrap(), None);
        assert!(tree.read().unwrap().blobs.is_empty());
    }

    #[test]
    fn test_move_beneath_itself_is_rejected() {
        let tree = MemoryTree::new(TreeKind::Media);
        let a = folder(&tree, "a", None);
        let b = folder(&tree, "b", Some(a.id));

        assert!(tree.move_to(a.id, Some(b.id)).is_err());
        tree.move_to(b.id, None).unwrap();
        assert_eq!(tree.get_by_id(b.id).unwrap().unwrap().parent_id, None);
    }

    #[test]
    fn test_recycle_bin_lifecycle() {
        let tree = MemoryTree::new(TreeKind::Content);
        let a = folder(&tree, "a", None);
        let b = folder(&tree, "b", Some(a.id));
        let keep = folder(&tree, "keep", None);

        tree.move_to_recycle_bin(a.id).unwrap();
        assert!(tree.get_by_id(b.id).unwrap().unwrap().trashed);

        let bin: Vec<NodeId> = tree.recycle_bin().unwrap().iter().map(|n| n.id).collect();
        assert_eq!(bin, vec![a.id]);

        let mut removed = tree.empty_recycle_bin().unwrap();
        removed.sort();
        assert_eq!(removed, vec![a.id, b.id]);
        assert_eq!(tree.all().unwrap(), vec![keep]);
    }

    #[test]
    fn test_publish_snapshot_is_independent() {
        let tree = MemoryTree::new(TreeKind::Content);
        let mut page = folder(&tree, "Old", None);
        tree.publish(page.id).unwrap();

        page.name = "New".to_string();
        tree.save(&page).unwrap();

        assert_eq!(tree.get_published_version(page.id).unwrap().unwrap().name, "Old");
        assert_eq!(tree.get_by_id(page.id).unwrap().unwrap().name, "New");
    }
}
