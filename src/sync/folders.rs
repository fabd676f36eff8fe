//! Media folder service - the content node ↔ media folder mirror
//!
//! Resolves, creates and deletes the `StructuralMirror` relation of a content
//! node together with the folder it points at. Every relation query is treated
//! as returning zero, one or many edges.

use std::sync::Arc;

use crate::config::SyncSettings;
use crate::node::{Node, NodeId, FOLDER_TYPE};
use crate::relation::{Relation, RelationKind};
use crate::storage::RelationStore;
use crate::tree::TreeStore;
use crate::{Error, Result};

/// Where a mirrored folder belongs in the media tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FolderPlacement {
    /// Top level of the media tree
    Root,
    /// Beneath this media folder
    Folder(NodeId),
    /// The content parent has no folder and self-heal was not allowed
    Unmirrored,
}

impl FolderPlacement {
    /// Parent id to hand to the media store, if the placement is resolved
    pub fn parent_id(&self) -> Option<Option<NodeId>> {
        match self {
            FolderPlacement::Root => Some(None),
            FolderPlacement::Folder(id) => Some(Some(*id)),
            FolderPlacement::Unmirrored => None,
        }
    }
}

pub struct MediaFolders {
    content: Arc<dyn TreeStore>,
    media: Arc<dyn TreeStore>,
    relations: Arc<dyn RelationStore>,
    settings: SyncSettings,
}

impl MediaFolders {
    pub fn new(
        content: Arc<dyn TreeStore>,
        media: Arc<dyn TreeStore>,
        relations: Arc<dyn RelationStore>,
        settings: SyncSettings,
    ) -> Self {
        Self {
            content,
            media,
            relations,
            settings,
        }
    }

    pub fn content(&self) -> &dyn TreeStore {
        self.content.as_ref()
    }

    pub fn media(&self) -> &dyn TreeStore {
        self.media.as_ref()
    }

    pub fn relations(&self) -> &dyn RelationStore {
        self.relations.as_ref()
    }

    pub fn settings(&self) -> &SyncSettings {
        &self.settings
    }

    /// The mirror relation of a content node. If the store holds several, the
    /// oldest wins.
    pub fn mirror_of(&self, content_id: NodeId) -> Result<Option<Relation>> {
        let mut mirrors = self
            .relations
            .get_by_parent_and_kind(content_id, RelationKind::StructuralMirror)?;
        if mirrors.len() > 1 {
            tracing::debug!(content = content_id, count = mirrors.len(), "content node has several folder relations");
        }
        Ok(if mirrors.is_empty() { None } else { Some(mirrors.remove(0)) })
    }

    /// Create the folder for a content node unless it already has one.
    ///
    /// Missing folders of eligible ancestors are created first, so the new
    /// folder always lands beneath its nearest mirrored ancestor.
    pub fn create_mirror(&self, node: &Node) -> Result<Relation> {
        if let Some(existing) = self.mirror_of(node.id)? {
            return Ok(existing);
        }

        let placement = self.placement_for(node.parent_id, true)?;
        let parent = placement.parent_id().unwrap_or(None);
        let folder = self.create_folder(&node.name, parent)?;

        self.relations
            .ensure_relation_type(&RelationKind::StructuralMirror.definition())?;
        let relation = self
            .relations
            .relate(node.id, folder.id, RelationKind::StructuralMirror)?;

        tracing::info!(content = node.id, folder = folder.id, name = %node.name, "created media folder");
        Ok(relation)
    }

    /// Self-heal: give an eligible node a folder if it lacks one
    pub fn ensure_mirror(&self, node: &Node) -> Result<Option<Relation>> {
        if !self.settings.sync_node(node) {
            return Ok(None);
        }
        self.create_mirror(node).map(Some)
    }

    /// Resolve the media parent for a node whose content parent is
    /// `content_parent`. Ineligible ancestors are skipped over; missing folders
    /// are created only when `heal` is set.
    pub fn placement_for(&self, content_parent: Option<NodeId>, heal: bool) -> Result<FolderPlacement> {
        let mut current = content_parent;

        while let Some(parent_id) = current {
            let parent = self
                .content
                .get_by_id(parent_id)?
                .ok_or(Error::NodeNotFound { tree: self.content.kind(), id: parent_id })?;

            if !self.settings.sync_node(&parent) {
                current = parent.parent_id;
                continue;
            }

            if let Some(mirror) = self.mirror_of(parent.id)? {
                return Ok(FolderPlacement::Folder(mirror.child_id));
            }
            if !heal {
                return Ok(FolderPlacement::Unmirrored);
            }

            tracing::info!(content = parent.id, "parent has no media folder, creating one");
            let mirror = self.create_mirror(&parent)?;
            return Ok(FolderPlacement::Folder(mirror.child_id));
        }

        Ok(FolderPlacement::Root)
    }

    /// Create and persist an empty folder
    pub fn create_folder(&self, name: &str, parent_id: Option<NodeId>) -> Result<Node> {
        let draft = self.media.create_item(name, parent_id, FOLDER_TYPE)?;
        self.media.insert(draft)
    }

    /// Permanently delete the folder(s) of a content node and the relations
    /// pointing at them. Missing folders are skipped.
    pub fn delete_mirror(&self, content_id: NodeId) -> Result<usize> {
        let mirrors = self
            .relations
            .get_by_parent_and_kind(content_id, RelationKind::StructuralMirror)?;

        let mut deleted = 0;
        for mirror in &mirrors {
            let removed = self.media.delete(mirror.child_id)?;
            if !removed.is_empty() {
                deleted += 1;
                tracing::info!(content = content_id, folder = mirror.child_id, items = removed.len(), "deleted media folder");
            }
            self.relations.delete(mirror.id)?;
        }
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeDraft;
    use crate::storage::SqliteStore;
    use crate::tree::{MemoryTree, TreeKind};

    struct Fixture {
        content: Arc<MemoryTree>,
        media: Arc<MemoryTree>,
        relations: Arc<SqliteStore>,
        folders: MediaFolders,
    }

    fn fixture(settings: SyncSettings) -> Fixture {
        let content = Arc::new(MemoryTree::new(TreeKind::Content));
        let media = Arc::new(MemoryTree::new(TreeKind::Media));
        let relations = Arc::new(SqliteStore::open_in_memory().unwrap());
        let folders = MediaFolders::new(content.clone(), media.clone(), relations.clone(), settings);
        Fixture { content, media, relations, folders }
    }

    fn page(content: &MemoryTree, name: &str, parent: Option<NodeId>, type_alias: &str) -> Node {
        content.insert(NodeDraft::new(name, parent, type_alias)).unwrap()
    }

    #[test]
    fn test_create_mirror_is_idempotent() {
        let f = fixture(SyncSettings::default());
        let home = page(&f.content, "Home", None, "page");

        let first = f.folders.create_mirror(&home).unwrap();
        let second = f.folders.create_mirror(&home).unwrap();

        assert_eq!(first, second);
        assert_eq!(f.media.len().unwrap(), 1);
        assert_eq!(f.relations.count_by_kind(RelationKind::StructuralMirror).unwrap(), 1);
    }

    #[test]
    fn test_create_mirror_heals_ancestors() {
        let f = fixture(SyncSettings::default());
        let home = page(&f.content, "Home", None, "page");
        let about = page(&f.content, "About", Some(home.id), "page");
        let team = page(&f.content, "Team", Some(about.id), "page");

        let mirror = f.folders.create_mirror(&team).unwrap();

        let chain: Vec<String> = f.media.ancestry(mirror.child_id).unwrap().into_iter().map(|n| n.name).collect();
        assert_eq!(chain, vec!["Home", "About", "Team"]);
        assert_eq!(f.relations.count_by_kind(RelationKind::StructuralMirror).unwrap(), 3);
    }

    #[test]
    fn test_ineligible_parent_is_skipped() {
        let f = fixture(SyncSettings {
            ignore_node_types: vec!["listing".to_string()],
            ..SyncSettings::default()
        });
        let home = page(&f.content, "Home", None, "page");
        let news = page(&f.content, "News", Some(home.id), "listing");
        let story = page(&f.content, "Story", Some(news.id), "page");

        let mirror = f.folders.create_mirror(&story).unwrap();
        let home_folder = f.folders.mirror_of(home.id).unwrap().unwrap().child_id;

        assert_eq!(f.media.get_by_id(mirror.child_id).unwrap().unwrap().parent_id, Some(home_folder));
        assert!(f.folders.mirror_of(news.id).unwrap().is_none());
        assert!(f.folders.ensure_mirror(&news).unwrap().is_none());
    }

    #[test]
    fn test_placement_without_heal() {
        let f = fixture(SyncSettings::default());
        let home = page(&f.content, "Home", None, "page");

        assert_eq!(f.folders.placement_for(None, false).unwrap(), FolderPlacement::Root);
        assert_eq!(f.folders.placement_for(Some(home.id), false).unwrap(), FolderPlacement::Unmirrored);
        assert!(f.media.is_empty().unwrap());
    }

    #[test]
    fn test_delete_mirror_removes_folder_and_relation() {
        let f = fixture(SyncSettings::default());
        let home = page(&f.content, "Home", None, "page");
        let mirror = f.folders.create_mirror(&home).unwrap();
        f.folders.create_folder("Inner", Some(mirror.child_id)).unwrap();

        assert_eq!(f.folders.delete_mirror(home.id).unwrap(), 1);
        assert!(f.media.is_empty().unwrap());
        assert!(f.folders.mirror_of(home.id).unwrap().is_none());

        assert_eq!(f.folders.delete_mirror(home.id).unwrap(), 0);
    }
}
