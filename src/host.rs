//! In-process content host
//!
//! Performs content operations against a [`TreeStore`] and raises the
//! lifecycle notifications around each one, the way a CMS content service
//! would. Observer errors abort the operation and are returned to the caller;
//! nothing already applied is rolled back.

use std::sync::Arc;

use crate::event::{Notification, Observer, SavedNode};
use crate::node::{Node, NodeDraft, NodeId};
use crate::tree::{TreeKind, TreeStore};
use crate::{Error, Result};

pub struct ContentHost {
    content: Arc<dyn TreeStore>,
    observer: Arc<dyn Observer>,
}

impl ContentHost {
    pub fn new(content: Arc<dyn TreeStore>, observer: Arc<dyn Observer>) -> Self {
        Self { content, observer }
    }

    pub fn content(&self) -> &dyn TreeStore {
        self.content.as_ref()
    }

    fn load(&self, id: NodeId) -> Result<Node> {
        self.content
            .get_by_id(id)?
            .ok_or(Error::NodeNotFound { tree: TreeKind::Content, id })
    }

    /// Persist a new node
    pub fn create(&self, draft: NodeDraft) -> Result<Node> {
        let node = self.content.insert(draft)?;
        self.observer.notify(&Notification::Saved {
            nodes: vec![SavedNode { node: node.clone(), created: true }],
        })?;
        self.load(node.id)
    }

    /// Persist changes to an existing node
    pub fn save(&self, node: &Node) -> Result<Node> {
        self.observer.notify(&Notification::Saving { nodes: vec![node.clone()] })?;
        self.content.save(node)?;
        self.observer.notify(&Notification::Saved {
            nodes: vec![SavedNode { node: node.clone(), created: false }],
        })?;
        self.load(node.id)
    }

    /// Save the current version and make it the published one
    pub fn publish(&self, id: NodeId) -> Result<Node> {
        let node = self.load(id)?;
        self.observer.notify(&Notification::Saving { nodes: vec![node.clone()] })?;
        self.content.publish(id)?;
        let published = self.load(id)?;
        self.observer.notify(&Notification::Saved {
            nodes: vec![SavedNode { node: published, created: false }],
        })?;
        self.load(id)
    }

    /// Move a node (and its subtree) under a new parent
    pub fn move_node(&self, id: NodeId, new_parent_id: Option<NodeId>) -> Result<Node> {
        let node = self.load(id)?;
        let old_parent_id = node.parent_id;
        self.observer.notify(&Notification::Moving { node, new_parent_id })?;
        self.content.move_to(id, new_parent_id)?;
        let moved = self.load(id)?;
        self.observer.notify(&Notification::Moved { node: moved.clone(), old_parent_id })?;
        Ok(moved)
    }

    /// Copy a single node (not its children) under `new_parent_id`
    pub fn copy(&self, id: NodeId, new_parent_id: Option<NodeId>) -> Result<Node> {
        let original = self.load(id)?;
        let draft = NodeDraft {
            parent_id: new_parent_id,
            name: original.name.clone(),
            type_alias: original.type_alias.clone(),
            fields: original.fields.clone(),
        };
        let copy = self.content.insert(draft)?;
        self.observer.notify(&Notification::Copied { original, copy: copy.clone() })?;
        self.load(copy.id)
    }

    /// Move a node and its subtree to the recycle bin
    pub fn trash(&self, id: NodeId) -> Result<Node> {
        self.content.move_to_recycle_bin(id)?;
        let node = self.load(id)?;
        self.observer.notify(&Notification::Trashed { node: node.clone() })?;
        Ok(node)
    }

    /// Permanently delete a node and its subtree. Returns the removed ids.
    pub fn delete(&self, id: NodeId) -> Result<Vec<NodeId>> {
        let node = self.load(id)?;
        let mut nodes = vec![node];
        nodes.extend(self.content.descendants(id)?);
        self.observer.notify(&Notification::Deleting { nodes })?;
        self.content.delete(id)
    }

    /// Permanently delete everything in the content recycle bin
    pub fn empty_recycle_bin(&self) -> Result<Vec<NodeId>> {
        let mut ids = Vec::new();
        for root in self.content.recycle_bin()? {
            ids.push(root.id);
            ids.extend(self.content.descendants(root.id)?.into_iter().map(|n| n.id));
        }
        self.observer.notify(&Notification::EmptyingRecycleBin { ids, bin: TreeKind::Content })?;
        self.content.empty_recycle_bin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MediaSyncConfig;
    use crate::engine::SyncEngine;
    use crate::node::{FILE_FIELD, FOLDER_TYPE};
    use crate::relation::RelationKind;
    use crate::storage::{RelationStore, SqliteStore};
    use crate::tree::MemoryTree;

    struct Site {
        content: Arc<MemoryTree>,
        media: Arc<MemoryTree>,
        relations: Arc<SqliteStore>,
        host: ContentHost,
    }

    fn site(config: MediaSyncConfig) -> Site {
        let content = Arc::new(MemoryTree::new(TreeKind::Content));
        let media = Arc::new(MemoryTree::new(TreeKind::Media));
        let relations = Arc::new(SqliteStore::open_in_memory().unwrap());
        let engine = SyncEngine::start(&config, content.clone(), media.clone(), relations.clone()).unwrap();
        let host = ContentHost::new(content.clone(), Arc::new(engine));
        Site { content, media, relations, host }
    }

    impl Site {
        fn folder_of(&self, content_id: NodeId) -> Option<Node> {
            let mirrors = self
                .relations
                .get_by_parent_and_kind(content_id, RelationKind::StructuralMirror)
                .unwrap();
            mirrors.first().and_then(|r| self.media.get_by_id(r.child_id).unwrap())
        }

        fn usage_of(&self, content_id: NodeId) -> Vec<NodeId> {
            let mut ids: Vec<NodeId> = self
                .relations
                .get_by_parent_and_kind(content_id, RelationKind::UsageLink)
                .unwrap()
                .into_iter()
                .map(|r| r.child_id)
                .collect();
            ids.sort();
            ids
        }

        fn upload(&self, name: &str, parent: Option<NodeId>) -> Node {
            let mut draft = self.media.create_item(name, parent, "Image").unwrap();
            self.media
                .set_binary_field(&mut draft, FILE_FIELD, name, name.as_bytes())
                .unwrap();
            self.media.insert(draft).unwrap()
        }
    }

    #[test]
    fn test_created_nodes_get_nested_folders() {
        let s = site(MediaSyncConfig::default());
        let home = s.host.create(NodeDraft::new("Home", None, "page")).unwrap();
        let about = s.host.create(NodeDraft::new("About", Some(home.id), "page")).unwrap();

        let home_folder = s.folder_of(home.id).unwrap();
        let about_folder = s.folder_of(about.id).unwrap();
        assert_eq!(home_folder.name, "Home");
        assert!(home_folder.is_folder());
        assert_eq!(home_folder.parent_id, None);
        assert_eq!(about_folder.parent_id, Some(home_folder.id));
    }

    #[test]
    fn test_repeated_saves_do_not_duplicate_folders() {
        let s = site(MediaSyncConfig::default());
        let home = s.host.create(NodeDraft::new("Home", None, "page")).unwrap();

        s.host.save(&home).unwrap();
        s.host.save(&home).unwrap();

        assert_eq!(s.relations.count_by_kind(RelationKind::StructuralMirror).unwrap(), 1);
        assert_eq!(s.media.len().unwrap(), 1);
    }

    #[test]
    fn test_save_heals_missing_folder() {
        let s = site(MediaSyncConfig::default());
        let legacy = s.content.insert(NodeDraft::new("Legacy", None, "page")).unwrap();
        assert!(s.folder_of(legacy.id).is_none());

        s.host.save(&legacy).unwrap();
        assert_eq!(s.folder_of(legacy.id).unwrap().name, "Legacy");
    }

    #[test]
    fn test_rename_follows_published_name() {
        let s = site(MediaSyncConfig::default());
        let home = s.host.create(NodeDraft::new("Home", None, "page")).unwrap();

        // Never published: nothing to compare against.
        let mut draft = home.clone();
        draft.name = "Start".to_string();
        s.host.save(&draft).unwrap();
        assert_eq!(s.folder_of(home.id).unwrap().name, "Home");

        s.host.publish(home.id).unwrap();
        let mut renamed = s.content.get_by_id(home.id).unwrap().unwrap();
        renamed.name = "Welcome".to_string();
        s.host.save(&renamed).unwrap();
        assert_eq!(s.folder_of(home.id).unwrap().name, "Welcome");
    }

    #[test]
    fn test_rename_disabled() {
        let mut config = MediaSyncConfig::default();
        config.sync.rename_media = false;
        let s = site(config);
        let home = s.host.create(NodeDraft::new("Home", None, "page")).unwrap();
        s.host.publish(home.id).unwrap();

        let mut renamed = s.content.get_by_id(home.id).unwrap().unwrap();
        renamed.name = "Welcome".to_string();
        s.host.save(&renamed).unwrap();
        assert_eq!(s.folder_of(home.id).unwrap().name, "Home");
    }

    #[test]
    fn test_move_moves_folder() {
        let s = site(MediaSyncConfig::default());
        let a = s.host.create(NodeDraft::new("A", None, "page")).unwrap();
        let b = s.host.create(NodeDraft::new("B", None, "page")).unwrap();
        let child = s.host.create(NodeDraft::new("Child", Some(a.id), "page")).unwrap();

        s.host.move_node(child.id, Some(b.id)).unwrap();

        let b_folder = s.folder_of(b.id).unwrap();
        assert_eq!(s.folder_of(child.id).unwrap().parent_id, Some(b_folder.id));

        s.host.move_node(child.id, None).unwrap();
        assert_eq!(s.folder_of(child.id).unwrap().parent_id, None);
    }

    #[test]
    fn test_move_of_ignored_node_leaves_folder() {
        let mut config = MediaSyncConfig::default();
        config.sync.ignore_node_types = vec!["listing".to_string()];
        let s = site(config);
        let a = s.host.create(NodeDraft::new("A", None, "page")).unwrap();
        let b = s.host.create(NodeDraft::new("B", None, "page")).unwrap();
        let listing = s.host.create(NodeDraft::new("News", Some(a.id), "listing")).unwrap();
        assert!(s.folder_of(listing.id).is_none());

        s.host.move_node(listing.id, Some(b.id)).unwrap();
        assert!(s.folder_of(listing.id).is_none());
        assert_eq!(s.media.len().unwrap(), 2);
    }

    #[test]
    fn test_usage_follows_saves() {
        let s = site(MediaSyncConfig::default());
        let ids: Vec<NodeId> = ["a.jpg", "b.jpg", "c.jpg", "d.jpg"]
            .iter()
            .map(|name| s.upload(name, None).id)
            .collect();
        let picked = |list: &[NodeId]| list.iter().map(|id| id.to_string()).collect::<Vec<_>>().join(",");

        let page = s
            .host
            .create(NodeDraft::new("Home", None, "page").with_field("gallery", "MediaPicker", picked(&ids[..3])))
            .unwrap();
        assert_eq!(s.usage_of(page.id), ids[..3].to_vec());

        let mut edited = page.clone();
        edited.set_field("gallery", "MediaPicker", Some(picked(&ids[1..])));
        s.host.save(&edited).unwrap();
        assert_eq!(s.usage_of(page.id), ids[1..].to_vec());
    }

    #[test]
    fn test_usage_aggregates_picker_and_markup() {
        let s = site(MediaSyncConfig::default());
        let logo = s.upload("logo.png", None);
        let chart = s.upload("chart.png", None);
        let report = s.upload("report.pdf", None);

        let body = format!(
            r#"<p><img src="{}" /> see <a href="https://example.com{}?dl=1">the report</a></p>"#,
            chart.file_path().unwrap(),
            report.file_path().unwrap()
        );
        let page = s
            .host
            .create(
                NodeDraft::new("Home", None, "page")
                    .with_field("body", "RichTextEditor", body)
                    .with_field("logo", "MediaPicker", logo.id.to_string()),
            )
            .unwrap();

        let mut expected = vec![logo.id, chart.id, report.id];
        expected.sort();
        assert_eq!(s.usage_of(page.id), expected);
    }

    #[test]
    fn test_copy_clones_folder_and_usage() {
        let s = site(MediaSyncConfig::default());
        let logo = s.upload("logo.png", None);
        let home = s.host.create(NodeDraft::new("Home", None, "page")).unwrap();
        let page = s
            .host
            .create(NodeDraft::new("Page", Some(home.id), "page").with_field("logo", "MediaPicker", logo.id.to_string()))
            .unwrap();

        let folder = s.folder_of(page.id).unwrap();
        s.media
            .insert(s.media.create_item("Empty", Some(folder.id), FOLDER_TYPE).unwrap())
            .unwrap();
        let photos = s
            .media
            .insert(s.media.create_item("Photos", Some(folder.id), FOLDER_TYPE).unwrap())
            .unwrap();
        for name in ["1.jpg", "2.jpg", "3.jpg"] {
            s.upload(name, Some(photos.id));
        }

        let copy = s.host.copy(page.id, Some(home.id)).unwrap();

        let copied_folder = s.folder_of(copy.id).unwrap();
        assert_ne!(copied_folder.id, folder.id);
        assert_eq!(copied_folder.name, "Page");
        assert_eq!(copied_folder.parent_id, s.folder_of(home.id).map(|f| f.id));

        let mut names: Vec<String> = s
            .media
            .descendants(copied_folder.id)
            .unwrap()
            .into_iter()
            .map(|n| n.name)
            .collect();
        names.sort();
        assert_eq!(names, vec!["1.jpg", "2.jpg", "3.jpg", "Empty", "Photos"]);

        let copied_file = s
            .media
            .descendants(copied_folder.id)
            .unwrap()
            .into_iter()
            .find(|n| n.name == "1.jpg")
            .unwrap();
        let path = copied_file.file_path().unwrap();
        assert_eq!(s.media.read_binary(path).unwrap().unwrap(), b"1.jpg".to_vec());

        assert_eq!(s.usage_of(copy.id), vec![logo.id]);
        assert_eq!(s.usage_of(page.id), vec![logo.id]);
    }

    #[test]
    fn test_copy_without_files() {
        let mut config = MediaSyncConfig::default();
        config.sync.copy_media_files = false;
        let s = site(config);
        let page = s.host.create(NodeDraft::new("Page", None, "page")).unwrap();
        let folder = s.folder_of(page.id).unwrap();
        let photos = s
            .media
            .insert(s.media.create_item("Photos", Some(folder.id), FOLDER_TYPE).unwrap())
            .unwrap();
        s.upload("1.jpg", Some(photos.id));

        let copy = s.host.copy(page.id, None).unwrap();
        let copied = s.media.descendants(s.folder_of(copy.id).unwrap().id).unwrap();
        assert_eq!(copied.len(), 1);
        assert_eq!(copied[0].name, "Photos");
    }

    fn no_healing() -> MediaSyncConfig {
        let mut config = MediaSyncConfig::default();
        config.sync.check_for_missing_relations = false;
        config
    }

    #[test]
    fn test_move_under_unmirrored_parent_heals_parent() {
        let s = site(MediaSyncConfig::default());
        let a = s.host.create(NodeDraft::new("A", None, "page")).unwrap();
        let child = s.host.create(NodeDraft::new("Child", Some(a.id), "page")).unwrap();
        let legacy = s.content.insert(NodeDraft::new("Legacy", None, "page")).unwrap();
        assert!(s.folder_of(legacy.id).is_none());

        s.host.move_node(child.id, Some(legacy.id)).unwrap();

        let legacy_folder = s.folder_of(legacy.id).unwrap();
        assert_eq!(legacy_folder.name, "Legacy");
        assert_eq!(legacy_folder.parent_id, None);
        assert_eq!(s.folder_of(child.id).unwrap().parent_id, Some(legacy_folder.id));
    }

    #[test]
    fn test_move_under_unmirrored_parent_without_healing() {
        let s = site(no_healing());
        let a = s.host.create(NodeDraft::new("A", None, "page")).unwrap();
        let child = s.host.create(NodeDraft::new("Child", Some(a.id), "page")).unwrap();
        let legacy = s.content.insert(NodeDraft::new("Legacy", None, "page")).unwrap();
        let a_folder = s.folder_of(a.id).unwrap();

        s.host.move_node(child.id, Some(legacy.id)).unwrap();

        assert!(s.folder_of(legacy.id).is_none());
        assert_eq!(s.folder_of(child.id).unwrap().parent_id, Some(a_folder.id));
        assert_eq!(s.media.len().unwrap(), 2);
    }

    #[test]
    fn test_copy_under_unmirrored_parent_heals_parent() {
        let s = site(MediaSyncConfig::default());
        let page = s.host.create(NodeDraft::new("Page", None, "page")).unwrap();
        let legacy = s.content.insert(NodeDraft::new("Legacy", None, "page")).unwrap();

        let copy = s.host.copy(page.id, Some(legacy.id)).unwrap();

        let legacy_folder = s.folder_of(legacy.id).unwrap();
        let copied_folder = s.folder_of(copy.id).unwrap();
        assert_ne!(copied_folder.id, s.folder_of(page.id).unwrap().id);
        assert_eq!(copied_folder.parent_id, Some(legacy_folder.id));
    }

    #[test]
    fn test_copy_under_unmirrored_parent_without_healing() {
        let s = site(no_healing());
        let page = s.host.create(NodeDraft::new("Page", None, "page")).unwrap();
        let legacy = s.content.insert(NodeDraft::new("Legacy", None, "page")).unwrap();

        let copy = s.host.copy(page.id, Some(legacy.id)).unwrap();

        assert!(s.folder_of(legacy.id).is_none());
        assert!(s.folder_of(copy.id).is_none());
        assert_eq!(s.media.len().unwrap(), 1);
    }

    #[test]
    fn test_trash_moves_folder_to_recycle_bin() {
        let s = site(MediaSyncConfig::default());
        let page = s.host.create(NodeDraft::new("Page", None, "page")).unwrap();
        let folder = s.folder_of(page.id).unwrap();

        s.host.trash(page.id).unwrap();

        assert!(s.media.get_by_id(folder.id).unwrap().unwrap().trashed);
        assert_eq!(s.media.recycle_bin().unwrap().len(), 1);
    }

    #[test]
    fn test_trash_with_shared_folder_only_drops_relation() {
        let s = site(MediaSyncConfig::default());
        let first = s.host.create(NodeDraft::new("First", None, "page")).unwrap();
        let second = s.content.insert(NodeDraft::new("Second", None, "page")).unwrap();
        let shared = s.folder_of(first.id).unwrap();
        s.relations
            .relate(second.id, shared.id, RelationKind::StructuralMirror)
            .unwrap();

        s.host.trash(second.id).unwrap();

        let folder = s.media.get_by_id(shared.id).unwrap().unwrap();
        assert!(!folder.trashed);
        assert!(s.folder_of(second.id).is_none());
        assert_eq!(s.folder_of(first.id).unwrap().id, shared.id);
    }

    #[test]
    fn test_trash_keeps_folder_when_delete_disabled() {
        let mut config = MediaSyncConfig::default();
        config.sync.delete_media = false;
        let s = site(config);
        let page = s.host.create(NodeDraft::new("Page", None, "page")).unwrap();

        s.host.trash(page.id).unwrap();
        assert!(!s.folder_of(page.id).unwrap().trashed);
    }

    #[test]
    fn test_delete_removes_folders_and_relations() {
        let s = site(MediaSyncConfig::default());
        let home = s.host.create(NodeDraft::new("Home", None, "page")).unwrap();
        s.host.create(NodeDraft::new("About", Some(home.id), "page")).unwrap();

        let removed = s.host.delete(home.id).unwrap();

        assert_eq!(removed.len(), 2);
        assert!(s.media.is_empty().unwrap());
        assert_eq!(s.relations.count_by_kind(RelationKind::StructuralMirror).unwrap(), 0);
    }

    #[test]
    fn test_empty_recycle_bin_deletes_folders() {
        let s = site(MediaSyncConfig::default());
        let home = s.host.create(NodeDraft::new("Home", None, "page")).unwrap();
        let about = s.host.create(NodeDraft::new("About", Some(home.id), "page")).unwrap();
        let keep = s.host.create(NodeDraft::new("Keep", None, "page")).unwrap();

        s.host.trash(home.id).unwrap();
        let removed = s.host.empty_recycle_bin().unwrap();

        assert_eq!(removed.len(), 2);
        assert!(s.folder_of(home.id).is_none());
        assert!(s.folder_of(about.id).is_none());
        assert_eq!(s.media.len().unwrap(), 1);
        assert!(s.folder_of(keep.id).is_some());
    }
}
