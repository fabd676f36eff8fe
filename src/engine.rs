//! Sync engine - wires the reconcilers to lifecycle notifications
//!
//! `SyncEngine::start` builds the extractor registry, the folder service and
//! both reconcilers from configuration, then registers them on a
//! [`Dispatcher`]. The engine itself is an [`Observer`]: hand it to a host and
//! every notification reaches the structural reconciler first, then the usage
//! reconciler.

use std::sync::Arc;

use crate::Result;
use crate::config::MediaSyncConfig;
use crate::event::{Dispatcher, Notification, Observer};
use crate::extractor::ExtractorRegistry;
use crate::storage::RelationStore;
use crate::sync::{MediaFolders, MirrorReconciler, SuppressionTokens, UsageReconciler};
use crate::tree::TreeStore;

pub struct SyncEngine {
    dispatcher: Dispatcher,
    suppression: Arc<SuppressionTokens>,
    relations: Arc<dyn RelationStore>,
}

impl SyncEngine {
    /// Build both reconcilers and register them as observers
    pub fn start(
        config: &MediaSyncConfig,
        content: Arc<dyn TreeStore>,
        media: Arc<dyn TreeStore>,
        relations: Arc<dyn RelationStore>,
    ) -> Result<Self> {
        let extractors = ExtractorRegistry::from_bindings(&config.extractors, media.clone())?;
        let suppression = Arc::new(SuppressionTokens::new(config.sync.suppression_ttl()));

        let folders = MediaFolders::new(content, media, relations.clone(), config.sync.clone());
        let mirror = MirrorReconciler::new(folders, suppression.clone());
        let usage = UsageReconciler::new(relations.clone(), extractors, config.sync.clone());

        let mut dispatcher = Dispatcher::new();
        dispatcher.subscribe(mirror);
        dispatcher.subscribe(usage);

        tracing::debug!(
            observers = dispatcher.len(),
            ignored_types = ?config.sync.ignore_node_types,
            "sync engine started"
        );

        Ok(Self {
            dispatcher,
            suppression,
            relations,
        })
    }

    /// Deliver one notification to both reconcilers
    pub fn dispatch(&self, notification: &Notification) -> Result<()> {
        self.dispatcher.dispatch(notification)
    }

    pub fn suppression(&self) -> &SuppressionTokens {
        &self.suppression
    }

    pub fn relations(&self) -> &dyn RelationStore {
        self.relations.as_ref()
    }
}

impl Observer for SyncEngine {
    fn notify(&self, notification: &Notification) -> Result<()> {
        self.dispatch(notification)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use crate::node::NodeDraft;
    use crate::relation::RelationKind;
    use crate::storage::SqliteStore;
    use crate::tree::{MemoryTree, TreeKind};

    struct Fixture {
        content: Arc<MemoryTree>,
        media: Arc<MemoryTree>,
        relations: Arc<SqliteStore>,
        engine: SyncEngine,
    }

    fn fixture(config: &MediaSyncConfig) -> Fixture {
        let content = Arc::new(MemoryTree::new(TreeKind::Content));
        let media = Arc::new(MemoryTree::new(TreeKind::Media));
        let relations = Arc::new(SqliteStore::open_in_memory().unwrap());
        let engine = SyncEngine::start(config, content.clone(), media.clone(), relations.clone()).unwrap();
        Fixture { content, media, relations, engine }
    }

    #[test]
    fn test_unknown_extractor_fails_start() {
        let mut config = MediaSyncConfig::default();
        config.extractors.insert("Grid".to_string(), vec!["nope".to_string()]);

        let content = Arc::new(MemoryTree::new(TreeKind::Content));
        let media = Arc::new(MemoryTree::new(TreeKind::Media));
        let relations = Arc::new(SqliteStore::open_in_memory().unwrap());
        let result = SyncEngine::start(&config, content, media, relations);

        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_suppressed_move_round_trip() {
        let mut config = MediaSyncConfig::default();
        config.sync.ignore_node_types = vec!["listing".to_string()];
        let f = fixture(&config);

        let home = f.content.insert(NodeDraft::new("Home", None, "page")).unwrap();
        let other = f.content.insert(NodeDraft::new("Other", None, "page")).unwrap();
        let news = f.content.insert(NodeDraft::new("News", Some(home.id), "listing")).unwrap();

        // Folders for everything, including the now-ignored listing.
        f.relations.ensure_relation_type(&RelationKind::StructuralMirror.definition()).unwrap();
        let mut folder_of = std::collections::HashMap::new();
        for node in [&home, &other, &news] {
            let draft = f.media.create_item(&node.name, None, crate::node::FOLDER_TYPE).unwrap();
            let folder = f.media.insert(draft).unwrap();
            f.relations.relate(node.id, folder.id, RelationKind::StructuralMirror).unwrap();
            folder_of.insert(node.id, folder.id);
        }
        f.media.move_to(folder_of[&news.id], Some(folder_of[&home.id])).unwrap();

        // First move: before-phase sees an ignored node and suppresses the folder move.
        f.engine
            .notify(&Notification::Moving { node: news.clone(), new_parent_id: Some(other.id) })
            .unwrap();
        f.content.move_to(news.id, Some(other.id)).unwrap();
        let moved = f.content.get_by_id(news.id).unwrap().unwrap();
        f.engine
            .notify(&Notification::Moved { node: moved.clone(), old_parent_id: Some(home.id) })
            .unwrap();

        let folder = f.media.get_by_id(folder_of[&news.id]).unwrap().unwrap();
        assert_eq!(folder.parent_id, Some(folder_of[&home.id]));
        assert_eq!(f.engine.suppression().pending().unwrap(), 0);

        // A later after-phase for the same node and destination is not suppressed.
        f.engine
            .notify(&Notification::Moved { node: moved, old_parent_id: Some(home.id) })
            .unwrap();
        let folder = f.media.get_by_id(folder_of[&news.id]).unwrap().unwrap();
        assert_eq!(folder.parent_id, Some(folder_of[&other.id]));
    }
}
