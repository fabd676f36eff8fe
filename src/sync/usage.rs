//! Usage reconciler - content node → referenced media items
//!
//! On every save the set of media ids referenced by the node's fields is
//! diffed against the node's existing `UsageLink` edges: new ids gain an edge,
//! ids no longer referenced lose theirs, and everything else is left alone so
//! surviving edges keep their identity.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::Result;
use crate::config::SyncSettings;
use crate::event::{Notification, Observer};
use crate::extractor::ExtractorRegistry;
use crate::node::{Node, NodeId};
use crate::relation::RelationKind;
use crate::storage::RelationStore;

/// Edges touched by one reconciliation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UsageDiff {
    pub added: Vec<NodeId>,
    pub removed: Vec<NodeId>,
    pub unchanged: usize,
}

pub struct UsageReconciler {
    relations: Arc<dyn RelationStore>,
    extractors: ExtractorRegistry,
    settings: SyncSettings,
}

impl UsageReconciler {
    pub fn new(relations: Arc<dyn RelationStore>, extractors: ExtractorRegistry, settings: SyncSettings) -> Self {
        Self {
            relations,
            extractors,
            settings,
        }
    }

    pub fn extractors(&self) -> &ExtractorRegistry {
        &self.extractors
    }

    /// Bring the node's usage edges in line with its current field values
    pub fn reconcile(&self, node: &Node) -> Result<UsageDiff> {
        let before = self
            .relations
            .get_by_parent_and_kind(node.id, RelationKind::UsageLink)?;
        let current = self.extractors.extract_node(node)?;

        let mut diff = UsageDiff::default();
        let mut linked: BTreeSet<NodeId> = BTreeSet::new();

        for relation in &before {
            if current.contains(&relation.child_id) && linked.insert(relation.child_id) {
                diff.unchanged += 1;
            }
        }

        for media_id in current.difference(&linked) {
            self.relations.relate(node.id, *media_id, RelationKind::UsageLink)?;
            diff.added.push(*media_id);
        }

        for relation in &before {
            if !current.contains(&relation.child_id) {
                self.relations.delete(relation.id)?;
                diff.removed.push(relation.child_id);
            }
        }

        if !diff.added.is_empty() || !diff.removed.is_empty() {
            tracing::info!(content = node.id, added = ?diff.added, removed = ?diff.removed, "updated media usage");
        }
        Ok(diff)
    }

    /// Give the copy the same usage edges as the original
    pub fn copy_usage(&self, original: &Node, copy: &Node) -> Result<usize> {
        let links = self
            .relations
            .get_by_parent_and_kind(original.id, RelationKind::UsageLink)?;
        for link in &links {
            self.relations.relate(copy.id, link.child_id, RelationKind::UsageLink)?;
        }
        if !links.is_empty() {
            tracing::info!(original = original.id, copy = copy.id, links = links.len(), "copied media usage");
        }
        Ok(links.len())
    }

    fn ensure_relation_type(&self) -> Result<()> {
        self.relations
            .ensure_relation_type(&RelationKind::UsageLink.definition())
            .map(|_| ())
    }
}

impl Observer for UsageReconciler {
    fn notify(&self, notification: &Notification) -> Result<()> {
        if !self.settings.move_media_files_still_in_use {
            return Ok(());
        }

        match notification {
            Notification::Saved { nodes } => {
                self.ensure_relation_type()?;
                for saved in nodes {
                    self.reconcile(&saved.node)?;
                }
                Ok(())
            }
            Notification::Copied { original, copy } => {
                self.ensure_relation_type()?;
                self.copy_usage(original, copy).map(|_| ())
            }
            _ => Ok(()),
        }
    }
}
