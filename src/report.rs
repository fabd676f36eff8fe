//! Relation reports
//!
//! - [`Auditor`]: finds inconsistent relation data (duplicate mirrors, folders
//!   claimed by several nodes, edges whose endpoints no longer exist)
//! - [`media_usage`]: which content nodes reference a media item

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::Result;
use crate::node::NodeId;
use crate::relation::{Relation, RelationKind};
use crate::storage::RelationStore;
use crate::tree::{TreeKind, TreeStore};

/// A content node with more than one folder relation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateMirror {
    pub content_id: NodeId,
    pub folder_ids: Vec<NodeId>,
}

/// A media folder claimed by more than one content node
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SharedFolder {
    pub folder_id: NodeId,
    pub content_ids: Vec<NodeId>,
}

/// An edge with an endpoint missing from its tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrphanRelation {
    pub relation: Relation,
    pub missing: TreeKind,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct AuditReport {
    pub duplicate_mirrors: Vec<DuplicateMirror>,
    pub shared_folders: Vec<SharedFolder>,
    pub orphans: Vec<OrphanRelation>,
}

impl AuditReport {
    pub fn is_clean(&self) -> bool {
        self.duplicate_mirrors.is_empty() && self.shared_folders.is_empty() && self.orphans.is_empty()
    }
}

/// Relation consistency checks
pub struct Auditor<'a> {
    relations: &'a dyn RelationStore,
    trees: Option<(&'a dyn TreeStore, &'a dyn TreeStore)>,
}

impl<'a> Auditor<'a> {
    pub fn new(relations: &'a dyn RelationStore) -> Self {
        Self { relations, trees: None }
    }

    /// Also check edge endpoints against the content and media trees
    pub fn with_trees(mut self, content: &'a dyn TreeStore, media: &'a dyn TreeStore) -> Self {
        self.trees = Some((content, media));
        self
    }

    pub fn run(&self) -> Result<AuditReport> {
        let mirrors = self.relations.get_by_kind(RelationKind::StructuralMirror)?;

        let mut by_content: BTreeMap<NodeId, Vec<NodeId>> = BTreeMap::new();
        let mut by_folder: BTreeMap<NodeId, Vec<NodeId>> = BTreeMap::new();
        for mirror in &mirrors {
            by_content.entry(mirror.parent_id).or_default().push(mirror.child_id);
            by_folder.entry(mirror.child_id).or_default().push(mirror.parent_id);
        }

        let mut report = AuditReport {
            duplicate_mirrors: by_content
                .into_iter()
                .filter(|(_, folders)| folders.len() > 1)
                .map(|(content_id, folder_ids)| DuplicateMirror { content_id, folder_ids })
                .collect(),
            shared_folders: by_folder
                .into_iter()
                .filter(|(_, owners)| owners.len() > 1)
                .map(|(folder_id, content_ids)| SharedFolder { folder_id, content_ids })
                .collect(),
            orphans: Vec::new(),
        };

        if let Some((content, media)) = self.trees {
            let mut edges = mirrors;
            edges.extend(self.relations.get_by_kind(RelationKind::UsageLink)?);
            for relation in edges {
                let missing = if content.get_by_id(relation.parent_id)?.is_none() {
                    Some(TreeKind::Content)
                } else if media.get_by_id(relation.child_id)?.is_none() {
                    Some(TreeKind::Media)
                } else {
                    None
                };
                if let Some(missing) = missing {
                    report.orphans.push(OrphanRelation { relation, missing });
                }
            }
        }

        if !report.is_clean() {
            tracing::warn!(
                duplicates = report.duplicate_mirrors.len(),
                shared = report.shared_folders.len(),
                orphans = report.orphans.len(),
                "relation audit found problems"
            );
        }
        Ok(report)
    }
}

/// A content node that references a media item
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContentNode {
    pub id: NodeId,
    pub published: bool,
    pub trashed: bool,
    pub name: String,
    /// Ancestor ids from the root down to the node, comma-separated
    pub path: String,
    /// Ancestor names from the root down to the node, joined with " > "
    pub path_name: String,
}

/// Content nodes holding a usage link to `media_id`, ordered by id.
/// Links from nodes that no longer exist are skipped.
pub fn media_usage(
    relations: &dyn RelationStore,
    content: &dyn TreeStore,
    media_id: NodeId,
) -> Result<Vec<ContentNode>> {
    let users: BTreeSet<NodeId> = relations
        .get_by_child_and_kind(media_id, RelationKind::UsageLink)?
        .into_iter()
        .map(|r| r.parent_id)
        .collect();

    let mut nodes = Vec::new();
    for id in users {
        let Some(node) = content.get_by_id(id)? else {
            tracing::debug!(content = id, media = media_id, "usage link from missing content node");
            continue;
        };
        let chain = content.ancestry(id)?;
        nodes.push(ContentNode {
            id: node.id,
            published: node.published,
            trashed: node.trashed,
            name: node.name,
            path: chain.iter().map(|n| n.id.to_string()).collect::<Vec<_>>().join(","),
            path_name: chain.iter().map(|n| n.name.as_str()).collect::<Vec<_>>().join(" > "),
        });
    }
    Ok(nodes)
}
