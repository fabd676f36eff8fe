//! Structural mirror reconciler
//!
//! Keeps one media folder per content node in step with the content tree:
//! create, rename, two-phase move (with suppression), copy, trash and delete.

use std::sync::Arc;

use super::copy::clone_folder;
use super::folders::MediaFolders;
use super::suppression::SuppressionTokens;
use crate::Result;
use crate::event::{Notification, Observer, SavedNode};
use crate::node::{Node, NodeId};
use crate::relation::RelationKind;
use crate::tree::TreeKind;

pub struct MirrorReconciler {
    folders: MediaFolders,
    suppression: Arc<SuppressionTokens>,
}

impl MirrorReconciler {
    pub fn new(folders: MediaFolders, suppression: Arc<SuppressionTokens>) -> Self {
        Self { folders, suppression }
    }

    pub fn folders(&self) -> &MediaFolders {
        &self.folders
    }

    /// Rename folders of existing nodes whose name differs from the published version
    pub fn on_saving(&self, nodes: &[Node]) -> Result<()> {
        if !self.folders.settings().rename_media {
            return Ok(());
        }

        for node in nodes {
            let Some(published) = self.folders.content().get_published_version(node.id)? else {
                continue;
            };
            if published.name == node.name {
                continue;
            }

            let Some(mirror) = self.folders.mirror_of(node.id)? else {
                tracing::debug!(content = node.id, "renamed node has no media folder");
                continue;
            };
            let Some(mut folder) = self.folders.media().get_by_id(mirror.child_id)? else {
                tracing::warn!(content = node.id, folder = mirror.child_id, "folder relation points at a missing media item");
                continue;
            };

            tracing::info!(content = node.id, folder = folder.id, from = %folder.name, to = %node.name, "renaming media folder");
            folder.name = node.name.clone();
            self.folders.media().save(&folder)?;
        }
        Ok(())
    }

    /// Create folders for new nodes; optionally heal existing ones
    pub fn on_saved(&self, nodes: &[SavedNode]) -> Result<()> {
        for saved in nodes {
            if saved.created {
                if self.folders.settings().sync_node(&saved.node) {
                    self.folders.create_mirror(&saved.node)?;
                } else {
                    tracing::debug!(content = saved.node.id, node_type = %saved.node.type_alias, "node type is not mirrored");
                }
            } else if self.folders.settings().check_for_missing_relations {
                self.folders.ensure_mirror(&saved.node)?;
            }
        }
        Ok(())
    }

    /// Before-phase of a move: remember moves that must not be mirrored
    pub fn on_moving(&self, node: &Node, new_parent_id: Option<NodeId>) -> Result<()> {
        if !self.folders.settings().sync_node(node) {
            tracing::debug!(content = node.id, ?new_parent_id, "suppressing folder move for ignored node");
            self.suppression.suppress(node.id, new_parent_id)?;
        }
        Ok(())
    }

    /// After-phase of a move: move the folder beneath the new parent's folder
    pub fn on_moved(&self, node: &Node) -> Result<()> {
        if self.suppression.consume(node.id, node.parent_id)? {
            tracing::debug!(content = node.id, "folder move suppressed");
            return Ok(());
        }

        let heal = self.folders.settings().check_for_missing_relations;
        let Some(mirror) = self.folders.mirror_of(node.id)? else {
            if heal {
                // Creating it now places it under the new parent directly.
                self.folders.ensure_mirror(node)?;
            } else {
                tracing::debug!(content = node.id, "moved node has no media folder");
            }
            return Ok(());
        };

        let placement = self.folders.placement_for(node.parent_id, heal)?;
        let Some(target) = placement.parent_id() else {
            tracing::debug!(content = node.id, "new parent has no media folder");
            return Ok(());
        };
        if target == Some(mirror.child_id) {
            return Ok(());
        }

        let Some(folder) = self.folders.media().get_by_id(mirror.child_id)? else {
            tracing::warn!(content = node.id, folder = mirror.child_id, "folder relation points at a missing media item");
            return Ok(());
        };
        if folder.parent_id == target {
            return Ok(());
        }

        tracing::info!(content = node.id, folder = folder.id, ?target, "moving media folder");
        self.folders.media().move_to(folder.id, target)
    }

    /// Copy the original's folder (and its contents) for the copy
    pub fn on_copied(&self, original: &Node, copy: &Node) -> Result<()> {
        let settings = self.folders.settings();
        if !settings.sync_node(original) {
            return Ok(());
        }

        if settings.check_for_missing_relations {
            self.folders.ensure_mirror(original)?;
        }

        let Some(source_mirror) = self.folders.mirror_of(original.id)? else {
            tracing::debug!(content = original.id, "copied node has no media folder");
            return Ok(());
        };
        if self.folders.media().get_by_id(source_mirror.child_id)?.is_none() {
            tracing::warn!(content = original.id, folder = source_mirror.child_id, "folder relation points at a missing media item");
            return Ok(());
        }
        if self.folders.mirror_of(copy.id)?.is_some() {
            return Ok(());
        }

        let placement = self
            .folders
            .placement_for(copy.parent_id, settings.check_for_missing_relations)?;
        let Some(dest_parent) = placement.parent_id() else {
            tracing::debug!(content = copy.id, "destination parent has no media folder");
            return Ok(());
        };

        let dest = self.folders.create_folder(&copy.name, dest_parent)?;
        let summary = clone_folder(
            self.folders.media(),
            source_mirror.child_id,
            dest.id,
            settings.copy_media_files,
        )?;

        self.folders
            .relations()
            .ensure_relation_type(&RelationKind::StructuralMirror.definition())?;
        self.folders
            .relations()
            .relate(copy.id, dest.id, RelationKind::StructuralMirror)?;

        if let Some(current) = self.folders.content().get_by_id(copy.id)? {
            self.folders.content().save(&current)?;
        }

        tracing::info!(
            original = original.id,
            copy = copy.id,
            folder = dest.id,
            folders = summary.folders,
            files = summary.files,
            "copied media folder"
        );
        Ok(())
    }

    /// Send the folder to the media recycle bin, unless another content node
    /// also claims it, in which case only this node's relation is removed
    pub fn on_trashed(&self, node: &Node) -> Result<()> {
        let settings = self.folders.settings();
        if !settings.delete_media || !settings.sync_node(node) {
            return Ok(());
        }

        let Some(mirror) = self.folders.mirror_of(node.id)? else {
            return Ok(());
        };

        let owners = self
            .folders
            .relations()
            .get_by_child_and_kind(mirror.child_id, RelationKind::StructuralMirror)?;
        if owners.len() > 1 {
            tracing::warn!(
                content = node.id,
                folder = mirror.child_id,
                owners = owners.len(),
                "media folder is claimed by several content nodes, removing this node's relation instead of trashing it"
            );
            return self.folders.relations().delete(mirror.id);
        }

        if self.folders.media().get_by_id(mirror.child_id)?.is_none() {
            tracing::warn!(content = node.id, folder = mirror.child_id, "folder relation points at a missing media item");
            return Ok(());
        }

        tracing::info!(content = node.id, folder = mirror.child_id, "moving media folder to recycle bin");
        self.folders.media().move_to_recycle_bin(mirror.child_id)
    }

    /// Permanently delete folders of deleted nodes
    pub fn on_deleting(&self, nodes: &[Node]) -> Result<()> {
        if !self.folders.settings().delete_media {
            return Ok(());
        }
        for node in nodes.iter().filter(|n| self.folders.settings().sync_node(n)) {
            self.folders.delete_mirror(node.id)?;
        }
        Ok(())
    }

    /// Permanently delete folders of everything leaving the content recycle bin
    pub fn on_emptying_recycle_bin(&self, ids: &[NodeId], bin: TreeKind) -> Result<()> {
        if !self.folders.settings().delete_media || bin != TreeKind::Content {
            return Ok(());
        }
        for id in ids {
            self.folders.delete_mirror(*id)?;
        }
        Ok(())
    }
}

impl Observer for MirrorReconciler {
    fn notify(&self, notification: &Notification) -> Result<()> {
        match notification {
            Notification::Saving { nodes } => self.on_saving(nodes),
            Notification::Saved { nodes } => self.on_saved(nodes),
            Notification::Moving { node, new_parent_id } => self.on_moving(node, *new_parent_id),
            Notification::Moved { node, .. } => self.on_moved(node),
            Notification::Copied { original, copy } => self.on_copied(original, copy),
            Notification::Trashed { node } => self.on_trashed(node),
            Notification::Deleting { nodes } => self.on_deleting(nodes),
            Notification::EmptyingRecycleBin { ids, bin } => self.on_emptying_recycle_bin(ids, *bin),
        }
    }
}
