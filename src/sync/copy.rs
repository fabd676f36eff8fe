//! Subtree copy - clone a media folder's contents under another folder
//!
//! Uses an explicit work stack of (source, destination) pairs rather than
//! recursion. Every created item is persisted before its own children are
//! visited; a failure part way through leaves the already created items in
//! place.

use crate::Result;
use crate::node::{file_base_name, Node, NodeId, FILE_FIELD};
use crate::tree::TreeStore;

/// What a subtree copy produced
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CloneSummary {
    pub folders: usize,
    pub files: usize,
    /// Non-folder items skipped because file copying is off
    pub skipped: usize,
}

/// Clone the children of `source_id` beneath `dest_id`.
///
/// With `copy_files` every item is recreated with the same type and name and
/// binary payloads are copied to a new storage location under the same file
/// name. Without it only folders are recreated, as empty folders.
pub fn clone_folder(
    media: &dyn TreeStore,
    source_id: NodeId,
    dest_id: NodeId,
    copy_files: bool,
) -> Result<CloneSummary> {
    let mut summary = CloneSummary::default();
    let mut work = vec![(source_id, dest_id)];

    while let Some((source, dest)) = work.pop() {
        if !media.has_children(source)? {
            continue;
        }

        for item in media.get_children(source)? {
            // The destination may sit inside the source subtree.
            if item.id == dest_id {
                continue;
            }
            if !copy_files && !item.is_folder() {
                summary.skipped += 1;
                continue;
            }

            let copy = clone_item(media, &item, dest, copy_files)?;
            if copy.is_folder() {
                summary.folders += 1;
            } else {
                summary.files += 1;
            }
            tracing::debug!(source = item.id, copy = copy.id, name = %copy.name, "cloned media item");

            if media.has_children(item.id)? {
                work.push((item.id, copy.id));
            }
        }
    }

    Ok(summary)
}

fn clone_item(media: &dyn TreeStore, item: &Node, dest: NodeId, copy_files: bool) -> Result<Node> {
    let mut draft = media.create_item(&item.name, Some(dest), &item.type_alias)?;

    if copy_files {
        if let Some(path) = item.file_path() {
            match media.read_binary(path)? {
                Some(bytes) => media.set_binary_field(&mut draft, FILE_FIELD, file_base_name(path), &bytes)?,
                None => tracing::warn!(item = item.id, path, "media payload missing, copying item without it"),
            }
        }
    }

    media.insert(draft)
}
