//! Synchronization core
//!
//! - `folders`: resolve/create/delete a content node's mirrored media folder
//! - `mirror`: structural mirror reconciler (create, rename, move, copy, trash, delete)
//! - `usage`: usage reconciler (content node → referenced media items)
//! - `copy`: subtree clone used when content is copied
//! - `suppression`: expiring tokens linking the two phases of a move

pub mod copy;
pub mod folders;
pub mod mirror;
pub mod suppression;
pub mod usage;

pub use copy::{clone_folder, CloneSummary};
pub use folders::{FolderPlacement, MediaFolders};
pub use mirror::MirrorReconciler;
pub use suppression::SuppressionTokens;
pub use usage::{UsageDiff, UsageReconciler};
