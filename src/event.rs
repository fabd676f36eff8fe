//! Lifecycle notifications and observer dispatch
//!
//! Tree operations raise one [`Notification`] before and/or after they run.
//! Observers are registered explicitly on a [`Dispatcher`]; each notification
//! is handled synchronously, to completion, before the operation returns.

use crate::Result;
use crate::node::{Node, NodeId};
use crate::tree::TreeKind;

/// A node announced by a `Saved` notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedNode {
    pub node: Node,
    /// True when this save gave the node its identity
    pub created: bool,
}

/// Lifecycle notification raised by the content host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// Existing nodes about to be updated. New nodes have no identity yet and
    /// are only announced by `Saved`.
    Saving { nodes: Vec<Node> },
    /// Nodes that have been persisted
    Saved { nodes: Vec<SavedNode> },
    /// A node is about to move; `node` still carries its old parent
    Moving { node: Node, new_parent_id: Option<NodeId> },
    /// A node has moved; `node` carries its new parent
    Moved { node: Node, old_parent_id: Option<NodeId> },
    /// `copy` was created from `original`
    Copied { original: Node, copy: Node },
    /// A node (and its subtree) went to the recycle bin
    Trashed { node: Node },
    /// Nodes about to be permanently deleted
    Deleting { nodes: Vec<Node> },
    /// A recycle bin is about to be emptied
    EmptyingRecycleBin { ids: Vec<NodeId>, bin: TreeKind },
}

impl Notification {
    /// Short name for logging
    pub fn name(&self) -> &'static str {
        match self {
            Notification::Saving { .. } => "saving",
            Notification::Saved { .. } => "saved",
            Notification::Moving { .. } => "moving",
            Notification::Moved { .. } => "moved",
            Notification::Copied { .. } => "copied",
            Notification::Trashed { .. } => "trashed",
            Notification::Deleting { .. } => "deleting",
            Notification::EmptyingRecycleBin { .. } => "emptying_recycle_bin",
        }
    }
}

/// Something that reacts to lifecycle notifications.
///
/// An error aborts the triggering operation and is returned to its caller.
pub trait Observer: Send + Sync {
    fn notify(&self, notification: &Notification) -> Result<()>;
}

/// Fans notifications out to registered observers in registration order.
#[derive(Default)]
pub struct Dispatcher {
    observers: Vec<Box<dyn Observer>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an observer
    pub fn subscribe(&mut self, observer: impl Observer + 'static) {
        self.observers.push(Box::new(observer));
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    /// Deliver a notification to every observer, stopping at the first error
    pub fn dispatch(&self, notification: &Notification) -> Result<()> {
        tracing::trace!(notification = notification.name(), observers = self.observers.len(), "dispatching");
        for observer in &self.observers {
            observer.notify(notification)?;
        }
        Ok(())
    }
}

impl Observer for Dispatcher {
    fn notify(&self, notification: &Notification) -> Result<()> {
        self.dispatch(notification)
    }
}
