//! Expiring suppression tokens shared between the two phases of a move
//!
//! The before-move handler records a token for (node, destination parent);
//! the after-move handler consumes it. A token is removed on first read
//! whether or not it was still live, and stale tokens expire on their own so a
//! lost after-phase cannot wedge later moves of the same node.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::node::NodeId;
use crate::{Error, Result};

type TokenKey = (NodeId, Option<NodeId>);

#[derive(Debug)]
pub struct SuppressionTokens {
    ttl: Duration,
    tokens: Mutex<HashMap<TokenKey, Instant>>,
}

impl SuppressionTokens {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            tokens: Mutex::new(HashMap::new()),
        }
    }

    /// Suppress the mirrored move of `node_id` under `new_parent_id`
    pub fn suppress(&self, node_id: NodeId, new_parent_id: Option<NodeId>) -> Result<()> {
        let now = Instant::now();
        let mut tokens = self.tokens.lock().map_err(|_| Error::LockPoisoned("suppression tokens"))?;
        tokens.retain(|_, expires| *expires > now);
        tokens.insert((node_id, new_parent_id), now + self.ttl);
        Ok(())
    }

    /// Take the token for this move. Returns true if it was still live.
    pub fn consume(&self, node_id: NodeId, new_parent_id: Option<NodeId>) -> Result<bool> {
        let mut tokens = self.tokens.lock().map_err(|_| Error::LockPoisoned("suppression tokens"))?;
        Ok(tokens
            .remove(&(node_id, new_parent_id))
            .is_some_and(|expires| expires > Instant::now()))
    }

    /// Number of outstanding tokens, live or not
    pub fn pending(&self) -> Result<usize> {
        Ok(self.tokens.lock().map_err(|_| Error::LockPoisoned("suppression tokens"))?.len())
    }
}
