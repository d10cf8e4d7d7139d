//! Per-atom message lifecycle
//!
//! A message moves `Unsent -> Sent`, after which every recipient tracks its
//! own `Visible -> Read` progression independently:
//!
//! ```text
//! Unsent --send(t)--> Sent --(t+1)--> Visible(n) --read(t')--> Read(n)
//! ```
//!
//! Records are never deleted. Once every recipient has read a message it is
//! retired, but it stays in the table for the rest of the run.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::LifecycleError;
use crate::identity::{MessageId, NodeId, Tick};

/// Coarse lifecycle state of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageState {
    Unsent,
    Sent,
    Retired,
}

/// Lifecycle record for one physical, single-use transmission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    /// Originating node, set exactly once by the send
    pub from: Option<NodeId>,
    /// Recipients, immutable once sent
    pub to: BTreeSet<NodeId>,
    /// The single tick at which the message was sent
    pub sent_on: Option<Tick>,
    /// Per-recipient read tick
    pub read_on: BTreeMap<NodeId, Tick>,
}

impl Message {
    /// A fresh, unsent record for a pool atom
    pub fn unsent(id: MessageId) -> Self {
        Self {
            id,
            from: None,
            to: BTreeSet::new(),
            sent_on: None,
            read_on: BTreeMap::new(),
        }
    }

    pub fn state(&self) -> MessageState {
        match self.sent_on {
            None => MessageState::Unsent,
            Some(_) if self.is_retired() => MessageState::Retired,
            Some(_) => MessageState::Sent,
        }
    }

    pub fn is_sent(&self) -> bool {
        self.sent_on.is_some()
    }

    /// `Unsent -> Sent`
    pub fn mark_sent(
        &mut self,
        from: NodeId,
        to: BTreeSet<NodeId>,
        tick: Tick,
    ) -> Result<(), LifecycleError> {
        if self.sent_on.is_some() {
            return Err(LifecycleError::AlreadySent(self.id));
        }
        if to.is_empty() {
            return Err(LifecycleError::NoRecipients(self.id));
        }
        self.from = Some(from);
        self.to = to;
        self.sent_on = Some(tick);
        Ok(())
    }

    /// Whether `node` may read this message at `tick`
    ///
    /// True iff it was sent to `node` strictly before `tick` and `node` has
    /// not read it at an earlier tick.
    pub fn is_visible_to(&self, node: NodeId, tick: Tick) -> bool {
        let Some(sent_on) = self.sent_on else {
            return false;
        };
        sent_on < tick
            && self.to.contains(&node)
            && self.read_on.get(&node).is_none_or(|read| *read >= tick)
    }

    pub fn has_read(&self, node: NodeId) -> bool {
        self.read_on.contains_key(&node)
    }

    /// `Visible(node) -> Read(node)`
    pub fn mark_read(&mut self, node: NodeId, tick: Tick) -> Result<(), LifecycleError> {
        if self.has_read(node) {
            return Err(LifecycleError::AlreadyRead {
                message: self.id,
                node,
            });
        }
        if !self.is_visible_to(node, tick) {
            return Err(LifecycleError::NotVisible {
                message: self.id,
                node,
            });
        }
        self.read_on.insert(node, tick);
        Ok(())
    }

    /// Every recipient has read the message
    pub fn is_retired(&self) -> bool {
        self.is_sent() && self.to.iter().all(|n| self.read_on.contains_key(n))
    }

    /// Recipients that have not read the message yet
    pub fn unread_by(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.to
            .iter()
            .copied()
            .filter(|n| !self.read_on.contains_key(n))
    }
}
