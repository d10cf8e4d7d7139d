//! Pluggable per-node decision functions
//!
//! The fabric is mechanically deterministic: every choice about what to
//! read, what to send, and how application state evolves comes from a
//! [`Behavior`] supplied by the host. Behaviors see a read-only view of the
//! previous tick and return a [`Decision`]; the fabric validates and commits
//! it.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::identity::{MessageId, NodeId, Tick};

/// What a node can see of a message in its visible set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisibleMessage {
    pub id: MessageId,
    pub from: NodeId,
    pub sent_on: Tick,
}

/// Read-only input to a decision function
#[derive(Debug)]
pub struct DecisionContext<'a, S> {
    pub node: NodeId,
    pub tick: Tick,
    pub state: &'a S,
    /// Visible messages, oldest send first
    pub visible: &'a [VisibleMessage],
    /// Every node in the fabric, including this one
    pub peers: &'a [NodeId],
}

impl<S> DecisionContext<'_, S> {
    /// All other nodes in the fabric
    pub fn others(&self) -> impl Iterator<Item = NodeId> + '_ {
        let me = self.node;
        self.peers.iter().copied().filter(move |p| *p != me)
    }

    pub fn visible_ids(&self) -> impl Iterator<Item = MessageId> + '_ {
        self.visible.iter().map(|m| m.id)
    }
}

/// A send request produced by a decision function
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutgoingMessage {
    pub to: BTreeSet<NodeId>,
    /// Specific atom to use; `None` lets the pool pick one
    pub atom: Option<MessageId>,
}

impl OutgoingMessage {
    pub fn to(recipient: NodeId) -> Self {
        Self {
            to: BTreeSet::from([recipient]),
            atom: None,
        }
    }

    pub fn broadcast(recipients: impl IntoIterator<Item = NodeId>) -> Self {
        Self {
            to: recipients.into_iter().collect(),
            atom: None,
        }
    }

    /// Ask for a specific atom rather than the next free one
    pub fn pinned(mut self, atom: MessageId) -> Self {
        self.atom = Some(atom);
        self
    }
}

/// Output of a decision function for one tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision<S> {
    /// Messages to consume this tick; must be a subset of the visible set
    pub read: Vec<MessageId>,
    pub send: Vec<OutgoingMessage>,
    pub next_state: S,
}

impl<S> Decision<S> {
    /// Do nothing and move to `next_state`
    pub fn stay(next_state: S) -> Self {
        Self {
            read: Vec::new(),
            send: Vec::new(),
            next_state,
        }
    }

    pub fn reading(mut self, message: MessageId) -> Self {
        self.read.push(message);
        self
    }

    pub fn reading_all(mut self, messages: impl IntoIterator<Item = MessageId>) -> Self {
        self.read.extend(messages);
        self
    }

    pub fn sending(mut self, message: OutgoingMessage) -> Self {
        self.send.push(message);
        self
    }
}

/// A node's decision function
///
/// `decide` takes `&self` so decisions for every node can be computed from
/// the same snapshot without any of them observing another's choice.
pub trait Behavior<S>: Send + Sync {
    fn decide(&self, ctx: &DecisionContext<'_, S>) -> Decision<S>;

    /// How many messages the node still intends to send
    ///
    /// Only used for provisioning checks, never for delivery.
    fn needs_to_send(&self, _node: NodeId, _tick: Tick, _state: &S) -> usize {
        0
    }

    /// Short name used in logs
    fn name(&self) -> &'static str {
        "custom"
    }
}

/// A behavior that never reads or sends
#[derive(Debug, Clone, Copy, Default)]
pub struct Idle;

impl<S: Clone> Behavior<S> for Idle {
    fn decide(&self, ctx: &DecisionContext<'_, S>) -> Decision<S> {
        Decision::stay(ctx.state.clone())
    }

    fn name(&self) -> &'static str {
        "idle"
    }
}
