//! Per-participant node state

use std::collections::{BTreeMap, BTreeSet};

use courier_core::{Behavior, MessageId, NodeId};

/// A participant in the fabric
///
/// `state` belongs to the node and only changes through its own decision
/// function. `visible` is recomputed by the fabric at the start of every tick;
/// `read` and `sent` describe what happened during the most recent tick.
#[derive(Debug, Clone)]
pub struct Node<S> {
    pub id: NodeId,
    pub state: S,
    pub visible: BTreeSet<MessageId>,
    pub read: BTreeSet<MessageId>,
    /// Atoms sent during the most recent tick, with their recipients
    pub sent: BTreeMap<MessageId, BTreeSet<NodeId>>,
    pub needs_to_send: usize,
}

impl<S> Node<S> {
    pub fn new(id: NodeId, state: S) -> Self {
        Self {
            id,
            state,
            visible: BTreeSet::new(),
            read: BTreeSet::new(),
            sent: BTreeMap::new(),
            needs_to_send: 0,
        }
    }
}

/// Everything needed to add one node to a fabric
pub struct NodeSpec<S> {
    pub id: NodeId,
    pub initial_state: S,
    pub behavior: Box<dyn Behavior<S>>,
}

impl<S> NodeSpec<S> {
    pub fn new(id: NodeId, initial_state: S, behavior: impl Behavior<S> + 'static) -> Self {
        Self {
            id,
            initial_state,
            behavior: Box::new(behavior),
        }
    }
}

impl<S: Default + Clone + 'static> NodeSpec<S> {
    /// A node with default state that never reads or sends
    pub fn idle(id: NodeId) -> Self {
        Self::new(id, S::default(), courier_core::Idle)
    }
}

impl<S> std::fmt::Debug for NodeSpec<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeSpec")
            .field("id", &self.id)
            .field("behavior", &self.behavior.name())
            .finish()
    }
}
