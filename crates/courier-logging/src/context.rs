//! Node context injection for per-node logging
//!
//! The scheduler evaluates one node's decision function at a time. While it
//! does, a [`NodeContextGuard`] records which node (and which tick) is active
//! in thread-local storage so [`crate::layers::NodeContextLayer`] can attach
//! it to every span opened in that scope.

use std::cell::RefCell;

use courier_core::{NodeId, Tick};
use uuid::Uuid;

/// Node context data stored in thread-local storage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeContextData {
    /// The node's identity as a string
    pub node_id: String,
    /// Tick being evaluated, if known
    pub tick: Option<Tick>,
    /// Unique id of the simulation run this node belongs to
    pub run_id: Uuid,
}

thread_local! {
    static NODE_CONTEXT: RefCell<Option<NodeContextData>> = const { RefCell::new(None) };
}

/// RAII guard for node context
///
/// When this guard is created, it sets the node context for the current thread.
/// When it's dropped, it restores the previous context (if any).
///
/// # Example
///
/// ```ignore
/// use courier_core::NodeId;
/// use courier_logging::context::NodeContextGuard;
///
/// let _guard = NodeContextGuard::new(NodeId('A'), run_id).at_tick(3);
///
/// // Spans opened in this scope carry node_id = "A"
/// tracing::debug!("Deciding");
/// ```
pub struct NodeContextGuard {
    previous: Option<NodeContextData>,
}

impl NodeContextGuard {
    /// Set `node` as the active node for the current thread
    pub fn new(node: NodeId, run_id: Uuid) -> Self {
        let previous = NODE_CONTEXT.with(|ctx| ctx.borrow().clone());

        let new_ctx = NodeContextData {
            node_id: node.to_string(),
            tick: None,
            run_id,
        };
        NODE_CONTEXT.with(|ctx| *ctx.borrow_mut() = Some(new_ctx));

        Self { previous }
    }

    /// Record the tick being evaluated in the active context
    pub fn at_tick(self, tick: Tick) -> Self {
        NODE_CONTEXT.with(|ctx| {
            if let Some(data) = ctx.borrow_mut().as_mut() {
                data.tick = Some(tick);
            }
        });
        self
    }

    /// Get the current node context (if any)
    pub fn current() -> Option<NodeContextData> {
        NODE_CONTEXT.with(|ctx| ctx.borrow().clone())
    }

    /// Get the current node ID (if set)
    pub fn current_node_id() -> Option<String> {
        Self::current().map(|ctx| ctx.node_id)
    }
}

impl Drop for NodeContextGuard {
    fn drop(&mut self) {
        NODE_CONTEXT.with(|ctx| *ctx.borrow_mut() = self.previous.take());
    }
}

/// Convenience macro to create a node context scope
///
/// # Example
///
/// ```ignore
/// with_node_context!(NodeId('A'), run_id, {
///     tracing::info!("Deciding");
/// });
/// ```
#[macro_export]
macro_rules! with_node_context {
    ($node:expr, $run_id:expr, $body:block) => {{
        let _guard = $crate::context::NodeContextGuard::new($node, $run_id);
        $body
    }};
}
