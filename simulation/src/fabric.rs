//! Discrete-time message fabric
//!
//! Each tick runs in a fixed order:
//!
//! 1. Recompute every node's visible set from the message lifecycle as of
//!    the previous tick
//! 2. Ask every node's behavior for a decision (read-only phase)
//! 3. Validate reads against visible sets and sends against the lifecycle
//! 4. Reserve atoms for all of this tick's sends on a copy of the pool
//! 5. Commit sends, reads and next states, then record the snapshot
//! 6. Advance the clock
//!
//! Steps 1-4 mutate nothing, so a failed tick leaves the fabric exactly as
//! it was before the tick started. A failed tick halts the fabric for good.

use std::collections::{BTreeMap, BTreeSet};

use courier_core::{
    Behavior, Decision, DecisionContext, FabricError, LifecycleError, Message, MessageId,
    MessagePool, NodeId, PoolError, Tick, VisibleMessage,
};
use courier_logging::{NodeContextGuard, spans};
use tracing::{debug, debug_span, info, info_span, trace, warn};

use crate::checker::{self, Property, Verdict};
use crate::node::{Node, NodeSpec};
use crate::trace::{NodeSnapshot, Snapshot, Termination, Trace, TraceMeta, TraceRecorder};

/// Discrete clock driving the fabric
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FabricClock {
    tick: Tick,
}

impl FabricClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// The tick about to run
    pub fn now(&self) -> Tick {
        self.tick
    }

    pub fn advance(&mut self) -> Tick {
        self.tick += 1;
        self.tick
    }
}

/// Result of a bounded run
#[derive(Debug, Clone)]
pub struct RunOutcome<S> {
    pub trace: Trace<S>,
    pub termination: Termination,
}

impl<S> RunOutcome<S> {
    /// The fatal error that halted the run, if any
    pub fn error(&self) -> Option<&FabricError> {
        match &self.termination {
            Termination::Halted(err) => Some(err),
            Termination::HorizonReached { .. } => None,
        }
    }

    pub fn reached_horizon(&self) -> bool {
        matches!(self.termination, Termination::HorizonReached { .. })
    }
}

/// A decision together with the need the node reported before making it
struct PendingDecision<S> {
    node: NodeId,
    needs_to_send: usize,
    decision: Decision<S>,
}

/// The message fabric: nodes, pool, message lifecycle and clock
pub struct Fabric<S> {
    clock: FabricClock,
    pool: MessagePool,
    /// Lifecycle records, created when an atom is sent
    messages: BTreeMap<MessageId, Message>,
    nodes: BTreeMap<NodeId, Node<S>>,
    behaviors: BTreeMap<NodeId, Box<dyn Behavior<S>>>,
    peers: Vec<NodeId>,
    recorder: TraceRecorder<S>,
    halted: Option<FabricError>,
}

impl<S: Clone> Fabric<S> {
    /// Build a fabric over `nodes` with a pool of `initial_pool_size` atoms
    ///
    /// Fails with `InvalidConfig` for a negative (or oversized) pool or for
    /// duplicate node identities.
    pub fn new(
        nodes: impl IntoIterator<Item = NodeSpec<S>>,
        initial_pool_size: i64,
    ) -> Result<Self, FabricError> {
        let pool_size = u32::try_from(initial_pool_size).map_err(|_| FabricError::InvalidConfig {
            reason: format!(
                "pool size must be between 0 and {}, got {initial_pool_size}",
                u32::MAX
            ),
        })?;

        let mut node_map = BTreeMap::new();
        let mut behaviors = BTreeMap::new();
        for spec in nodes {
            if node_map.contains_key(&spec.id) {
                return Err(FabricError::InvalidConfig {
                    reason: format!("duplicate node identity {}", spec.id),
                });
            }
            node_map.insert(spec.id, Node::new(spec.id, spec.initial_state));
            behaviors.insert(spec.id, spec.behavior);
        }

        let peers: Vec<NodeId> = node_map.keys().copied().collect();
        let pool = MessagePool::new(pool_size);
        let recorder = TraceRecorder::new(TraceMeta::new(peers.clone(), pool.capacity()));

        debug!(nodes = peers.len(), pool_size, "Fabric created");

        Ok(Self {
            clock: FabricClock::new(),
            pool,
            messages: BTreeMap::new(),
            nodes: node_map,
            behaviors,
            peers,
            recorder,
            halted: None,
        })
    }

    /// The tick that the next `step` will run
    pub fn tick(&self) -> Tick {
        self.clock.now()
    }

    pub fn pool(&self) -> &MessagePool {
        &self.pool
    }

    pub fn message(&self, id: MessageId) -> Option<&Message> {
        self.messages.get(&id)
    }

    pub fn messages(&self) -> impl Iterator<Item = &Message> {
        self.messages.values()
    }

    pub fn node(&self, id: NodeId) -> Option<&Node<S>> {
        self.nodes.get(&id)
    }

    pub fn node_ids(&self) -> &[NodeId] {
        &self.peers
    }

    /// The trace recorded so far
    pub fn trace(&self) -> &Trace<S> {
        self.recorder.trace()
    }

    /// The fatal error that halted the fabric, if any
    pub fn halt_reason(&self) -> Option<&FabricError> {
        self.halted.as_ref()
    }

    pub fn is_halted(&self) -> bool {
        self.halted.is_some()
    }

    /// Check a property against the trace recorded so far
    pub fn check(&self, property: Property) -> Verdict {
        checker::check(self.recorder.trace(), property)
    }

    /// Advance one tick
    ///
    /// Returns the committed snapshot, or the fatal error that halted the
    /// fabric. Once halted, every further call returns the same error.
    pub fn step(&mut self) -> Result<Snapshot<S>, FabricError> {
        if let Some(err) = &self.halted {
            return Err(err.clone());
        }

        let tick = self.clock.now();
        let span = debug_span!(spans::TICK, tick);
        let _enter = span.enter();
        trace!("=== Tick {} ===", tick);

        match self.try_step(tick) {
            Ok(snapshot) => {
                self.recorder.record(snapshot.clone());
                self.clock.advance();
                Ok(snapshot)
            }
            Err(err) => {
                warn!(
                    kind = %err.kind(),
                    node = ?err.node(),
                    atom = ?err.message(),
                    "Fabric halted at tick {}: {}",
                    tick,
                    err
                );
                self.halted = Some(err.clone());
                self.recorder.set_termination(Termination::Halted(err.clone()));
                self.recorder.set_final_states(self.current_states());
                Err(err)
            }
        }
    }

    /// Run `ticks` more ticks, stopping at the first fatal error
    pub fn run_ticks(&mut self, ticks: u64) -> Result<(), FabricError> {
        for _ in 0..ticks {
            self.step()?;
        }
        Ok(())
    }

    /// Step until `max_ticks` ticks have run or a fatal error halts the fabric
    pub fn run(mut self, max_ticks: u64) -> RunOutcome<S> {
        let span = info_span!(spans::RUN, max_ticks);
        let _enter = span.enter();
        info!(
            nodes = self.peers.len(),
            pool_size = self.pool.capacity(),
            "Starting run"
        );

        let mut halted = self.halted.clone();
        while halted.is_none() && self.clock.now() < max_ticks {
            if let Err(err) = self.step() {
                halted = Some(err);
            }
        }

        let termination = match halted {
            Some(err) => Termination::Halted(err),
            None => Termination::HorizonReached {
                ticks: self.clock.now(),
            },
        };
        info!(
            ticks = self.clock.now(),
            remaining = self.pool.remaining(),
            "Run complete: {:?}",
            termination
        );
        self.finish(termination)
    }

    /// Close the trace without running further
    pub fn finish(mut self, termination: Termination) -> RunOutcome<S> {
        self.recorder.set_final_states(self.current_states());
        self.recorder.set_termination(termination.clone());
        RunOutcome {
            trace: self.recorder.into_trace(),
            termination,
        }
    }

    /// Get a summary of the current state
    pub fn state_summary(&self) -> String {
        let in_flight = self
            .messages
            .values()
            .filter(|m| m.is_sent() && !m.is_retired())
            .count();
        let retired = self.messages.values().filter(|m| m.is_retired()).count();
        format!(
            "Tick {}: {} in flight, {} retired, {} atoms available",
            self.clock.now(),
            in_flight,
            retired,
            self.pool.remaining()
        )
    }

    fn current_states(&self) -> BTreeMap<NodeId, S> {
        self.nodes
            .iter()
            .map(|(id, node)| (*id, node.state.clone()))
            .collect()
    }

    fn try_step(&mut self, tick: Tick) -> Result<Snapshot<S>, FabricError> {
        let visible = self.compute_visible(tick);
        let decisions = self.collect_decisions(tick, &visible);

        let span = debug_span!(spans::COMMIT, tick);
        let _enter = span.enter();

        self.validate_reads(tick, &visible, &decisions)?;
        self.validate_recipients(tick, &decisions)?;

        let available = self.pool.remaining();
        let requested = decisions.iter().map(|d| d.decision.send.len()).sum::<usize>();
        let (pool, fresh) = self.reserve_atoms(tick, &decisions)?;
        self.pool = pool;

        let mut fresh = fresh.into_iter();
        let mut nodes = BTreeMap::new();

        for pending in decisions {
            let PendingDecision {
                node: node_id,
                needs_to_send,
                decision,
            } = pending;

            let mut sent = BTreeMap::new();
            for out in decision.send {
                let atom = match out.atom.or_else(|| fresh.next()) {
                    Some(atom) => atom,
                    None => {
                        return Err(FabricError::PoolExhausted {
                            tick,
                            requested,
                            available,
                        });
                    }
                };
                self.commit_send(tick, node_id, atom, out.to.clone())?;
                sent.insert(atom, out.to);
            }

            let read: BTreeSet<MessageId> = decision.read.into_iter().collect();
            for id in &read {
                self.commit_read(tick, node_id, *id)?;
            }

            let node_visible: BTreeSet<MessageId> = visible
                .get(&node_id)
                .map(|v| v.iter().map(|m| m.id).collect())
                .unwrap_or_default();

            if let Some(node) = self.nodes.get_mut(&node_id) {
                if !sent.is_empty() || !read.is_empty() {
                    debug!(
                        node = %node_id,
                        sent = sent.len(),
                        read = read.len(),
                        "Committed decision"
                    );
                }
                let previous_state = std::mem::replace(&mut node.state, decision.next_state);
                node.visible = node_visible.clone();
                node.read = read.clone();
                node.sent = sent.clone();
                node.needs_to_send = needs_to_send;

                nodes.insert(
                    node_id,
                    NodeSnapshot {
                        state: previous_state,
                        visible: node_visible,
                        read,
                        sent,
                        needs_to_send,
                    },
                );
            }
        }

        Ok(Snapshot {
            tick,
            available,
            nodes,
        })
    }

    /// Visible messages per node, oldest send first
    fn compute_visible(&self, tick: Tick) -> BTreeMap<NodeId, Vec<VisibleMessage>> {
        let mut visible: BTreeMap<NodeId, Vec<VisibleMessage>> =
            self.peers.iter().map(|id| (*id, Vec::new())).collect();

        for msg in self.messages.values() {
            let (Some(from), Some(sent_on)) = (msg.from, msg.sent_on) else {
                continue;
            };
            for recipient in msg.unread_by() {
                if msg.is_visible_to(recipient, tick)
                    && let Some(list) = visible.get_mut(&recipient)
                {
                    list.push(VisibleMessage {
                        id: msg.id,
                        from,
                        sent_on,
                    });
                }
            }
        }

        for list in visible.values_mut() {
            list.sort_by_key(|m| (m.sent_on, m.id));
        }
        visible
    }

    fn collect_decisions(
        &self,
        tick: Tick,
        visible: &BTreeMap<NodeId, Vec<VisibleMessage>>,
    ) -> Vec<PendingDecision<S>> {
        let run_id = self.recorder.trace().meta.run_id;
        let mut decisions = Vec::with_capacity(self.nodes.len());

        for (id, node) in &self.nodes {
            let Some(behavior) = self.behaviors.get(id) else {
                continue;
            };
            let _guard = NodeContextGuard::new(*id, run_id).at_tick(tick);
            let span = debug_span!(spans::DECIDE, node = %id, behavior = behavior.name());
            let _enter = span.enter();

            let node_visible = visible.get(id).map(Vec::as_slice).unwrap_or_default();
            let needs_to_send = behavior.needs_to_send(*id, tick, &node.state);
            let ctx = DecisionContext {
                node: *id,
                tick,
                state: &node.state,
                visible: node_visible,
                peers: &self.peers,
            };
            let decision = behavior.decide(&ctx);
            trace!(
                visible = node_visible.len(),
                read = decision.read.len(),
                send = decision.send.len(),
                needs_to_send,
                "Decided"
            );

            decisions.push(PendingDecision {
                node: *id,
                needs_to_send,
                decision,
            });
        }
        decisions
    }

    fn validate_reads(
        &self,
        tick: Tick,
        visible: &BTreeMap<NodeId, Vec<VisibleMessage>>,
        decisions: &[PendingDecision<S>],
    ) -> Result<(), FabricError> {
        for pending in decisions {
            let node = pending.node;
            let node_visible = visible.get(&node).map(Vec::as_slice).unwrap_or_default();
            let mut seen = BTreeSet::new();

            for id in &pending.decision.read {
                let already_read = self.messages.get(id).is_some_and(|m| m.has_read(node));
                if !seen.insert(*id) || already_read {
                    return Err(FabricError::DoubleRead {
                        tick,
                        node,
                        message: *id,
                    });
                }
                if !node_visible.iter().any(|m| m.id == *id) {
                    return Err(FabricError::InvalidRead {
                        tick,
                        node,
                        message: *id,
                    });
                }
            }
        }
        Ok(())
    }

    fn validate_recipients(
        &self,
        tick: Tick,
        decisions: &[PendingDecision<S>],
    ) -> Result<(), FabricError> {
        for pending in decisions {
            let node = pending.node;
            for out in &pending.decision.send {
                if out.to.is_empty() {
                    return Err(FabricError::InvalidSend {
                        tick,
                        node,
                        reason: "message has no recipients".to_string(),
                    });
                }
                if let Some(unknown) = out.to.iter().find(|r| !self.nodes.contains_key(r)) {
                    return Err(FabricError::InvalidSend {
                        tick,
                        node,
                        reason: format!("unknown recipient {unknown}"),
                    });
                }
            }
        }
        Ok(())
    }

    /// Reserve every atom this tick sends, on a copy of the pool
    ///
    /// Pinned atoms are claimed node by node, in node order, so a rejected
    /// claim names the node that made it. Fresh atoms follow in one request.
    /// The live pool is untouched until the caller adopts the copy.
    fn reserve_atoms(
        &self,
        tick: Tick,
        decisions: &[PendingDecision<S>],
    ) -> Result<(MessagePool, Vec<MessageId>), FabricError> {
        let mut pool = self.pool.clone();
        let available = pool.remaining();
        let mut pinned = 0;
        let mut unpinned = 0;

        for pending in decisions {
            let atoms: Vec<MessageId> =
                pending.decision.send.iter().filter_map(|out| out.atom).collect();
            unpinned += pending.decision.send.len() - atoms.len();
            if atoms.is_empty() {
                continue;
            }
            pinned += atoms.len();
            pool.reserve(&atoms, 0)
                .map_err(|err| claim_error(tick, pending.node, err))?;
        }

        let requested = pinned + unpinned;
        if requested > available {
            return Err(FabricError::PoolExhausted {
                tick,
                requested,
                available,
            });
        }
        let fresh = pool
            .allocate(unpinned)
            .map_err(|_| FabricError::PoolExhausted {
                tick,
                requested,
                available,
            })?;
        Ok((pool, fresh))
    }

    fn commit_send(
        &mut self,
        tick: Tick,
        node: NodeId,
        atom: MessageId,
        to: BTreeSet<NodeId>,
    ) -> Result<(), FabricError> {
        let msg = self
            .messages
            .entry(atom)
            .or_insert_with(|| Message::unsent(atom));
        msg.mark_sent(node, to, tick)
            .map_err(|err| lifecycle_error(tick, node, err))?;
        trace!(node = %node, message = %atom, "Sent");
        Ok(())
    }

    fn commit_read(&mut self, tick: Tick, node: NodeId, id: MessageId) -> Result<(), FabricError> {
        let msg = self
            .messages
            .get_mut(&id)
            .ok_or(FabricError::InvalidRead {
                tick,
                node,
                message: id,
            })?;
        msg.mark_read(node, tick)
            .map_err(|err| lifecycle_error(tick, node, err))?;
        trace!(node = %node, message = %id, "Read");
        Ok(())
    }
}

impl<S> std::fmt::Debug for Fabric<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fabric")
            .field("tick", &self.clock.now())
            .field("nodes", &self.peers)
            .field("available", &self.pool.remaining())
            .field("halted", &self.halted)
            .finish()
    }
}

/// Map a rejected pinned claim made by `node`
fn claim_error(tick: Tick, node: NodeId, err: PoolError) -> FabricError {
    match err {
        PoolError::Exhausted {
            requested,
            available,
        } => FabricError::PoolExhausted {
            tick,
            requested,
            available,
        },
        PoolError::AlreadyConsumed(atom) | PoolError::DuplicateClaim(atom) => {
            FabricError::DoubleSend {
                tick,
                node,
                message: atom,
            }
        }
        PoolError::UnknownAtom(atom) => FabricError::InvalidSend {
            tick,
            node,
            reason: format!("atom {atom} is not part of the pool"),
        },
    }
}

fn lifecycle_error(tick: Tick, node: NodeId, err: LifecycleError) -> FabricError {
    match err {
        LifecycleError::AlreadySent(message) => FabricError::DoubleSend {
            tick,
            node,
            message,
        },
        LifecycleError::AlreadyRead { message, .. } => FabricError::DoubleRead {
            tick,
            node,
            message,
        },
        LifecycleError::NotVisible { message, .. } => FabricError::InvalidRead {
            tick,
            node,
            message,
        },
        LifecycleError::NoRecipients(_) => FabricError::InvalidSend {
            tick,
            node,
            reason: "message has no recipients".to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::behaviors::{ScriptedBehavior, ScriptedStep};
    use courier_core::{Idle, OutgoingMessage};

    fn scripted(steps: Vec<(Tick, ScriptedStep)>) -> ScriptedBehavior {
        ScriptedBehavior::new(steps)
    }

    #[test]
    fn test_clock_advances() {
        let mut clock = FabricClock::new();
        assert_eq!(clock.now(), 0);
        assert_eq!(clock.advance(), 1);
        assert_eq!(clock.now(), 1);
    }

    #[test]
    fn test_rejects_negative_pool() {
        let err = Fabric::<()>::new([NodeSpec::idle(NodeId('A'))], -1).unwrap_err();
        assert!(matches!(err, FabricError::InvalidConfig { .. }));
    }

    #[test]
    fn test_rejects_duplicate_nodes() {
        let err = Fabric::<()>::new(
            [NodeSpec::idle(NodeId('A')), NodeSpec::idle(NodeId('A'))],
            3,
        )
        .unwrap_err();
        match err {
            FabricError::InvalidConfig { reason } => assert!(reason.contains('A')),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_message_visible_one_tick_after_send() {
        let sender = scripted(vec![(0, ScriptedStep::new().send(OutgoingMessage::to(NodeId('B'))))]);
        let mut fabric = Fabric::new(
            [
                NodeSpec::new(NodeId('A'), (), sender),
                NodeSpec::new(NodeId('B'), (), Idle),
            ],
            2,
        )
        .unwrap();

        let first = fabric.step().unwrap();
        assert_eq!(first.nodes[&NodeId('A')].sent.len(), 1);
        assert!(first.nodes[&NodeId('B')].visible.is_empty());
        assert_eq!(first.available, 2);

        let second = fabric.step().unwrap();
        assert!(second.nodes[&NodeId('B')].visible.contains(&MessageId(0)));
        assert_eq!(second.available, 1);
        assert_eq!(fabric.message(MessageId(0)).unwrap().sent_on, Some(0));
    }

    #[test]
    fn test_failed_tick_changes_nothing_and_halts() {
        let greedy = scripted(vec![(
            0,
            ScriptedStep::new()
                .send(OutgoingMessage::to(NodeId('B')))
                .send(OutgoingMessage::to(NodeId('B'))),
        )]);
        let mut fabric = Fabric::new(
            [
                NodeSpec::new(NodeId('A'), (), greedy),
                NodeSpec::new(NodeId('B'), (), Idle),
            ],
            1,
        )
        .unwrap();

        let err = fabric.step().unwrap_err();
        assert_eq!(
            err,
            FabricError::PoolExhausted {
                tick: 0,
                requested: 2,
                available: 1
            }
        );
        assert_eq!(fabric.pool().remaining(), 1);
        assert!(fabric.messages().all(|m| !m.is_sent()));
        assert_eq!(fabric.tick(), 0);
        assert!(fabric.trace().is_empty());

        // Halted: the same error comes back
        assert_eq!(fabric.step().unwrap_err(), err);
    }

    #[test]
    fn test_same_atom_pinned_by_two_nodes_is_double_send() {
        let pin = |to| {
            scripted(vec![(
                0,
                ScriptedStep::new().send(OutgoingMessage::to(NodeId(to)).pinned(MessageId(0))),
            )])
        };
        let mut fabric = Fabric::new(
            [
                NodeSpec::new(NodeId('A'), (), pin('C')),
                NodeSpec::new(NodeId('B'), (), pin('C')),
                NodeSpec::new(NodeId('C'), (), Idle),
            ],
            4,
        )
        .unwrap();

        let err = fabric.step().unwrap_err();
        assert_eq!(
            err,
            FabricError::DoubleSend {
                tick: 0,
                node: NodeId('B'),
                message: MessageId(0)
            }
        );
    }

    #[test]
    fn test_atom_pinned_twice_by_one_node_names_it() {
        let twice = scripted(vec![(
            0,
            ScriptedStep::new()
                .send(OutgoingMessage::to(NodeId('B')).pinned(MessageId(1)))
                .send(OutgoingMessage::to(NodeId('B')).pinned(MessageId(1))),
        )]);
        let mut fabric = Fabric::new(
            [
                NodeSpec::new(NodeId('A'), (), Idle),
                NodeSpec::new(NodeId('B'), (), Idle),
                NodeSpec::new(NodeId('C'), (), twice),
            ],
            3,
        )
        .unwrap();

        assert_eq!(
            fabric.step().unwrap_err(),
            FabricError::DoubleSend {
                tick: 0,
                node: NodeId('C'),
                message: MessageId(1)
            }
        );
        assert_eq!(fabric.pool().remaining(), 3);
    }

    #[test]
    fn test_huge_pool_costs_only_what_is_sent() {
        let sender = scripted(vec![(0, ScriptedStep::new().send(OutgoingMessage::to(NodeId('B'))))]);
        let mut fabric = Fabric::new(
            [
                NodeSpec::new(NodeId('A'), (), sender),
                NodeSpec::new(NodeId('B'), (), Idle),
            ],
            i64::from(u32::MAX),
        )
        .unwrap();
        assert_eq!(fabric.messages().count(), 0);

        fabric.run_ticks(20).unwrap();
        assert_eq!(fabric.messages().count(), 1);
        assert_eq!(fabric.pool().remaining(), u32::MAX as usize - 1);
        assert!(fabric.node(NodeId('B')).unwrap().visible.contains(&MessageId(0)));
    }

    #[test]
    fn test_send_to_unknown_node_rejected() {
        let stray = scripted(vec![(0, ScriptedStep::new().send(OutgoingMessage::to(NodeId('Z'))))]);
        let mut fabric = Fabric::new([NodeSpec::new(NodeId('A'), (), stray)], 1).unwrap();

        let err = fabric.step().unwrap_err();
        assert!(matches!(err, FabricError::InvalidSend { node: NodeId('A'), .. }));
    }

    #[test]
    fn test_run_stops_at_horizon() {
        let fabric = Fabric::<()>::new(
            [NodeSpec::idle(NodeId('A')), NodeSpec::idle(NodeId('B'))],
            0,
        )
        .unwrap();

        let outcome = fabric.run(5);
        assert!(outcome.reached_horizon());
        assert_eq!(outcome.trace.len(), 5);
        assert_eq!(outcome.trace.horizon(), Some(4));
        assert_eq!(outcome.trace.final_states.len(), 2);
    }

    #[test]
    fn test_state_summary() {
        let fabric = Fabric::<()>::new([NodeSpec::idle(NodeId('A'))], 3).unwrap();
        assert_eq!(
            fabric.state_summary(),
            "Tick 0: 0 in flight, 0 retired, 3 atoms available"
        );
    }
}
