//! Built-in decision functions
//!
//! All of them are pure in `&self`: any randomness is derived from a seed
//! plus the node and tick, so the same snapshot always yields the same
//! decision.

use std::collections::BTreeMap;

use courier_core::{Behavior, Decision, DecisionContext, MessageId, NodeId, OutgoingMessage, Tick};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// What a scripted node does at one tick
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScriptedStep {
    pub read: Vec<MessageId>,
    pub send: Vec<OutgoingMessage>,
    /// Read everything visible, oldest send first, after the explicit reads
    pub read_visible: bool,
}

impl ScriptedStep {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn read(mut self, message: MessageId) -> Self {
        self.read.push(message);
        self
    }

    pub fn read_visible(mut self) -> Self {
        self.read_visible = true;
        self
    }

    pub fn send(mut self, message: OutgoingMessage) -> Self {
        self.send.push(message);
        self
    }
}

/// Replays a fixed per-tick script; the node's state is carried unchanged
///
/// Unless overridden, `needs_to_send` is the number of scripted sends at or
/// after the current tick.
#[derive(Debug, Clone, Default)]
pub struct ScriptedBehavior {
    script: BTreeMap<Tick, ScriptedStep>,
    needs: Option<usize>,
}

impl ScriptedBehavior {
    pub fn new(steps: impl IntoIterator<Item = (Tick, ScriptedStep)>) -> Self {
        let mut script: BTreeMap<Tick, ScriptedStep> = BTreeMap::new();
        for (tick, step) in steps {
            let entry = script.entry(tick).or_default();
            entry.read.extend(step.read);
            entry.send.extend(step.send);
            entry.read_visible |= step.read_visible;
        }
        Self {
            script,
            needs: None,
        }
    }

    /// Report a fixed send need at every tick
    pub fn with_needs(mut self, needs: usize) -> Self {
        self.needs = Some(needs);
        self
    }
}

impl<S: Clone> Behavior<S> for ScriptedBehavior {
    fn decide(&self, ctx: &DecisionContext<'_, S>) -> Decision<S> {
        let mut decision = Decision::stay(ctx.state.clone());
        let Some(step) = self.script.get(&ctx.tick) else {
            return decision;
        };

        decision.read.extend(step.read.iter().copied());
        if step.read_visible {
            decision
                .read
                .extend(ctx.visible_ids().filter(|id| !step.read.contains(id)));
        }
        decision.send.extend(step.send.iter().cloned());
        decision
    }

    fn needs_to_send(&self, _node: NodeId, tick: Tick, _state: &S) -> usize {
        self.needs.unwrap_or_else(|| {
            self.script
                .range(tick..)
                .map(|(_, step)| step.send.len())
                .sum()
        })
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

/// Node state used by the quota-driven behaviors
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaState {
    /// Messages the node still intends to send
    pub quota: usize,
    pub sent: usize,
    pub received: usize,
}

impl QuotaState {
    pub fn with_quota(quota: usize) -> Self {
        Self {
            quota,
            ..Default::default()
        }
    }
}

/// Reads everything visible in send order and sends one message per tick
/// until its quota is spent
#[derive(Debug, Clone, Default)]
pub struct InOrderReader {
    broadcast: bool,
}

impl InOrderReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Address every peer instead of rotating through them
    pub fn broadcasting() -> Self {
        Self { broadcast: true }
    }
}

impl Behavior<QuotaState> for InOrderReader {
    fn decide(&self, ctx: &DecisionContext<'_, QuotaState>) -> Decision<QuotaState> {
        let mut next = *ctx.state;
        next.received += ctx.visible.len();

        let mut decision = Decision::stay(next).reading_all(ctx.visible_ids());

        let others: Vec<NodeId> = ctx.others().collect();
        if ctx.state.quota > 0 && !others.is_empty() {
            let out = if self.broadcast {
                OutgoingMessage::broadcast(others)
            } else {
                OutgoingMessage::to(others[ctx.state.sent % others.len()])
            };
            decision = decision.sending(out);
            decision.next_state.quota -= 1;
            decision.next_state.sent += 1;
        }
        decision
    }

    fn needs_to_send(&self, _node: NodeId, _tick: Tick, state: &QuotaState) -> usize {
        state.quota
    }

    fn name(&self) -> &'static str {
        "in-order"
    }
}

/// Seeded random policy: reads a random subset of what it sees and sends to
/// random peers while its quota lasts
///
/// Skipped reads stay visible, so later ticks may read them after newer
/// messages, producing reordering; a message skipped until the horizon
/// shows up as an unproven delivery.
#[derive(Debug, Clone)]
pub struct RandomBehavior {
    seed: u64,
    send_probability: f64,
    read_probability: f64,
    broadcast: bool,
}

impl RandomBehavior {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            send_probability: 0.5,
            read_probability: 0.5,
            broadcast: false,
        }
    }

    /// Clamped into `[0, 1]`; NaN means never
    pub fn with_send_probability(mut self, p: f64) -> Self {
        self.send_probability = probability(p);
        self
    }

    pub fn with_read_probability(mut self, p: f64) -> Self {
        self.read_probability = probability(p);
        self
    }

    pub fn with_broadcast(mut self, broadcast: bool) -> Self {
        self.broadcast = broadcast;
        self
    }

    fn rng_for(&self, node: NodeId, tick: Tick) -> StdRng {
        let node_bits = u64::from(u32::from(node.as_char())) << 40;
        StdRng::seed_from_u64(self.seed ^ node_bits ^ tick)
    }
}

fn probability(p: f64) -> f64 {
    if p.is_nan() { 0.0 } else { p.clamp(0.0, 1.0) }
}

impl Behavior<QuotaState> for RandomBehavior {
    fn decide(&self, ctx: &DecisionContext<'_, QuotaState>) -> Decision<QuotaState> {
        let mut rng = self.rng_for(ctx.node, ctx.tick);

        let read: Vec<MessageId> = ctx
            .visible_ids()
            .filter(|_| rng.random_bool(self.read_probability))
            .collect();

        let mut next = *ctx.state;
        next.received += read.len();
        let mut decision = Decision::stay(next).reading_all(read);

        let others: Vec<NodeId> = ctx.others().collect();
        if ctx.state.quota > 0 && !others.is_empty() && rng.random_bool(self.send_probability) {
            let out = if self.broadcast {
                OutgoingMessage::broadcast(others)
            } else {
                OutgoingMessage::to(others[rng.random_range(0..others.len())])
            };
            decision = decision.sending(out);
            decision.next_state.quota -= 1;
            decision.next_state.sent += 1;
        }
        decision
    }

    fn needs_to_send(&self, _node: NodeId, _tick: Tick, state: &QuotaState) -> usize {
        state.quota
    }

    fn name(&self) -> &'static str {
        "random"
    }
}
