//! Trace recording and persistence
//!
//! A trace is the append-only sequence of per-tick snapshots produced by a
//! run. Each snapshot holds enough to replay every property check without
//! re-running the simulation: node states, the visible/read/sent sets of
//! every node, and the pool's available count at the start of the tick.

use std::collections::{BTreeMap, BTreeSet};
use std::convert::Infallible;
use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use courier_core::{FabricError, Message, MessageId, NodeId, Tick};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tracing::debug;
use uuid::Uuid;

use crate::error::SimError;

/// Bumped whenever the persisted layout changes
pub const TRACE_FORMAT_VERSION: u32 = 2;

/// What one node looked like during one tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSnapshot<S> {
    /// State the node decided from
    pub state: S,
    pub visible: BTreeSet<MessageId>,
    pub read: BTreeSet<MessageId>,
    /// Atoms sent this tick, with their recipients
    pub sent: BTreeMap<MessageId, BTreeSet<NodeId>>,
    pub needs_to_send: usize,
}

/// One committed tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot<S> {
    pub tick: Tick,
    /// Pool available count before this tick's allocation
    pub available: usize,
    pub nodes: BTreeMap<NodeId, NodeSnapshot<S>>,
}

impl<S> Snapshot<S> {
    /// Atoms consumed during this tick
    pub fn allocated(&self) -> BTreeSet<MessageId> {
        self.nodes
            .values()
            .flat_map(|n| n.sent.keys().copied())
            .collect()
    }

    pub fn sent_count(&self) -> usize {
        self.nodes.values().map(|n| n.sent.len()).sum()
    }

    pub fn read_count(&self) -> usize {
        self.nodes.values().map(|n| n.read.len()).sum()
    }

    /// Sum of every node's outstanding send need
    pub fn total_needs(&self) -> usize {
        self.nodes.values().map(|n| n.needs_to_send).sum()
    }
}

/// Why a run stopped
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Termination {
    /// The caller's tick bound was reached
    HorizonReached { ticks: u64 },
    /// A fatal error halted the fabric at its tick
    Halted(FabricError),
}

/// Run metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceMeta {
    pub format_version: u32,
    pub run_id: Uuid,
    pub recorded_at: DateTime<Utc>,
    pub nodes: Vec<NodeId>,
    pub pool_size: usize,
}

impl TraceMeta {
    pub fn new(nodes: Vec<NodeId>, pool_size: usize) -> Self {
        Self {
            format_version: TRACE_FORMAT_VERSION,
            run_id: Uuid::new_v4(),
            recorded_at: Utc::now(),
            nodes,
            pool_size,
        }
    }
}

/// The ordered sequence of per-tick snapshots of one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trace<S> {
    pub meta: TraceMeta,
    pub snapshots: Vec<Snapshot<S>>,
    /// Node states after the last committed tick
    pub final_states: BTreeMap<NodeId, S>,
    pub termination: Option<Termination>,
}

impl<S> Trace<S> {
    pub fn new(meta: TraceMeta) -> Self {
        Self {
            meta,
            snapshots: Vec::new(),
            final_states: BTreeMap::new(),
            termination: None,
        }
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    fn check_version(&self) -> Result<(), SimError> {
        if self.meta.format_version != TRACE_FORMAT_VERSION {
            return Err(SimError::TraceVersion {
                found: self.meta.format_version,
                expected: TRACE_FORMAT_VERSION,
            });
        }
        Ok(())
    }

    /// Last tick covered by the trace
    pub fn horizon(&self) -> Option<Tick> {
        self.snapshots.last().map(|s| s.tick)
    }

    pub fn snapshot(&self, tick: Tick) -> Option<&Snapshot<S>> {
        self.snapshots.iter().find(|s| s.tick == tick)
    }

    /// Pool available count after the last committed tick
    pub fn final_available(&self) -> usize {
        match self.snapshots.last() {
            Some(last) => last.available.saturating_sub(last.sent_count()),
            None => self.meta.pool_size,
        }
    }

    /// Convert every recorded node state, keeping the rest of the trace
    pub fn map_states<T>(self, mut f: impl FnMut(S) -> T) -> Trace<T> {
        match self.try_map_states(|state| Ok::<_, Infallible>(f(state))) {
            Ok(trace) => trace,
            Err(never) => match never {},
        }
    }

    /// Fallible `map_states`; stops at the first state `f` rejects
    pub fn try_map_states<T, E>(
        self,
        mut f: impl FnMut(S) -> Result<T, E>,
    ) -> Result<Trace<T>, E> {
        let mut snapshots = Vec::with_capacity(self.snapshots.len());
        for snapshot in self.snapshots {
            let mut nodes = BTreeMap::new();
            for (id, ns) in snapshot.nodes {
                let NodeSnapshot {
                    state,
                    visible,
                    read,
                    sent,
                    needs_to_send,
                } = ns;
                let node = NodeSnapshot {
                    state: f(state)?,
                    visible,
                    read,
                    sent,
                    needs_to_send,
                };
                nodes.insert(id, node);
            }
            snapshots.push(Snapshot {
                tick: snapshot.tick,
                available: snapshot.available,
                nodes,
            });
        }

        let mut final_states = BTreeMap::new();
        for (id, state) in self.final_states {
            final_states.insert(id, f(state)?);
        }

        Ok(Trace {
            meta: self.meta,
            snapshots,
            final_states,
            termination: self.termination,
        })
    }

    /// Rebuild the message table from the snapshots
    ///
    /// Malformed traces are tolerated: the first send of an atom wins and
    /// the first read per recipient wins. The trace properties report the
    /// duplicates.
    pub fn messages(&self) -> BTreeMap<MessageId, Message> {
        let mut table: BTreeMap<MessageId, Message> = BTreeMap::new();
        for snapshot in &self.snapshots {
            for (node, ns) in &snapshot.nodes {
                for (id, to) in &ns.sent {
                    let msg = table.entry(*id).or_insert_with(|| Message::unsent(*id));
                    if !msg.is_sent() {
                        msg.from = Some(*node);
                        msg.to = to.clone();
                        msg.sent_on = Some(snapshot.tick);
                    }
                }
            }
        }
        for snapshot in &self.snapshots {
            for (node, ns) in &snapshot.nodes {
                for id in &ns.read {
                    let msg = table.entry(*id).or_insert_with(|| Message::unsent(*id));
                    msg.read_on.entry(*node).or_insert(snapshot.tick);
                }
            }
        }
        table
    }
}

impl<S: Serialize> Trace<S> {
    pub fn to_json(&self) -> Result<String, SimError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Compact binary encoding
    ///
    /// Node states are embedded as JSON text, so a binary trace decodes
    /// into any state type that accepts them, `serde_json::Value` included.
    pub fn to_bytes(&self) -> Result<Vec<u8>, SimError> {
        Ok(postcard::to_allocvec(&self.encode_states()?)?)
    }

    fn encode_states(&self) -> Result<Trace<String>, serde_json::Error> {
        let mut snapshots = Vec::with_capacity(self.snapshots.len());
        for snapshot in &self.snapshots {
            let mut nodes = BTreeMap::new();
            for (id, ns) in &snapshot.nodes {
                let node = NodeSnapshot {
                    state: serde_json::to_string(&ns.state)?,
                    visible: ns.visible.clone(),
                    read: ns.read.clone(),
                    sent: ns.sent.clone(),
                    needs_to_send: ns.needs_to_send,
                };
                nodes.insert(*id, node);
            }
            snapshots.push(Snapshot {
                tick: snapshot.tick,
                available: snapshot.available,
                nodes,
            });
        }

        let mut final_states = BTreeMap::new();
        for (id, state) in &self.final_states {
            final_states.insert(*id, serde_json::to_string(state)?);
        }

        Ok(Trace {
            meta: self.meta.clone(),
            snapshots,
            final_states,
            termination: self.termination.clone(),
        })
    }

    /// Write the trace to `path`; `.bin` files use the binary encoding
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), SimError> {
        let path = path.as_ref();
        if is_binary_path(path) {
            fs::write(path, self.to_bytes()?)?;
        } else {
            fs::write(path, self.to_json()?)?;
        }
        debug!(path = %path.display(), ticks = self.len(), "Saved trace");
        Ok(())
    }
}

impl<S: DeserializeOwned> Trace<S> {
    pub fn from_json(json: &str) -> Result<Self, SimError> {
        let trace: Self = serde_json::from_str(json)?;
        trace.check_version()?;
        Ok(trace)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SimError> {
        let encoded: Trace<String> = postcard::from_bytes(bytes)?;
        encoded.check_version()?;
        Ok(encoded.try_map_states(|state| serde_json::from_str(&state))?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, SimError> {
        let path = path.as_ref();
        if is_binary_path(path) {
            Self::from_bytes(&fs::read(path)?)
        } else {
            Self::from_json(&fs::read_to_string(path)?)
        }
    }
}

fn is_binary_path(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "bin")
}

/// Captures snapshots as the fabric commits ticks
#[derive(Debug, Clone)]
pub struct TraceRecorder<S> {
    trace: Trace<S>,
}

impl<S: Clone> TraceRecorder<S> {
    pub fn new(meta: TraceMeta) -> Self {
        Self {
            trace: Trace::new(meta),
        }
    }

    /// Append a committed tick; traces are append-only
    pub fn record(&mut self, snapshot: Snapshot<S>) {
        self.trace.snapshots.push(snapshot);
    }

    pub fn set_final_states(&mut self, states: BTreeMap<NodeId, S>) {
        self.trace.final_states = states;
    }

    pub fn set_termination(&mut self, termination: Termination) {
        self.trace.termination = Some(termination);
    }

    /// The trace recorded so far, for online checking
    pub fn trace(&self) -> &Trace<S> {
        &self.trace
    }

    pub fn into_trace(self) -> Trace<S> {
        self.trace
    }
}
