//! # Courier Simulation
//!
//! A discrete-time simulator of an asynchronous message fabric, plus a
//! checker for the properties its traces must satisfy.
//!
//! ## Overview
//!
//! Nodes exchange messages drawn from a finite pool of single-use atoms.
//! The fabric never invents loss or reordering itself: a message becomes
//! visible to its recipients one tick after it is sent and stays visible
//! until read, so loss, delay and reordering emerge only from what the
//! node behaviors choose to read and when.
//!
//! ## Architecture
//!
//! - **Fabric** (`fabric.rs`): clock, per-tick scheduler and atomic commit
//! - **Trace** (`trace.rs`): per-tick snapshots, recorder and persistence
//! - **Checker** (`checker.rs`): properties, verdicts and witnesses
//! - **Behaviors** (`behaviors.rs`): scripted, in-order and random nodes
//! - **Config** (`config.rs`): TOML run configuration
//! - **Scenarios** (`scenarios.rs`): canned runs
//!
//! ## Example
//!
//! ```rust,ignore
//! use courier_simulation::*;
//!
//! let fabric = Fabric::new(
//!     [
//!         NodeSpec::new(NodeId('A'), (), ScriptedBehavior::new([
//!             (0, ScriptedStep::new().send(OutgoingMessage::to(NodeId('B')))),
//!         ])),
//!         NodeSpec::new(NodeId('B'), (), ScriptedBehavior::new([
//!             (1, ScriptedStep::new().read_visible()),
//!         ])),
//!     ],
//!     1,
//! )?;
//!
//! let outcome = fabric.run(3);
//! assert!(check(&outcome.trace, Property::NoLostMessages).holds());
//! ```

pub mod behaviors;
pub mod checker;
pub mod config;
pub mod error;
pub mod fabric;
pub mod node;
pub mod scenarios;
pub mod trace;

#[cfg(test)]
mod integration_scenarios;

// Re-export main types
pub use behaviors::{InOrderReader, QuotaState, RandomBehavior, ScriptedBehavior, ScriptedStep};
pub use checker::{Property, PropertyChecker, Verdict, Witness, check, check_all};
pub use config::{BehaviorConfig, BehaviorKind, SimConfig};
pub use error::SimError;
pub use fabric::{Fabric, FabricClock, RunOutcome};
pub use node::{Node, NodeSpec};
pub use trace::{
    NodeSnapshot, Snapshot, TRACE_FORMAT_VERSION, Termination, Trace, TraceMeta, TraceRecorder,
};

// Re-export core types for hosts
pub use courier_core::{
    Behavior, Decision, DecisionContext, ErrorKind, FabricError, Idle, MessageId, NodeId,
    OutgoingMessage, Tick, VisibleMessage,
};
