//! # Courier Core
//!
//! Core types, traits and errors for the Courier message fabric.
//!
//! The fabric models asynchronous message passing between nodes: messages
//! are drawn from a finite pool of single-use atoms, become visible to their
//! recipients one tick after they are sent, and are read at most once by
//! each recipient.
//!
//! ## Key Types
//!
//! - [`NodeId`] / [`MessageId`]: identities of participants and atoms
//! - [`Message`]: per-atom lifecycle record (`from`, `to`, `sent_on`, `read_on`)
//! - [`MessagePool`]: the finite, never-replenished atom supply
//! - [`Behavior`]: the pluggable per-node decision function
//! - [`FabricError`]: fatal configuration, exhaustion and protocol errors

pub mod behavior;
pub mod error;
pub mod identity;
pub mod message;
pub mod pool;

// Re-export main types
pub use behavior::*;
pub use error::*;
pub use identity::*;
pub use message::*;
pub use pool::*;
