//! Error types for the Courier fabric

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::identity::{MessageId, NodeId, Tick};

/// Broad classification of a fatal fabric error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Malformed setup, detected before any tick runs
    Configuration,
    /// The pool could not satisfy a tick's allocation demand
    ResourceExhaustion,
    /// A decision function attempted something the lifecycle forbids
    ProtocolViolation,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::Configuration => write!(f, "configuration"),
            ErrorKind::ResourceExhaustion => write!(f, "resource exhaustion"),
            ErrorKind::ProtocolViolation => write!(f, "protocol violation"),
        }
    }
}

/// Fatal errors raised while building or stepping a fabric
///
/// Every runtime variant names the tick and the entities involved so a host
/// can report them verbatim. None of these are recoverable: the fabric halts
/// at the offending tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
pub enum FabricError {
    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    #[error("Pool exhausted at tick {tick}: {requested} atom(s) requested, {available} available")]
    PoolExhausted {
        tick: Tick,
        requested: usize,
        available: usize,
    },

    #[error("Invalid read at tick {tick}: node {node} cannot see {message}")]
    InvalidRead {
        tick: Tick,
        node: NodeId,
        message: MessageId,
    },

    #[error("Double send at tick {tick}: node {node} tried to send {message} again")]
    DoubleSend {
        tick: Tick,
        node: NodeId,
        message: MessageId,
    },

    #[error("Double read at tick {tick}: node {node} already read {message}")]
    DoubleRead {
        tick: Tick,
        node: NodeId,
        message: MessageId,
    },

    #[error("Invalid send at tick {tick} from node {node}: {reason}")]
    InvalidSend {
        tick: Tick,
        node: NodeId,
        reason: String,
    },
}

impl FabricError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FabricError::InvalidConfig { .. } => ErrorKind::Configuration,
            FabricError::PoolExhausted { .. } => ErrorKind::ResourceExhaustion,
            FabricError::InvalidRead { .. }
            | FabricError::DoubleSend { .. }
            | FabricError::DoubleRead { .. }
            | FabricError::InvalidSend { .. } => ErrorKind::ProtocolViolation,
        }
    }

    /// The tick at which the error was raised (configuration errors have none)
    pub fn tick(&self) -> Option<Tick> {
        match self {
            FabricError::InvalidConfig { .. } => None,
            FabricError::PoolExhausted { tick, .. }
            | FabricError::InvalidRead { tick, .. }
            | FabricError::DoubleSend { tick, .. }
            | FabricError::DoubleRead { tick, .. }
            | FabricError::InvalidSend { tick, .. } => Some(*tick),
        }
    }

    /// The node that caused the error, if a single one did
    pub fn node(&self) -> Option<NodeId> {
        match self {
            FabricError::InvalidRead { node, .. }
            | FabricError::DoubleSend { node, .. }
            | FabricError::DoubleRead { node, .. }
            | FabricError::InvalidSend { node, .. } => Some(*node),
            _ => None,
        }
    }

    pub fn message(&self) -> Option<MessageId> {
        match self {
            FabricError::InvalidRead { message, .. }
            | FabricError::DoubleSend { message, .. }
            | FabricError::DoubleRead { message, .. } => Some(*message),
            _ => None,
        }
    }
}

/// Errors raised by the message pool
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PoolError {
    #[error("{requested} atom(s) requested but only {available} available")]
    Exhausted { requested: usize, available: usize },

    #[error("Atom {0} was already consumed")]
    AlreadyConsumed(MessageId),

    #[error("Atom {0} was claimed twice in one reservation")]
    DuplicateClaim(MessageId),

    #[error("Atom {0} is not part of this pool")]
    UnknownAtom(MessageId),
}

/// Errors raised by a message lifecycle transition
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
    #[error("{0} was already sent")]
    AlreadySent(MessageId),

    #[error("{message} was already read by {node}")]
    AlreadyRead { message: MessageId, node: NodeId },

    #[error("{message} is not visible to {node}")]
    NotVisible { message: MessageId, node: NodeId },

    #[error("{0} must have at least one recipient")]
    NoRecipients(MessageId),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        let exhausted = FabricError::PoolExhausted {
            tick: 3,
            requested: 2,
            available: 1,
        };
        assert_eq!(exhausted.kind(), ErrorKind::ResourceExhaustion);
        assert_eq!(exhausted.tick(), Some(3));
        assert_eq!(exhausted.node(), None);

        let read = FabricError::InvalidRead {
            tick: 1,
            node: NodeId('B'),
            message: MessageId(0),
        };
        assert_eq!(read.kind(), ErrorKind::ProtocolViolation);
        assert_eq!(read.node(), Some(NodeId('B')));
        assert_eq!(read.message(), Some(MessageId(0)));

        let config = FabricError::InvalidConfig {
            reason: "duplicate node A".into(),
        };
        assert_eq!(config.kind(), ErrorKind::Configuration);
        assert_eq!(config.tick(), None);
    }

    #[test]
    fn test_error_messages_name_entities() {
        let err = FabricError::DoubleRead {
            tick: 4,
            node: NodeId('C'),
            message: MessageId(2),
        };
        let text = err.to_string();
        assert!(text.contains("tick 4"));
        assert!(text.contains('C'));
        assert!(text.contains("m2"));
    }
}
