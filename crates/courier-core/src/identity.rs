//! Node and message identities
//!
//! Nodes are named by capital letters ('A'..'Z'), the same way the mesh
//! simulation names its peers. Message atoms are plain indices into the
//! pool that was provisioned when the fabric was built.

use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

/// One discrete unit of simulated time
pub type Tick = u64;

/// Stable, unique identity of a participant in the fabric
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub char);

impl NodeId {
    /// Create a new node identity from a capital letter
    pub fn new(c: char) -> Option<Self> {
        if c.is_ascii_uppercase() {
            Some(Self(c))
        } else {
            None
        }
    }

    /// Generate all identities from 'A' to the given letter (inclusive)
    pub fn range_to(end: char) -> Vec<Self> {
        ('A'..=end).filter_map(Self::new).collect()
    }

    /// Get the underlying character
    pub fn as_char(&self) -> char {
        self.0
    }
}

impl Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single-use message atom drawn from the pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub u32);

impl MessageId {
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "m{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_id_creation() {
        assert!(NodeId::new('A').is_some());
        assert!(NodeId::new('Z').is_some());
        assert!(NodeId::new('a').is_none());
        assert!(NodeId::new('1').is_none());
    }

    #[test]
    fn test_node_id_range() {
        let ids = NodeId::range_to('C');
        assert_eq!(ids, vec![NodeId('A'), NodeId('B'), NodeId('C')]);
    }

    #[test]
    fn test_display() {
        assert_eq!(NodeId('B').to_string(), "B");
        assert_eq!(MessageId(7).to_string(), "m7");
    }

    #[test]
    fn test_serde_is_transparent() {
        assert_eq!(serde_json::to_string(&NodeId('A')).unwrap(), "\"A\"");
        assert_eq!(serde_json::to_string(&MessageId(3)).unwrap(), "3");
    }
}
