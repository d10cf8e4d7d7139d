//! Finite pool of message atoms
//!
//! The pool is provisioned once and never replenished. Every atom leaves
//! `available` at most once, which is what guarantees that no two sends can
//! share an atom. Allocation is all-or-nothing: a request that cannot be
//! satisfied in full consumes nothing.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::PoolError;
use crate::identity::MessageId;

/// The sole authority for atom allocation
///
/// Fresh atoms are handed out in id order from a watermark, so the pool
/// stays small no matter how many atoms were provisioned. Only atoms
/// claimed ahead of the watermark are tracked individually.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagePool {
    capacity: u32,
    /// Every atom below this id has been consumed
    watermark: u32,
    /// Consumed atoms at or above the watermark
    claimed_ahead: BTreeSet<MessageId>,
}

impl MessagePool {
    /// Provision a pool of `size` fresh atoms, `m0..m{size-1}`
    pub fn new(size: u32) -> Self {
        Self {
            capacity: size,
            watermark: 0,
            claimed_ahead: BTreeSet::new(),
        }
    }

    /// Number of atoms provisioned up front
    pub fn capacity(&self) -> usize {
        self.capacity as usize
    }

    /// Number of atoms not yet consumed by any send
    pub fn remaining(&self) -> usize {
        (self.capacity - self.watermark) as usize - self.claimed_ahead.len()
    }

    pub fn consumed(&self) -> usize {
        self.capacity() - self.remaining()
    }

    /// Whether the atom belongs to this pool at all
    pub fn contains(&self, atom: MessageId) -> bool {
        atom.0 < self.capacity
    }

    pub fn is_available(&self, atom: MessageId) -> bool {
        self.contains(atom) && atom.0 >= self.watermark && !self.claimed_ahead.contains(&atom)
    }

    /// Unconsumed atoms, lowest first
    pub fn available(&self) -> impl Iterator<Item = MessageId> + '_ {
        (self.watermark..self.capacity)
            .map(MessageId)
            .filter(move |atom| !self.claimed_ahead.contains(atom))
    }

    /// Take `count` unused atoms, lowest ids first
    pub fn allocate(&mut self, count: usize) -> Result<Vec<MessageId>, PoolError> {
        self.reserve(&[], count)
    }

    /// Take the `pinned` atoms plus `count` more, as a single reservation
    ///
    /// The returned vector starts with the pinned atoms in the order given,
    /// followed by the freshly picked ones. On error nothing is consumed.
    pub fn reserve(
        &mut self,
        pinned: &[MessageId],
        count: usize,
    ) -> Result<Vec<MessageId>, PoolError> {
        let mut seen = BTreeSet::new();
        for atom in pinned {
            if !self.contains(*atom) {
                return Err(PoolError::UnknownAtom(*atom));
            }
            if !seen.insert(*atom) {
                return Err(PoolError::DuplicateClaim(*atom));
            }
            if !self.is_available(*atom) {
                return Err(PoolError::AlreadyConsumed(*atom));
            }
        }

        let requested = pinned.len() + count;
        if requested > self.remaining() {
            return Err(PoolError::Exhausted {
                requested,
                available: self.remaining(),
            });
        }

        let fresh: Vec<MessageId> = self
            .available()
            .filter(|atom| !seen.contains(atom))
            .take(count)
            .collect();

        let mut reserved = Vec::with_capacity(requested);
        reserved.extend_from_slice(pinned);
        reserved.extend(fresh);
        for atom in &reserved {
            self.consume(*atom);
        }

        trace!(
            reserved = reserved.len(),
            remaining = self.remaining(),
            "Reserved atoms from pool"
        );
        Ok(reserved)
    }

    fn consume(&mut self, atom: MessageId) {
        if atom.0 != self.watermark {
            self.claimed_ahead.insert(atom);
            return;
        }
        self.watermark += 1;
        while self.claimed_ahead.remove(&MessageId(self.watermark)) {
            self.watermark += 1;
        }
    }
}
