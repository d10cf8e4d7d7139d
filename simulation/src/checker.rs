//! Trace property checking
//!
//! Every check is a pure function of a recorded trace. Properties that need
//! a future witness (a read that has not happened yet) report `Unproven`
//! when the trace ends before the witness appears, never `Holds`.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use courier_core::{Message, MessageId, NodeId, Tick};
use courier_logging::spans;
use tracing::{debug, debug_span, warn};

use crate::error::SimError;
use crate::trace::Trace;

/// A checkable trace property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Property {
    /// Every recipient of every sent message eventually reads it
    NoLostMessages,
    /// Per sender and recipient, read order never inverts send order
    ReadInOrder,
    /// Pool supply covers the summed send needs at every tick
    NoMessageShortage,
    /// No atom is sent more than once
    ExactlyOnceSend,
    /// No recipient reads the same message more than once
    ExactlyOnceRead,
    /// Visible and read sets agree with the message lifecycle
    VisibilityCausality,
    /// The pool only shrinks, by exactly the atoms sent each tick
    PoolMonotonic,
}

impl Property {
    pub const ALL: [Property; 7] = [
        Property::NoLostMessages,
        Property::ReadInOrder,
        Property::NoMessageShortage,
        Property::ExactlyOnceSend,
        Property::ExactlyOnceRead,
        Property::VisibilityCausality,
        Property::PoolMonotonic,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Property::NoLostMessages => "no-lost-messages",
            Property::ReadInOrder => "read-in-order",
            Property::NoMessageShortage => "no-message-shortage",
            Property::ExactlyOnceSend => "exactly-once-send",
            Property::ExactlyOnceRead => "exactly-once-read",
            Property::VisibilityCausality => "visibility-causality",
            Property::PoolMonotonic => "pool-monotonic",
        }
    }
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Property {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        Property::ALL
            .into_iter()
            .find(|p| p.name() == normalized || p.name().replace('-', "") == normalized)
            .ok_or_else(|| SimError::Unknown {
                what: "property",
                value: s.to_string(),
            })
    }
}

/// Evidence attached to a `Violated` or `Unproven` verdict
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Witness {
    /// `message` left `recipient`'s visible set at `tick` without being read
    Lost {
        message: MessageId,
        recipient: NodeId,
        sent_on: Tick,
        tick: Tick,
    },
    /// `message` was still unread by `recipient` when the trace ended
    Pending {
        message: MessageId,
        recipient: NodeId,
        sent_on: Tick,
        horizon: Tick,
    },
    /// `recipient` read `later` strictly before `earlier` although
    /// `earlier` was not sent strictly after it
    OutOfOrder {
        sender: NodeId,
        recipient: NodeId,
        earlier: MessageId,
        earlier_sent: Tick,
        earlier_read: Tick,
        later: MessageId,
        later_sent: Tick,
        later_read: Tick,
    },
    /// `read` was consumed while `unread`, sent no later than it, was still
    /// pending; reading `unread` afterwards would invert the order
    UnreadPredecessor {
        sender: NodeId,
        recipient: NodeId,
        unread: MessageId,
        read: MessageId,
        horizon: Tick,
    },
    Shortage {
        tick: Tick,
        needed: usize,
        available: usize,
    },
    DuplicateSend {
        message: MessageId,
        ticks: Vec<Tick>,
    },
    DuplicateRead {
        message: MessageId,
        node: NodeId,
        ticks: Vec<Tick>,
    },
    /// A visible or read entry the lifecycle does not allow
    Invisible {
        message: MessageId,
        node: NodeId,
        tick: Tick,
        cause: &'static str,
    },
    PoolDrift {
        tick: Tick,
        expected: usize,
        found: usize,
    },
}

impl fmt::Display for Witness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Witness::Lost {
                message,
                recipient,
                sent_on,
                tick,
            } => write!(
                f,
                "{message} (sent at {sent_on}) dropped out of {recipient}'s view unread at tick {tick}"
            ),
            Witness::Pending {
                message,
                recipient,
                sent_on,
                horizon,
            } => write!(
                f,
                "{message} (sent at {sent_on}) still unread by {recipient} at horizon {horizon}"
            ),
            Witness::OutOfOrder {
                sender,
                recipient,
                earlier,
                earlier_sent,
                earlier_read,
                later,
                later_sent,
                later_read,
            } => write!(
                f,
                "{recipient} read {sender}'s messages out of order: \
                 {earlier} sent {earlier_sent} read {earlier_read}, \
                 {later} sent {later_sent} read {later_read}"
            ),
            Witness::UnreadPredecessor {
                sender,
                recipient,
                unread,
                read,
                horizon,
            } => write!(
                f,
                "{recipient} read {read} from {sender} while {unread} was unread at horizon {horizon}"
            ),
            Witness::Shortage {
                tick,
                needed,
                available,
            } => write!(
                f,
                "tick {tick}: nodes need {needed} atom(s), pool has {available}"
            ),
            Witness::DuplicateSend { message, ticks } => {
                write!(f, "{message} sent more than once, at ticks {ticks:?}")
            }
            Witness::DuplicateRead {
                message,
                node,
                ticks,
            } => write!(f, "{node} read {message} more than once, at ticks {ticks:?}"),
            Witness::Invisible {
                message,
                node,
                tick,
                cause,
            } => write!(f, "tick {tick}: {message} at {node} breaks causality ({cause})"),
            Witness::PoolDrift {
                tick,
                expected,
                found,
            } => write!(
                f,
                "tick {tick}: pool available is {found}, expected {expected}"
            ),
        }
    }
}

/// Outcome of checking one property against one trace
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Holds,
    Violated(Witness),
    /// The horizon ended before every obligation found a witness
    Unproven(Vec<Witness>),
}

impl Verdict {
    pub fn holds(&self) -> bool {
        matches!(self, Verdict::Holds)
    }

    pub fn is_violated(&self) -> bool {
        matches!(self, Verdict::Violated(_))
    }

    pub fn is_unproven(&self) -> bool {
        matches!(self, Verdict::Unproven(_))
    }

    pub fn witness(&self) -> Option<&Witness> {
        match self {
            Verdict::Violated(w) => Some(w),
            Verdict::Unproven(open) => open.first(),
            Verdict::Holds => None,
        }
    }

    fn from_obligations(open: Vec<Witness>) -> Self {
        if open.is_empty() {
            Verdict::Holds
        } else {
            Verdict::Unproven(open)
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Holds => write!(f, "holds"),
            Verdict::Violated(w) => write!(f, "violated: {w}"),
            Verdict::Unproven(open) => write!(f, "unproven ({} open obligation(s))", open.len()),
        }
    }
}

/// Check `property` against `trace`
pub fn check<S>(trace: &Trace<S>, property: Property) -> Verdict {
    PropertyChecker::new(trace).check(property)
}

/// Check every property, sharing one rebuilt message table
pub fn check_all<S>(trace: &Trace<S>) -> Vec<(Property, Verdict)> {
    PropertyChecker::new(trace).check_all()
}

/// Evaluates properties over one trace
pub struct PropertyChecker<'a, S> {
    trace: &'a Trace<S>,
    messages: BTreeMap<MessageId, Message>,
}

impl<'a, S> PropertyChecker<'a, S> {
    pub fn new(trace: &'a Trace<S>) -> Self {
        Self {
            trace,
            messages: trace.messages(),
        }
    }

    pub fn check(&self, property: Property) -> Verdict {
        let span = debug_span!(spans::CHECK_PROPERTY, property = %property);
        let _enter = span.enter();

        let verdict = match property {
            Property::NoLostMessages => self.no_lost_messages(),
            Property::ReadInOrder => self.read_in_order(),
            Property::NoMessageShortage => self.no_message_shortage(),
            Property::ExactlyOnceSend => self.exactly_once_send(),
            Property::ExactlyOnceRead => self.exactly_once_read(),
            Property::VisibilityCausality => self.visibility_causality(),
            Property::PoolMonotonic => self.pool_monotonic(),
        };

        match &verdict {
            Verdict::Violated(witness) => warn!(%property, %witness, "Property violated"),
            other => debug!(%property, verdict = %other, "Property checked"),
        }
        verdict
    }

    pub fn check_all(&self) -> Vec<(Property, Verdict)> {
        Property::ALL
            .into_iter()
            .map(|p| (p, self.check(p)))
            .collect()
    }

    fn no_lost_messages(&self) -> Verdict {
        let Some(horizon) = self.trace.horizon() else {
            return Verdict::Holds;
        };
        let mut open = Vec::new();

        for msg in self.messages.values() {
            let Some(sent_on) = msg.sent_on else {
                continue;
            };
            for recipient in msg.unread_by() {
                let dropped = self
                    .trace
                    .snapshots
                    .iter()
                    .filter(|s| s.tick > sent_on)
                    .find(|s| {
                        s.nodes
                            .get(&recipient)
                            .is_some_and(|n| !n.visible.contains(&msg.id))
                    });
                match dropped {
                    Some(snapshot) => {
                        return Verdict::Violated(Witness::Lost {
                            message: msg.id,
                            recipient,
                            sent_on,
                            tick: snapshot.tick,
                        });
                    }
                    None => open.push(Witness::Pending {
                        message: msg.id,
                        recipient,
                        sent_on,
                        horizon,
                    }),
                }
            }
        }
        Verdict::from_obligations(open)
    }

    fn read_in_order(&self) -> Verdict {
        let Some(horizon) = self.trace.horizon() else {
            return Verdict::Holds;
        };

        // (recipient, sender) -> messages in send order
        let mut streams: BTreeMap<(NodeId, NodeId), Vec<(Tick, &Message)>> = BTreeMap::new();
        for msg in self.messages.values() {
            let (Some(from), Some(sent_on)) = (msg.from, msg.sent_on) else {
                continue;
            };
            for recipient in &msg.to {
                streams
                    .entry((*recipient, from))
                    .or_default()
                    .push((sent_on, msg));
            }
        }

        let mut open = Vec::new();
        for ((recipient, sender), mut stream) in streams {
            stream.sort_by_key(|(sent_on, msg)| (*sent_on, msg.id));

            for (i, (earlier_sent, earlier)) in stream.iter().enumerate() {
                for (later_sent, later) in &stream[i + 1..] {
                    let earlier_read = earlier.read_on.get(&recipient).copied();
                    let later_read = later.read_on.get(&recipient).copied();

                    match (earlier_read, later_read) {
                        (Some(er), Some(lr)) => {
                            let inverted = lr < er;
                            let tied_send = earlier_sent == later_sent && er != lr;
                            if inverted || tied_send {
                                return Verdict::Violated(Witness::OutOfOrder {
                                    sender,
                                    recipient,
                                    earlier: earlier.id,
                                    earlier_sent: *earlier_sent,
                                    earlier_read: er,
                                    later: later.id,
                                    later_sent: *later_sent,
                                    later_read: lr,
                                });
                            }
                        }
                        (None, Some(_)) => {
                            open.push(Witness::UnreadPredecessor {
                                sender,
                                recipient,
                                unread: earlier.id,
                                read: later.id,
                                horizon,
                            });
                        }
                        // Same-tick sends must be read together
                        (Some(_), None) if earlier_sent == later_sent => {
                            open.push(Witness::UnreadPredecessor {
                                sender,
                                recipient,
                                unread: later.id,
                                read: earlier.id,
                                horizon,
                            });
                        }
                        _ => {}
                    }
                }
            }
        }
        Verdict::from_obligations(open)
    }

    fn no_message_shortage(&self) -> Verdict {
        for snapshot in &self.trace.snapshots {
            let needed = snapshot.total_needs();
            if needed > snapshot.available {
                return Verdict::Violated(Witness::Shortage {
                    tick: snapshot.tick,
                    needed,
                    available: snapshot.available,
                });
            }
        }
        Verdict::Holds
    }

    fn exactly_once_send(&self) -> Verdict {
        let mut sends: BTreeMap<MessageId, Vec<Tick>> = BTreeMap::new();
        for snapshot in &self.trace.snapshots {
            for node in snapshot.nodes.values() {
                for id in node.sent.keys() {
                    sends.entry(*id).or_default().push(snapshot.tick);
                }
            }
        }

        match sends.into_iter().find(|(_, ticks)| ticks.len() > 1) {
            Some((message, ticks)) => Verdict::Violated(Witness::DuplicateSend { message, ticks }),
            None => Verdict::Holds,
        }
    }

    fn exactly_once_read(&self) -> Verdict {
        let mut reads: BTreeMap<(NodeId, MessageId), Vec<Tick>> = BTreeMap::new();
        for snapshot in &self.trace.snapshots {
            for (node, ns) in &snapshot.nodes {
                for id in &ns.read {
                    reads.entry((*node, *id)).or_default().push(snapshot.tick);
                }
            }
        }

        match reads.into_iter().find(|(_, ticks)| ticks.len() > 1) {
            Some(((node, message), ticks)) => Verdict::Violated(Witness::DuplicateRead {
                message,
                node,
                ticks,
            }),
            None => Verdict::Holds,
        }
    }

    fn visibility_causality(&self) -> Verdict {
        for snapshot in &self.trace.snapshots {
            let tick = snapshot.tick;
            for (node, ns) in &snapshot.nodes {
                for id in &ns.visible {
                    if let Some(cause) = self.visibility_breach(*id, *node, tick) {
                        return Verdict::Violated(Witness::Invisible {
                            message: *id,
                            node: *node,
                            tick,
                            cause,
                        });
                    }
                }
                if let Some(id) = ns.read.difference(&ns.visible).next() {
                    return Verdict::Violated(Witness::Invisible {
                        message: *id,
                        node: *node,
                        tick,
                        cause: "read while not visible",
                    });
                }
            }
        }
        Verdict::Holds
    }

    fn visibility_breach(&self, id: MessageId, node: NodeId, tick: Tick) -> Option<&'static str> {
        let Some(msg) = self.messages.get(&id) else {
            return Some("never sent");
        };
        match msg.sent_on {
            None => Some("never sent"),
            Some(sent_on) if sent_on >= tick => Some("visible before its send completed"),
            Some(_) if !msg.to.contains(&node) => Some("not addressed to this node"),
            Some(_) if msg.read_on.get(&node).is_some_and(|read| *read < tick) => {
                Some("visible after being read")
            }
            Some(_) => None,
        }
    }

    fn pool_monotonic(&self) -> Verdict {
        let mut expected = self.trace.meta.pool_size;
        for snapshot in &self.trace.snapshots {
            let sent = snapshot.sent_count();
            if snapshot.available != expected || sent > snapshot.available {
                return Verdict::Violated(Witness::PoolDrift {
                    tick: snapshot.tick,
                    expected,
                    found: snapshot.available,
                });
            }
            expected = snapshot.available - sent;
        }
        Verdict::Holds
    }
}
