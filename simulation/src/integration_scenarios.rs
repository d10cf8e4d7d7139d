//! Integration scenarios exercising the full fabric stack
//!
//! These scenarios run the scheduler end to end and check:
//! - delivery, shortage, reordering and horizon verdicts
//! - fatal protocol violations and halting
//! - the lifecycle invariants every committed trace must satisfy

use courier_core::{FabricError, MessageId, NodeId, OutgoingMessage};

use crate::behaviors::{InOrderReader, QuotaState, RandomBehavior, ScriptedBehavior, ScriptedStep};
use crate::checker::{Property, Verdict, Witness, check, check_all};
use crate::config::SimConfig;
use crate::fabric::Fabric;
use crate::node::NodeSpec;
use crate::scenarios;
use crate::trace::Termination;

const A: NodeId = NodeId('A');
const B: NodeId = NodeId('B');
const C: NodeId = NodeId('C');

/// Scenario A: one message, read on its first visible tick
#[test]
fn test_single_delivery() {
    let outcome = scenarios::run_delivery_scenario().unwrap();

    assert!(outcome.reached_horizon());
    assert_eq!(check(&outcome.trace, Property::NoLostMessages), Verdict::Holds);
    assert_eq!(outcome.trace.final_available(), 0);

    let messages = outcome.trace.messages();
    let m0 = &messages[&MessageId(0)];
    assert_eq!(m0.from, Some(A));
    assert_eq!(m0.sent_on, Some(0));
    assert_eq!(m0.read_on[&B], 1);
}

/// Scenario B: needs exceed the pool at tick 0
#[test]
fn test_shortage_detected_at_first_tick() {
    let outcome = scenarios::run_shortage_scenario().unwrap();

    assert_eq!(
        check(&outcome.trace, Property::NoMessageShortage),
        Verdict::Violated(Witness::Shortage {
            tick: 0,
            needed: 2,
            available: 1
        })
    );
    // Provisioning shortfalls never halt the run on their own
    assert!(outcome.reached_horizon());
}

/// Scenario C: second message read first
#[test]
fn test_reordered_reads_violate_order() {
    let outcome = scenarios::run_reordering_scenario().unwrap();

    match check(&outcome.trace, Property::ReadInOrder) {
        Verdict::Violated(Witness::OutOfOrder {
            sender,
            recipient,
            earlier,
            later,
            earlier_read,
            later_read,
            ..
        }) => {
            assert_eq!((sender, recipient), (A, B));
            assert_eq!((earlier, later), (MessageId(0), MessageId(1)));
            assert_eq!((earlier_read, later_read), (3, 2));
        }
        other => panic!("expected an out-of-order witness, got {other}"),
    }
    assert_eq!(check(&outcome.trace, Property::NoLostMessages), Verdict::Holds);
}

/// Scenario D: never-read message is unproven, not lost
#[test]
fn test_unread_message_is_unproven() {
    let outcome = scenarios::run_unread_scenario().unwrap();

    assert_eq!(
        check(&outcome.trace, Property::NoLostMessages),
        Verdict::Unproven(vec![Witness::Pending {
            message: MessageId(0),
            recipient: B,
            sent_on: 0,
            horizon: 2,
        }])
    );
}

/// Scenario E: reading an invisible message halts the fabric
#[test]
fn test_invisible_read_halts_run() {
    let mut fabric = scenarios::invisible_read_fabric().unwrap();

    let expected = FabricError::InvalidRead {
        tick: 0,
        node: B,
        message: MessageId(0),
    };
    assert_eq!(fabric.step().unwrap_err(), expected);
    assert!(fabric.is_halted());
    assert_eq!(fabric.tick(), 0);
    assert_eq!(fabric.pool().remaining(), 1);

    let outcome = fabric.run(5);
    assert_eq!(outcome.termination, Termination::Halted(expected));
    assert!(outcome.trace.is_empty());
}

/// Broadcasts are ordered per recipient, never across recipients
#[test]
fn test_broadcast_order_is_per_recipient() {
    let sender = ScriptedBehavior::new([
        (0, ScriptedStep::new().send(OutgoingMessage::broadcast([B, C]))),
        (1, ScriptedStep::new().send(OutgoingMessage::broadcast([B, C]))),
    ]);
    // B reads in send order, C reads both in the same tick
    let b = ScriptedBehavior::new([
        (2, ScriptedStep::new().read(MessageId(0))),
        (3, ScriptedStep::new().read(MessageId(1))),
    ]);
    let c = ScriptedBehavior::new([(3, ScriptedStep::new().read_visible())]);

    let fabric = Fabric::new(
        [
            NodeSpec::new(A, (), sender),
            NodeSpec::new(B, (), b),
            NodeSpec::new(C, (), c),
        ],
        2,
    )
    .unwrap();
    let outcome = fabric.run(4);

    assert_eq!(check(&outcome.trace, Property::ReadInOrder), Verdict::Holds);
    assert_eq!(check(&outcome.trace, Property::NoLostMessages), Verdict::Holds);
}

/// Same-tick sends read one at a time stay open until the second read
#[test]
fn test_same_tick_sends_half_read_stay_unproven() {
    let run = |ticks| {
        let sender = ScriptedBehavior::new([(
            0,
            ScriptedStep::new()
                .send(OutgoingMessage::to(B))
                .send(OutgoingMessage::to(B)),
        )]);
        let reader = ScriptedBehavior::new([
            (1, ScriptedStep::new().read(MessageId(1))),
            (3, ScriptedStep::new().read(MessageId(0))),
        ]);
        Fabric::new([NodeSpec::new(A, (), sender), NodeSpec::new(B, (), reader)], 2)
            .unwrap()
            .run(ticks)
    };

    let short = run(2);
    assert_eq!(
        check(&short.trace, Property::ReadInOrder),
        Verdict::Unproven(vec![Witness::UnreadPredecessor {
            sender: A,
            recipient: B,
            unread: MessageId(0),
            read: MessageId(1),
            horizon: 1,
        }])
    );

    let long = run(4);
    assert!(check(&long.trace, Property::ReadInOrder).is_violated());
}

/// A node cannot read the same message twice
#[test]
fn test_double_read_is_fatal() {
    let reader = ScriptedBehavior::new([
        (1, ScriptedStep::new().read(MessageId(0))),
        (2, ScriptedStep::new().read(MessageId(0))),
    ]);
    let mut fabric = Fabric::new(
        [
            NodeSpec::new(A, (), ScriptedBehavior::new([(0, ScriptedStep::new().send(OutgoingMessage::to(B)))])),
            NodeSpec::new(B, (), reader),
        ],
        1,
    )
    .unwrap();

    fabric.run_ticks(2).unwrap();
    assert_eq!(
        fabric.step().unwrap_err(),
        FabricError::DoubleRead {
            tick: 2,
            node: B,
            message: MessageId(0)
        }
    );
    // Visibility was revoked the tick after the read
    let m0 = fabric.message(MessageId(0)).unwrap();
    assert!(m0.is_visible_to(B, 1));
    assert!(!m0.is_visible_to(B, 2));
}

/// Re-sending a consumed atom is a double send
#[test]
fn test_resending_consumed_atom_is_fatal() {
    let sender = ScriptedBehavior::new([
        (0, ScriptedStep::new().send(OutgoingMessage::to(B))),
        (1, ScriptedStep::new().send(OutgoingMessage::to(B).pinned(MessageId(0)))),
    ]);
    let mut fabric =
        Fabric::new([NodeSpec::new(A, (), sender), NodeSpec::idle(B)], 3).unwrap();

    fabric.step().unwrap();
    assert_eq!(
        fabric.step().unwrap_err(),
        FabricError::DoubleSend {
            tick: 1,
            node: A,
            message: MessageId(0)
        }
    );
    assert_eq!(fabric.pool().remaining(), 2);
}

/// Every committed trace satisfies the lifecycle invariants
#[test]
fn test_random_runs_keep_lifecycle_invariants() {
    for seed in 0..8 {
        let config = SimConfig {
            nodes: NodeId::range_to('E'),
            pool_size: 20,
            ..SimConfig::default()
        }
        .with_seed(seed)
        .with_max_ticks(25);

        let outcome = config.build_fabric().unwrap().run(config.max_ticks);
        assert!(outcome.reached_horizon(), "seed {seed}: {:?}", outcome.termination);

        for property in [
            Property::ExactlyOnceSend,
            Property::ExactlyOnceRead,
            Property::VisibilityCausality,
            Property::PoolMonotonic,
            Property::NoMessageShortage,
        ] {
            assert_eq!(
                check(&outcome.trace, property),
                Verdict::Holds,
                "seed {seed}, {property}"
            );
        }
    }
}

/// Pool count only shrinks, by exactly what was sent
#[test]
fn test_pool_monotonicity_across_ticks() {
    let fabric = SimConfig {
        nodes: NodeId::range_to('D'),
        pool_size: 16,
        ..SimConfig::default()
    }
    .with_seed(99)
    .build_fabric()
    .unwrap();
    let outcome = fabric.run(15);

    for pair in outcome.trace.snapshots.windows(2) {
        assert_eq!(pair[1].available, pair[0].available - pair[0].sent_count());
        assert!(pair[1].available <= pair[0].available);
    }
}

/// Same seed, same trace
#[test]
fn test_random_runs_are_reproducible() {
    let run = || {
        let behavior = RandomBehavior::new(5)
            .with_send_probability(0.7)
            .with_read_probability(0.3);
        let specs = [A, B, C].map(|id| NodeSpec::new(id, QuotaState::with_quota(3), behavior.clone()));
        Fabric::new(specs, 9).unwrap().run(12).trace.snapshots
    };
    assert_eq!(run(), run());
}

/// In-order readers never violate read order
#[test]
fn test_in_order_readers_keep_order() {
    let specs = [A, B, C].map(|id| NodeSpec::new(id, QuotaState::with_quota(4), InOrderReader::new()));
    let outcome = Fabric::new(specs, 12).unwrap().run(8);

    assert!(outcome.reached_horizon());
    assert_eq!(check(&outcome.trace, Property::ReadInOrder), Verdict::Holds);
    assert_eq!(check(&outcome.trace, Property::NoLostMessages), Verdict::Holds);
    assert_eq!(outcome.trace.final_available(), 0);
    assert!(outcome.trace.final_states.values().all(|s| s.quota == 0 && s.received == 4));
}

/// Checking the same trace twice gives the same verdicts
#[test]
fn test_checking_is_idempotent() {
    let outcome = scenarios::run_random_chaos_scenario(3, 20).unwrap();
    assert_eq!(check_all(&outcome.trace), check_all(&outcome.trace));
    for property in Property::ALL {
        assert_eq!(check(&outcome.trace, property), check(&outcome.trace, property));
    }
}

/// Online checking sees the trace grow
#[test]
fn test_online_check_while_running() {
    let mut fabric = Fabric::new(
        [
            NodeSpec::new(A, (), ScriptedBehavior::new([(0, ScriptedStep::new().send(OutgoingMessage::to(B)))])),
            NodeSpec::new(B, (), ScriptedBehavior::new([(2, ScriptedStep::new().read_visible())])),
        ],
        1,
    )
    .unwrap();

    fabric.run_ticks(2).unwrap();
    assert!(fabric.check(Property::NoLostMessages).is_unproven());

    fabric.step().unwrap();
    assert!(fabric.check(Property::NoLostMessages).holds());
}
