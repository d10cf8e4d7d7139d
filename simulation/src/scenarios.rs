//! Pre-defined fabric scenarios
//!
//! Scenarios A-E pin down the fabric's delivery, provisioning, ordering,
//! horizon and protocol-violation behavior; the chaos run drives seeded
//! random nodes.

use courier_core::{FabricError, MessageId, NodeId, OutgoingMessage};
use tracing::info;

use crate::behaviors::{QuotaState, ScriptedBehavior, ScriptedStep};
use crate::checker::{self, Verdict};
use crate::config::SimConfig;
use crate::fabric::{Fabric, RunOutcome};
use crate::node::NodeSpec;
use crate::trace::Termination;

const A: NodeId = NodeId('A');
const B: NodeId = NodeId('B');

fn send_to_b() -> ScriptedStep {
    ScriptedStep::new().send(OutgoingMessage::to(B))
}

/// Scenario A: A sends once to B, B reads on the first tick it can
///
/// ```text
/// tick 0  A sends m0 -> B      (pool 1 -> 0)
/// tick 1  B sees m0, reads it
/// ```
pub fn run_delivery_scenario() -> Result<RunOutcome<()>, FabricError> {
    info!("=== Running Delivery Scenario ===");

    let fabric = Fabric::new(
        [
            NodeSpec::new(A, (), ScriptedBehavior::new([(0, send_to_b())])),
            NodeSpec::new(
                B,
                (),
                ScriptedBehavior::new([(1, ScriptedStep::new().read_visible())]),
            ),
        ],
        1,
    )?;

    let outcome = fabric.run(3);
    println!("  Final pool available: {}", outcome.trace.final_available());
    Ok(outcome)
}

/// Scenario B: A intends to send twice but the pool only holds one atom
pub fn run_shortage_scenario() -> Result<RunOutcome<()>, FabricError> {
    info!("=== Running Shortage Scenario ===");

    let fabric = Fabric::new(
        [
            NodeSpec::new(
                A,
                (),
                ScriptedBehavior::new([(0, send_to_b()), (2, send_to_b())]),
            ),
            NodeSpec::new(
                B,
                (),
                ScriptedBehavior::new([(1, ScriptedStep::new().read_visible())]),
            ),
        ],
        1,
    )?;

    // Stop before A's second send would exhaust the pool
    Ok(fabric.run(2))
}

/// Scenario C: A sends m0 then m1 to B; B reads m1 before m0
pub fn run_reordering_scenario() -> Result<RunOutcome<()>, FabricError> {
    info!("=== Running Reordering Scenario ===");

    let fabric = Fabric::new(
        [
            NodeSpec::new(
                A,
                (),
                ScriptedBehavior::new([(0, send_to_b()), (1, send_to_b())]),
            ),
            NodeSpec::new(
                B,
                (),
                ScriptedBehavior::new([
                    (2, ScriptedStep::new().read(MessageId(1))),
                    (3, ScriptedStep::new().read(MessageId(0))),
                ]),
            ),
        ],
        2,
    )?;

    Ok(fabric.run(4))
}

/// Scenario D: A sends to B, B never reads, the horizon ends
pub fn run_unread_scenario() -> Result<RunOutcome<()>, FabricError> {
    info!("=== Running Unread Scenario ===");

    let fabric = Fabric::new(
        [
            NodeSpec::new(A, (), ScriptedBehavior::new([(0, send_to_b())])),
            NodeSpec::idle(B),
        ],
        1,
    )?;

    Ok(fabric.run(3))
}

/// Scenario E fabric: B tries to read m0 in the same tick A sends it
pub fn invisible_read_fabric() -> Result<Fabric<()>, FabricError> {
    Fabric::new(
        [
            NodeSpec::new(A, (), ScriptedBehavior::new([(0, send_to_b())])),
            NodeSpec::new(
                B,
                (),
                ScriptedBehavior::new([(0, ScriptedStep::new().read(MessageId(0)))]),
            ),
        ],
        1,
    )
}

/// Scenario E: a read outside the visible set halts the run
pub fn run_invisible_read_scenario() -> Result<RunOutcome<()>, FabricError> {
    info!("=== Running Invisible Read Scenario ===");

    let mut fabric = invisible_read_fabric()?;
    if let Err(err) = fabric.step() {
        println!("  Step failed at tick {}: {}", fabric.tick(), err);
    }
    Ok(fabric.run(3))
}

/// Chaos: seeded random nodes sending and reading from a shared pool
pub fn run_random_chaos_scenario(seed: u64, ticks: u64) -> Result<RunOutcome<QuotaState>, FabricError> {
    info!("=== Running Random Chaos Scenario ({} ticks, seed {}) ===", ticks, seed);

    let config = SimConfig {
        nodes: NodeId::range_to('F'),
        pool_size: 24,
        ..SimConfig::default()
    }
    .with_seed(seed)
    .with_max_ticks(ticks);

    let mut fabric = config.build_fabric()?;
    while fabric.tick() < ticks {
        if fabric.step().is_err() {
            break;
        }
        if fabric.tick().is_multiple_of(5) {
            println!("  {}", fabric.state_summary());
        }
    }

    let termination = match fabric.halt_reason() {
        Some(err) => Termination::Halted(err.clone()),
        None => Termination::HorizonReached {
            ticks: fabric.tick(),
        },
    };
    Ok(fabric.finish(termination))
}

/// Print the termination and every property verdict of a run
pub fn print_report<S>(outcome: &RunOutcome<S>) {
    let trace = &outcome.trace;
    println!("\n=== Run Report ===");
    println!("  Run id: {}", trace.meta.run_id);
    println!("  Ticks recorded: {}", trace.len());
    match &outcome.termination {
        Termination::HorizonReached { ticks } => println!("  Horizon reached after {ticks} ticks"),
        Termination::Halted(err) => println!("  Halted ({}): {}", err.kind(), err),
    }
    println!(
        "  Pool: {} of {} atoms left",
        trace.final_available(),
        trace.meta.pool_size
    );

    println!("\n=== Properties ===");
    for (property, verdict) in checker::check_all(trace) {
        println!("  {:<22} {}", property.name(), verdict);
        if let Verdict::Unproven(open) = &verdict {
            for witness in open {
                println!("      {witness}");
            }
        }
    }
}
