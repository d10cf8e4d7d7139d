//! Trace Persistence Tests
//!
//! Traces written to disk must replay every property check without
//! re-running the simulation, in both the JSON and the binary encoding.

use std::collections::BTreeMap;

use courier_simulation::{
    MessageId, NodeId, Property, QuotaState, SimConfig, SimError, Termination, Trace,
    TRACE_FORMAT_VERSION, check_all, scenarios,
};
use tempfile::TempDir;

fn chaos_trace(seed: u64) -> Trace<QuotaState> {
    SimConfig {
        nodes: NodeId::range_to('D'),
        pool_size: 16,
        ..SimConfig::default()
    }
    .with_seed(seed)
    .build_fabric()
    .unwrap()
    .run(12)
    .trace
}

#[test]
fn test_json_trace_replays_checks() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("chaos.json");

    let trace = chaos_trace(11);
    trace.save(&path).unwrap();
    let loaded: Trace<QuotaState> = Trace::load(&path).unwrap();

    assert_eq!(loaded, trace);
    assert_eq!(check_all(&loaded), check_all(&trace));
}

#[test]
fn test_binary_trace_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("chaos.bin");

    let trace = chaos_trace(12);
    trace.save(&path).unwrap();
    let loaded: Trace<QuotaState> = Trace::load(&path).unwrap();

    assert_eq!(loaded, trace);
    assert!(std::fs::metadata(&path).unwrap().len() < trace.to_json().unwrap().len() as u64);
}

#[test]
fn test_untyped_states_check_the_same() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("reorder.json");

    let outcome = scenarios::run_reordering_scenario().unwrap();
    outcome.trace.save(&path).unwrap();

    let untyped: Trace<serde_json::Value> = Trace::load(&path).unwrap();
    for ((p1, typed), (p2, loaded)) in check_all(&outcome.trace)
        .into_iter()
        .zip(check_all(&untyped))
    {
        assert_eq!(p1, p2);
        assert_eq!(typed, loaded, "{p1}");
    }
    assert!(
        check_all(&untyped)
            .iter()
            .any(|(p, v)| *p == Property::ReadInOrder && v.is_violated())
    );
}

#[test]
fn test_halt_reason_is_persisted() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("halted.json");

    let outcome = scenarios::run_invisible_read_scenario().unwrap();
    outcome.trace.save(&path).unwrap();
    let loaded: Trace<()> = Trace::load(&path).unwrap();

    match loaded.termination {
        Some(Termination::Halted(err)) => {
            assert_eq!(err.node(), Some(NodeId('B')));
            assert_eq!(err.message(), Some(MessageId(0)));
        }
        other => panic!("expected a halted trace, got {other:?}"),
    }
}

#[test]
fn test_binary_trace_keeps_its_state_type() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("halted.bin");

    let outcome = scenarios::run_invisible_read_scenario().unwrap();
    outcome.trace.save(&path).unwrap();

    // Unit states must not pass for quota states
    assert!(matches!(
        Trace::<QuotaState>::load(&path).unwrap_err(),
        SimError::Json(_)
    ));

    let untyped: Trace<serde_json::Value> = Trace::load(&path).unwrap();
    assert_eq!(untyped.termination, outcome.trace.termination);
    assert_eq!(check_all(&untyped), check_all(&outcome.trace));

    let chaos = dir.path().join("chaos.bin");
    let trace = chaos_trace(4);
    trace.save(&chaos).unwrap();
    let untyped: Trace<serde_json::Value> = Trace::load(&chaos).unwrap();
    assert_eq!(
        untyped.final_states,
        trace
            .final_states
            .iter()
            .map(|(id, s)| (*id, serde_json::to_value(s).unwrap()))
            .collect::<BTreeMap<_, _>>()
    );
}

#[test]
fn test_rejects_corrupt_and_foreign_traces() {
    let dir = TempDir::new().unwrap();

    let garbage = dir.path().join("garbage.json");
    std::fs::write(&garbage, "{ not a trace").unwrap();
    assert!(matches!(
        Trace::<()>::load(&garbage).unwrap_err(),
        SimError::Json(_)
    ));

    let mut value = serde_json::to_value(chaos_trace(1)).unwrap();
    value["meta"]["format_version"] = serde_json::json!(TRACE_FORMAT_VERSION + 1);
    let future = dir.path().join("future.json");
    std::fs::write(&future, value.to_string()).unwrap();
    assert!(matches!(
        Trace::<QuotaState>::load(&future).unwrap_err(),
        SimError::TraceVersion { .. }
    ));

    let missing = dir.path().join("missing.json");
    assert!(matches!(
        Trace::<()>::load(&missing).unwrap_err(),
        SimError::Io(_)
    ));
}
