//! Standard span names used across the fabric

/// One scheduler tick
pub const TICK: &str = "tick";
/// Evaluation of one node's decision function
pub const DECIDE: &str = "decide";
/// Validation and commit phase of a tick
pub const COMMIT: &str = "commit";
/// A full bounded run
pub const RUN: &str = "run";
/// Evaluation of one property over a trace
pub const CHECK_PROPERTY: &str = "check_property";
