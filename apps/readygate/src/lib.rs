//! # readygate
//!
//! Scenario driver for `readygate-core`. A scenario replays submissions and
//! state transitions against a gate guarding a simulated engine bridge, and
//! reports what ran, where, and in which order.

pub mod bridge;
pub mod journal;
pub mod scenario;

pub use bridge::{
    BRIDGE_ABI, BridgeSnapshot, EngineBridge, OperationInfo, describe_operations, dispatch_table,
};
pub use journal::{Journal, JournalEntry, Journaled};
pub use scenario::{
    CheckedSubmission, RunReport, Scenario, ScenarioError, Step, StepOutcome, SubmitRequest,
    TargetKind,
};
