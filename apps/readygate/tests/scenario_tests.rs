//! Integration tests for scenario loading and replay.

#![allow(clippy::unwrap_used, clippy::panic)]

use readygate::{Scenario, ScenarioError, StepOutcome};
use readygate_core::{ArgValue, EngineState, GateError, Submission};
use std::io::Write;
use std::path::PathBuf;

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

fn write_scenario(text: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(text.as_bytes()).unwrap();
    file
}

fn demo_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../demos/startup.toml")
}

const HEADER: &str = "initial = \"initial\"\nready = \"running\"\n";

// =============================================================================
// LOADING
// =============================================================================

#[test]
fn test_load_demo_scenario() {
    let scenario = Scenario::load(&demo_path()).unwrap();
    assert_eq!(scenario.initial, EngineState::Initial);
    assert_eq!(scenario.ready, EngineState::Running);
    assert_eq!(scenario.steps.len(), 7);

    let checked = scenario.check().unwrap();
    assert_eq!(checked.len(), 6);
    assert_eq!(checked[0].operation, "require_abi");
    assert_eq!(checked[0].requires, EngineState::LibsReady);
    assert_eq!(checked[0].args, vec![ArgValue::I32(3)]);
    // The null window argument is carried through resolution.
    assert_eq!(checked[4].args, vec![ArgValue::Null]);
}

#[test]
fn test_load_missing_file() {
    let err = Scenario::load(std::path::Path::new("does/not/exist.toml")).unwrap_err();
    assert!(matches!(err, ScenarioError::Io { .. }));
}

#[test]
fn test_load_from_temp_file() {
    let file = write_scenario(&format!(
        "{HEADER}[[steps]]\nkind = \"transition\"\nto = \"launched\"\n"
    ));
    let scenario = Scenario::load(file.path()).unwrap();
    assert_eq!(scenario.steps.len(), 1);
}

// =============================================================================
// REPLAY
// =============================================================================

#[test]
fn test_run_demo_scenario() {
    let report = Scenario::load(&demo_path()).unwrap().run().unwrap();

    assert_eq!(report.final_state, EngineState::Running);
    assert!(report.ready);
    assert_eq!(report.pending, 0);

    let order: Vec<_> = report.journal.iter().map(|e| e.operation.as_str()).collect();
    assert_eq!(order[0], "require_abi");
    assert_eq!(order[1], "load_profile");
    assert_eq!(order.len(), 6);
    // The late window was queued after the concurrent batch.
    assert_eq!(order[5], "open_window");

    // require_abi ran on the thread that reached libs-ready.
    assert_eq!(report.journal[0].step, 0);
    assert_eq!(report.journal[0].thread, report.journal[1].thread);

    assert_eq!(report.engine.profile.as_deref(), Some("default"));
    assert_eq!(
        report.engine.prefs.get("javascript.enabled"),
        Some(&ArgValue::Bool(true))
    );
    assert_eq!(report.engine.windows.len(), 2);
    assert_eq!(report.engine.windows[1], "https://example.org");
}

#[test]
fn test_submit_after_ready_executes() {
    let text = format!(
        "{HEADER}
[[steps]]
kind = \"transition\"
to = \"running\"

[[steps]]
kind = \"submit\"
operation = \"load_profile\"
requires = \"profile-ready\"
args = [\"p\"]
"
    );
    let report = Scenario::from_toml(&text).unwrap().run().unwrap();

    assert_eq!(
        report.steps[1],
        StepOutcome::Submitted {
            step: 1,
            operation: "load_profile".to_string(),
            outcome: Submission::Executed,
        }
    );
}

#[test]
fn test_guarded_transition_skipped() {
    let text = format!(
        "{HEADER}
[[steps]]
kind = \"submit\"
operation = \"load_profile\"
requires = \"launched\"
args = [\"p\"]

[[steps]]
kind = \"transition\"
to = \"running\"
expect = \"launched\"
"
    );
    let report = Scenario::from_toml(&text).unwrap().run().unwrap();

    assert_eq!(
        report.steps[1],
        StepOutcome::Transitioned {
            step: 1,
            to: EngineState::Running,
            applied: false,
            pending_after: 1,
        }
    );
    assert_eq!(report.final_state, EngineState::Initial);
    assert!(report.journal.is_empty());
}

#[test]
fn test_direct_operation_is_rejected() {
    let text = format!(
        "{HEADER}
[[steps]]
kind = \"submit\"
operation = \"dump_state\"
requires = \"running\"
"
    );
    let scenario = Scenario::from_toml(&text).unwrap();

    let err = scenario.check().unwrap_err();
    match err {
        ScenarioError::Gate { step, source } => {
            assert_eq!(step, 0);
            assert!(source.is_configuration());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_failed_flush_surfaces_invocation_fault() {
    // set_pref without a profile fails when the gate reaches running.
    let text = format!(
        "{HEADER}
[[steps]]
kind = \"submit\"
operation = \"set_pref\"
requires = \"running\"
args = [\"a\", 1]

[[steps]]
kind = \"transition\"
to = \"running\"
"
    );
    let err = Scenario::from_toml(&text).unwrap().run().unwrap_err();
    match err {
        ScenarioError::Gate {
            step,
            source: GateError::Invocation { operation, .. },
        } => {
            assert_eq!(step, 1);
            assert_eq!(operation, "set_pref");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_invalid_typed_argument() {
    let text = format!(
        "{HEADER}
[[steps]]
kind = \"submit\"
operation = \"require_abi\"
requires = \"launched\"
target = \"static\"
args = [{{ type = \"i32\", value = \"three\" }}]
"
    );
    let err = Scenario::from_toml(&text).unwrap().check().unwrap_err();
    assert!(matches!(
        err,
        ScenarioError::InvalidArgument { step: 0, index: 0, .. }
    ));
}

#[test]
fn test_concurrent_submissions_all_queued() {
    let text = format!(
        "{HEADER}
[[steps]]
kind = \"concurrent\"
submissions = [
    {{ operation = \"open_window\", requires = \"running\", args = [\"a\"] }},
    {{ operation = \"open_window\", requires = \"running\", args = [\"b\"] }},
    {{ operation = \"open_window\", requires = \"running\", args = [\"c\"] }},
    {{ operation = \"open_window\", requires = \"running\", args = [\"d\"] }},
]
"
    );
    let report = Scenario::from_toml(&text).unwrap().run().unwrap();

    assert_eq!(report.pending, 4);
    assert!(report.steps.iter().all(|s| matches!(
        s,
        StepOutcome::Submitted {
            outcome: Submission::Queued,
            ..
        }
    )));
    assert!(report.engine.windows.is_empty());
}

#[test]
fn test_report_serializes() {
    let report = Scenario::load(&demo_path()).unwrap().run().unwrap();
    let json = serde_json::to_value(&report).unwrap();

    assert_eq!(json["final_state"], "running");
    assert_eq!(json["steps"][0]["kind"], "submitted");
    assert_eq!(json["steps"][0]["outcome"], "queued");

    let steps = json["steps"].as_array().unwrap();
    let first_transition = steps
        .iter()
        .find(|s| s["kind"] == "transitioned")
        .unwrap();
    assert_eq!(first_transition["to"], "launched");
    assert_eq!(first_transition["applied"], true);
    // The concurrent batch at step 2 yields one entry per submission.
    assert_eq!(steps.iter().filter(|s| s["step"] == 2).count(), 3);
}
