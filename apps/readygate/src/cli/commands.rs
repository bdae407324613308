//! # CLI Command Implementations

use readygate::{
    RunReport, Scenario, ScenarioError, StepOutcome, describe_operations, dispatch_table,
};
use readygate_core::{CallKind, EngineState, Submission};
use std::path::Path;

// =============================================================================
// RUN COMMAND
// =============================================================================

/// Replay a scenario and print its report.
pub fn cmd_run(file: &Path, json_mode: bool) -> Result<(), ScenarioError> {
    let scenario = Scenario::load(file)?;
    tracing::debug!(
        path = %file.display(),
        steps = scenario.steps.len(),
        initial = %scenario.initial,
        ready = %scenario.ready,
        "scenario loaded"
    );

    let report = scenario.run()?;

    if json_mode {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).unwrap_or_default()
        );
        return Ok(());
    }

    print_report(&report);
    Ok(())
}

fn print_report(report: &RunReport) {
    println!("Scenario Run");
    println!("============");
    println!();

    for outcome in &report.steps {
        match outcome {
            StepOutcome::Submitted {
                step,
                operation,
                outcome,
            } => {
                let label = match outcome {
                    Submission::Executed => "executed",
                    Submission::Queued => "queued",
                };
                println!("  [{:>3}] submit {:<16} {}", step, operation, label);
            }
            StepOutcome::Transitioned {
                step,
                to,
                applied,
                pending_after,
            } => {
                let label = if *applied { "applied" } else { "skipped" };
                println!(
                    "  [{:>3}] -> {:<20} {} ({} pending)",
                    step, to, label, pending_after
                );
            }
        }
    }

    println!();
    println!("Execution order:");
    for entry in &report.journal {
        println!(
            "  {:>3}. {:<16} step {:<3} on {}",
            entry.seq, entry.operation, entry.step, entry.thread
        );
    }

    println!();
    println!("Final State: {}", report.final_state);
    println!("Ready:       {}", report.ready);
    println!("Pending:     {}", report.pending);
    println!(
        "Profile:     {}",
        report.engine.profile.as_deref().unwrap_or("(none)")
    );
    println!("Prefs:       {}", report.engine.prefs.len());
    println!("Windows:     {}", report.engine.windows.len());
}

// =============================================================================
// CHECK COMMAND
// =============================================================================

/// Resolve every submission of a scenario.
pub fn cmd_check(file: &Path, json_mode: bool) -> Result<(), ScenarioError> {
    let scenario = Scenario::load(file)?;
    let checked = scenario.check()?;

    if json_mode {
        let output = serde_json::json!({
            "file": file.display().to_string(),
            "steps": scenario.steps.len(),
            "submissions": checked,
            "valid": true,
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&output).unwrap_or_default()
        );
        return Ok(());
    }

    println!(
        "{}: {} steps, {} submissions resolved",
        file.display(),
        scenario.steps.len(),
        checked.len()
    );
    for submission in &checked {
        println!(
            "  [{:>3}] {:<16} requires {:<16} {} args",
            submission.step,
            submission.operation,
            submission.requires,
            submission.args.len()
        );
    }
    Ok(())
}

// =============================================================================
// OPERATIONS COMMAND
// =============================================================================

/// List the operations a scenario may submit.
pub fn cmd_operations(json_mode: bool) -> Result<(), ScenarioError> {
    let table = dispatch_table()?;
    let operations = describe_operations(&table);

    if json_mode {
        println!(
            "{}",
            serde_json::to_string_pretty(&operations).unwrap_or_default()
        );
        return Ok(());
    }

    println!("Bridge Operations");
    println!("=================");
    for op in &operations {
        let params: Vec<String> = op.params.iter().map(ToString::to_string).collect();
        let kind = match op.kind {
            CallKind::Handoff => "handoff",
            CallKind::Direct => "direct",
        };
        println!(
            "  {:<14} ({}) {} {}",
            op.name,
            params.join(", "),
            op.target,
            kind
        );
    }
    Ok(())
}

// =============================================================================
// STATES COMMAND
// =============================================================================

/// Print the lifecycle states in order.
pub fn cmd_states(json_mode: bool) {
    if json_mode {
        println!(
            "{}",
            serde_json::to_string_pretty(&EngineState::ALL).unwrap_or_default()
        );
        return;
    }

    println!("Lifecycle States");
    println!("================");
    for (rank, state) in EngineState::ALL.iter().enumerate() {
        let marker = if state.is_terminal() { " (terminal)" } else { "" };
        println!("  {}. {}{}", rank, state, marker);
    }
}
