//! # Scenario Files
//!
//! A scenario is a TOML file describing an engine lifecycle: where the gate
//! starts, which state counts as ready, and an ordered list of steps.
//!
//! ```toml
//! initial = "initial"
//! ready = "running"
//!
//! [queue]
//! initial_capacity = 8
//!
//! [[steps]]
//! kind = "submit"
//! operation = "load_profile"
//! requires = "profile-ready"
//! args = ["default"]
//!
//! [[steps]]
//! kind = "concurrent"
//! submissions = [
//!     { operation = "set_pref", requires = "running", args = ["cache.size", 64] },
//!     { operation = "require_abi", requires = "launched", target = "static", args = [{ type = "i32", value = 3 }] },
//! ]
//!
//! [[steps]]
//! kind = "transition"
//! to = "profile-ready"
//! expect = "initial"
//! ```
//!
//! ## Arguments
//!
//! Plain TOML values map to their natural type: strings to `str`, integers to
//! `i64`, floats to `f64`, booleans to `bool`. A table `{ type, value }` pairs
//! a value with an explicit type; omitting `value` passes a null.

use crate::bridge::{self, BridgeSnapshot, EngineBridge};
use crate::journal::{Journal, JournalEntry};
use readygate_core::{
    Arg, ArgType, ArgValue, ConfigurationError, DispatchTable, EngineState, GateError,
    QueueConfig, StateGate, Submission, Target,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::thread;
use thiserror::Error;

// =============================================================================
// ERRORS
// =============================================================================

/// Errors raised while loading or replaying a scenario.
#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("Cannot read scenario '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid scenario: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Step {step}, argument {index}: {reason}")]
    InvalidArgument {
        step: usize,
        index: usize,
        reason: String,
    },

    #[error("Step {step}: {source}")]
    Gate {
        step: usize,
        #[source]
        source: GateError,
    },

    #[error("Bridge table: {0}")]
    Bridge(#[from] ConfigurationError),

    #[error("Cannot start worker thread: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("Worker thread panicked during step {0}")]
    WorkerPanicked(usize),
}

// =============================================================================
// SCENARIO MODEL
// =============================================================================

/// A parsed scenario file.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    pub initial: EngineState,
    pub ready: EngineState,
    #[serde(default)]
    pub queue: QueueConfig,
    #[serde(default)]
    pub steps: Vec<Step>,
}

/// One scenario step.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Step {
    /// Submit one call from the driver thread.
    Submit(SubmitRequest),
    /// Move the gate, optionally only from an exact state.
    Transition {
        to: EngineState,
        #[serde(default)]
        expect: Option<EngineState>,
    },
    /// Submit several calls at once, each from its own worker thread.
    Concurrent { submissions: Vec<SubmitRequest> },
}

/// Which kind of target a submission resolves against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    #[default]
    Instance,
    Static,
}

/// A call to submit.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitRequest {
    pub operation: String,
    pub requires: EngineState,
    #[serde(default)]
    pub args: Vec<toml::Value>,
    #[serde(default)]
    pub target: TargetKind,
}

impl SubmitRequest {
    /// Convert the TOML arguments.
    pub fn to_args(&self, step: usize) -> Result<Vec<Arg>, ScenarioError> {
        self.args
            .iter()
            .enumerate()
            .map(|(index, value)| {
                to_arg(value).map_err(|reason| ScenarioError::InvalidArgument {
                    step,
                    index,
                    reason,
                })
            })
            .collect()
    }
}

fn to_arg(value: &toml::Value) -> Result<Arg, String> {
    match value {
        toml::Value::String(s) => Ok(Arg::new(s.as_str())),
        toml::Value::Integer(i) => Ok(Arg::new(*i)),
        toml::Value::Float(f) => Ok(Arg::new(*f)),
        toml::Value::Boolean(b) => Ok(Arg::new(*b)),
        toml::Value::Table(table) => typed_arg(table),
        other => Err(format!("unsupported argument of type {}", other.type_str())),
    }
}

fn typed_arg(table: &toml::Table) -> Result<Arg, String> {
    if let Some(key) = table.keys().find(|k| *k != "type" && *k != "value") {
        return Err(format!("unexpected key '{}' in typed argument", key));
    }

    let declared: ArgType = table
        .get("type")
        .and_then(toml::Value::as_str)
        .ok_or("typed argument needs a 'type' string")?
        .parse()?;

    let Some(value) = table.get("value") else {
        return Ok(Arg::null(declared));
    };

    let value = match (declared, value) {
        (ArgType::Bool, toml::Value::Boolean(b)) => ArgValue::Bool(*b),
        (ArgType::I32, toml::Value::Integer(i)) => ArgValue::I32(
            i32::try_from(*i).map_err(|_| format!("{} does not fit in i32", i))?,
        ),
        (ArgType::I64, toml::Value::Integer(i)) => ArgValue::I64(*i),
        (ArgType::F64, toml::Value::Float(f)) => ArgValue::F64(*f),
        (ArgType::Str, toml::Value::String(s)) => ArgValue::Str(s.clone()),
        (ArgType::Bytes, toml::Value::String(s)) => ArgValue::Bytes(s.as_bytes().to_vec()),
        (ArgType::Bytes, toml::Value::Array(items)) => ArgValue::Bytes(
            items
                .iter()
                .map(|item| item.as_integer().and_then(|i| u8::try_from(i).ok()))
                .collect::<Option<Vec<u8>>>()
                .ok_or("bytes array must hold integers 0-255")?,
        ),
        (declared, other) => {
            return Err(format!("{} cannot hold a {}", declared, other.type_str()));
        }
    };

    Ok(Arg::typed(declared, value))
}

// =============================================================================
// RUN REPORT
// =============================================================================

/// What a step did.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum StepOutcome {
    Submitted {
        step: usize,
        operation: String,
        outcome: Submission,
    },
    Transitioned {
        step: usize,
        to: EngineState,
        applied: bool,
        pending_after: usize,
    },
}

/// A submission that resolved against the bridge table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckedSubmission {
    pub step: usize,
    pub operation: String,
    pub requires: EngineState,
    pub args: Vec<ArgValue>,
}

/// Result of replaying a scenario.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub final_state: EngineState,
    pub ready: bool,
    pub pending: usize,
    pub steps: Vec<StepOutcome>,
    pub journal: Vec<JournalEntry>,
    pub engine: BridgeSnapshot,
}

// =============================================================================
// RUNNER
// =============================================================================

struct RunContext {
    gate: StateGate<EngineState>,
    table: DispatchTable<EngineBridge>,
    instance: Target<EngineBridge>,
    journal: Journal,
}

impl RunContext {
    fn target(&self, kind: TargetKind) -> Target<EngineBridge> {
        match kind {
            TargetKind::Instance => self.instance.clone(),
            TargetKind::Static => Target::Static,
        }
    }

    fn submit(&self, step: usize, request: &SubmitRequest) -> Result<Submission, ScenarioError> {
        let args = request.to_args(step)?;
        let call = self
            .table
            .resolve(&self.target(request.target), &request.operation, args)
            .map_err(|e| ScenarioError::Gate {
                step,
                source: e.into(),
            })?;

        self.gate
            .submit_if_not_ready(request.requires, self.journal.wrap(step, call))
            .map_err(|source| ScenarioError::Gate { step, source })
    }

    fn submit_concurrently(
        &self,
        step: usize,
        requests: &[SubmitRequest],
    ) -> Result<Vec<Submission>, ScenarioError> {
        let results = thread::scope(|scope| {
            let handles = requests
                .iter()
                .enumerate()
                .map(|(worker, request)| {
                    thread::Builder::new()
                        .name(format!("worker-{}", worker))
                        .spawn_scoped(scope, move || self.submit(step, request))
                })
                .collect::<Result<Vec<_>, _>>()
                .map_err(ScenarioError::Spawn)?;

            Ok::<_, ScenarioError>(
                handles
                    .into_iter()
                    .map(|h| {
                        h.join()
                            .unwrap_or_else(|_| Err(ScenarioError::WorkerPanicked(step)))
                    })
                    .collect::<Vec<_>>(),
            )
        })?;

        results.into_iter().collect()
    }
}

impl Scenario {
    /// Parse a scenario from TOML text.
    pub fn from_toml(text: &str) -> Result<Self, ScenarioError> {
        Ok(toml::from_str(text)?)
    }

    /// Read and parse a scenario file.
    pub fn load(path: &Path) -> Result<Self, ScenarioError> {
        let text = std::fs::read_to_string(path).map_err(|source| ScenarioError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    /// Every submission, paired with its step index.
    pub fn submissions(&self) -> impl Iterator<Item = (usize, &SubmitRequest)> {
        self.steps
            .iter()
            .enumerate()
            .flat_map(|(index, step)| match step {
                Step::Submit(request) => vec![(index, request)],
                Step::Concurrent { submissions } => {
                    submissions.iter().map(|request| (index, request)).collect()
                }
                Step::Transition { .. } => Vec::new(),
            })
    }

    /// Resolve every submission without running anything.
    ///
    /// Returns each submission with the argument values it would be called
    /// with.
    pub fn check(&self) -> Result<Vec<CheckedSubmission>, ScenarioError> {
        let table = bridge::dispatch_table()?;
        let instance = Target::instance(EngineBridge::new());
        let mut checked = Vec::new();

        for (step, request) in self.submissions() {
            let target = match request.target {
                TargetKind::Instance => instance.clone(),
                TargetKind::Static => Target::Static,
            };
            let call = table
                .resolve(&target, &request.operation, request.to_args(step)?)
                .map_err(|e| ScenarioError::Gate {
                    step,
                    source: e.into(),
                })?;
            checked.push(CheckedSubmission {
                step,
                operation: request.operation.clone(),
                requires: request.requires,
                args: call.args().to_vec(),
            });
        }

        Ok(checked)
    }

    /// Replay the scenario against a fresh gate and engine bridge.
    pub fn run(&self) -> Result<RunReport, ScenarioError> {
        let bridge = std::sync::Arc::new(EngineBridge::new());
        let ctx = RunContext {
            gate: StateGate::with_config(self.initial, self.ready, &self.queue),
            table: bridge::dispatch_table()?,
            instance: Target::Instance(std::sync::Arc::clone(&bridge)),
            journal: Journal::new(),
        };
        let mut outcomes = Vec::with_capacity(self.steps.len());

        for (step, entry) in self.steps.iter().enumerate() {
            match entry {
                Step::Submit(submit) => {
                    let outcome = ctx.submit(step, submit)?;
                    tracing::info!(step, operation = %submit.operation, ?outcome, "submitted");
                    outcomes.push(StepOutcome::Submitted {
                        step,
                        operation: submit.operation.clone(),
                        outcome,
                    });
                }
                Step::Transition { to, expect } => {
                    let applied = ctx
                        .gate
                        .check_and_set_state(*expect, *to)
                        .map_err(|source| ScenarioError::Gate { step, source })?;
                    let pending_after = ctx.gate.pending_len();
                    tracing::info!(step, to = %to, applied, pending_after, "transition");
                    outcomes.push(StepOutcome::Transitioned {
                        step,
                        to: *to,
                        applied,
                        pending_after,
                    });
                }
                Step::Concurrent { submissions } => {
                    let results = ctx.submit_concurrently(step, submissions)?;
                    tracing::info!(step, workers = submissions.len(), "concurrent submissions");
                    for (submit, outcome) in submissions.iter().zip(results) {
                        outcomes.push(StepOutcome::Submitted {
                            step,
                            operation: submit.operation.clone(),
                            outcome,
                        });
                    }
                }
            }
        }

        Ok(RunReport {
            final_state: ctx.gate.state(),
            ready: ctx.gate.is_ready(),
            pending: ctx.gate.pending_len(),
            steps: outcomes,
            journal: ctx.journal.entries(),
            engine: bridge.snapshot(),
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_arguments_use_natural_types() {
        let scenario = Scenario::from_toml(
            r#"
            initial = "initial"
            ready = "running"

            [[steps]]
            kind = "submit"
            operation = "set_pref"
            requires = "running"
            args = ["a", 1, true, 1.5]
            "#,
        )
        .expect("parse");

        let (_, request) = scenario.submissions().next().expect("one submission");
        let args = request.to_args(0).expect("args");
        let types: Vec<_> = args
            .iter()
            .map(|a| a.value.natural_type())
            .collect();
        assert_eq!(
            types,
            vec![
                Some(ArgType::Str),
                Some(ArgType::I64),
                Some(ArgType::Bool),
                Some(ArgType::F64)
            ]
        );
    }

    #[test]
    fn typed_arguments() {
        let mut table = toml::Table::new();
        table.insert("type".into(), toml::Value::String("i32".into()));
        table.insert("value".into(), toml::Value::Integer(7));
        assert_eq!(typed_arg(&table), Ok(Arg::typed(ArgType::I32, 7i32)));

        table.insert("value".into(), toml::Value::Integer(i64::MAX));
        assert!(typed_arg(&table).is_err());

        let mut null = toml::Table::new();
        null.insert("type".into(), toml::Value::String("str".into()));
        assert_eq!(typed_arg(&null), Ok(Arg::null(ArgType::Str)));

        null.insert("extra".into(), toml::Value::Boolean(true));
        assert!(typed_arg(&null).is_err());
    }

    #[test]
    fn unknown_state_is_parse_error() {
        let err = Scenario::from_toml("initial = \"booting\"\nready = \"running\"\n")
            .expect_err("bad state");
        assert!(matches!(err, ScenarioError::Parse(_)));
    }

    #[test]
    fn default_queue_config() {
        let scenario =
            Scenario::from_toml("initial = \"initial\"\nready = \"running\"\n").expect("parse");
        assert_eq!(scenario.queue, QueueConfig::default());
        assert!(scenario.steps.is_empty());
    }
}
