//! # Core Type Definitions
//!
//! This module contains the value types shared by the gate, the queue and the
//! dispatch tables:
//! - Argument representation (`ArgType`, `ArgValue`, `Arg`)
//! - Queue eligibility (`CallKind`)
//! - Error types (`GateError`, `ConfigurationError`, `CallError`)
//!
//! ## Fault Taxonomy
//!
//! - A `ConfigurationError` means the submission itself is wrong. It surfaces
//!   at the call site and nothing is queued.
//! - A `CallError` is raised by an operation that did run. The gate wraps it in
//!   `GateError::Invocation` and hands it to whichever thread triggered the run.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// =============================================================================
// ARGUMENT TYPES
// =============================================================================

/// Declared type of an operation parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArgType {
    Bool,
    I32,
    I64,
    F64,
    Str,
    Bytes,
}

impl ArgType {
    /// Whether a `Null` value may be passed for a parameter of this type.
    #[must_use]
    pub const fn is_nullable(self) -> bool {
        matches!(self, ArgType::Str | ArgType::Bytes)
    }

    /// Lowercase name, as used in scenario files.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            ArgType::Bool => "bool",
            ArgType::I32 => "i32",
            ArgType::I64 => "i64",
            ArgType::F64 => "f64",
            ArgType::Str => "str",
            ArgType::Bytes => "bytes",
        }
    }
}

impl fmt::Display for ArgType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for ArgType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bool" => Ok(ArgType::Bool),
            "i32" => Ok(ArgType::I32),
            "i64" => Ok(ArgType::I64),
            "f64" => Ok(ArgType::F64),
            "str" => Ok(ArgType::Str),
            "bytes" => Ok(ArgType::Bytes),
            other => Err(format!("unknown argument type '{}'", other)),
        }
    }
}

// =============================================================================
// ARGUMENT VALUES
// =============================================================================

/// A bound argument value.
///
/// Values are captured at submission time and handed to the operation
/// unchanged when it finally runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ArgValue {
    Bool(bool),
    I32(i32),
    I64(i64),
    F64(f64),
    Str(String),
    Bytes(Vec<u8>),
    /// Absent value. Only accepted when paired with an explicit nullable type.
    Null,
}

impl ArgValue {
    /// The type this value matches when no explicit type is given.
    ///
    /// `Null` has no natural type.
    #[must_use]
    pub const fn natural_type(&self) -> Option<ArgType> {
        match self {
            ArgValue::Bool(_) => Some(ArgType::Bool),
            ArgValue::I32(_) => Some(ArgType::I32),
            ArgValue::I64(_) => Some(ArgType::I64),
            ArgValue::F64(_) => Some(ArgType::F64),
            ArgValue::Str(_) => Some(ArgType::Str),
            ArgValue::Bytes(_) => Some(ArgType::Bytes),
            ArgValue::Null => None,
        }
    }

    fn describe(&self) -> &'static str {
        self.natural_type().map_or("null", ArgType::name)
    }

    fn mismatch(&self, index: usize, expected: ArgType) -> CallError {
        CallError::BadArgument {
            index,
            expected,
            actual: self.describe(),
        }
    }

    pub fn as_bool(&self, index: usize) -> Result<bool, CallError> {
        match self {
            ArgValue::Bool(v) => Ok(*v),
            other => Err(other.mismatch(index, ArgType::Bool)),
        }
    }

    pub fn as_i32(&self, index: usize) -> Result<i32, CallError> {
        match self {
            ArgValue::I32(v) => Ok(*v),
            other => Err(other.mismatch(index, ArgType::I32)),
        }
    }

    pub fn as_i64(&self, index: usize) -> Result<i64, CallError> {
        match self {
            ArgValue::I64(v) => Ok(*v),
            other => Err(other.mismatch(index, ArgType::I64)),
        }
    }

    pub fn as_f64(&self, index: usize) -> Result<f64, CallError> {
        match self {
            ArgValue::F64(v) => Ok(*v),
            other => Err(other.mismatch(index, ArgType::F64)),
        }
    }

    /// Borrow a string argument. `Null` reads as `None`.
    pub fn as_str(&self, index: usize) -> Result<Option<&str>, CallError> {
        match self {
            ArgValue::Str(v) => Ok(Some(v.as_str())),
            ArgValue::Null => Ok(None),
            other => Err(other.mismatch(index, ArgType::Str)),
        }
    }

    /// Borrow a byte-string argument. `Null` reads as `None`.
    pub fn as_bytes(&self, index: usize) -> Result<Option<&[u8]>, CallError> {
        match self {
            ArgValue::Bytes(v) => Ok(Some(v.as_slice())),
            ArgValue::Null => Ok(None),
            other => Err(other.mismatch(index, ArgType::Bytes)),
        }
    }
}

impl From<bool> for ArgValue {
    fn from(v: bool) -> Self {
        ArgValue::Bool(v)
    }
}

impl From<i32> for ArgValue {
    fn from(v: i32) -> Self {
        ArgValue::I32(v)
    }
}

impl From<i64> for ArgValue {
    fn from(v: i64) -> Self {
        ArgValue::I64(v)
    }
}

impl From<f64> for ArgValue {
    fn from(v: f64) -> Self {
        ArgValue::F64(v)
    }
}

impl From<&str> for ArgValue {
    fn from(v: &str) -> Self {
        ArgValue::Str(v.to_string())
    }
}

impl From<String> for ArgValue {
    fn from(v: String) -> Self {
        ArgValue::Str(v)
    }
}

impl From<Vec<u8>> for ArgValue {
    fn from(v: Vec<u8>) -> Self {
        ArgValue::Bytes(v)
    }
}

// =============================================================================
// ARGUMENT (value + optional type marker)
// =============================================================================

/// One submitted argument.
///
/// Overloads are selected by the argument types. When the natural type of a
/// value is not the one wanted (or the value is `Null`), pair it with an
/// explicit type marker via [`Arg::typed`].
#[derive(Debug, Clone, PartialEq)]
pub struct Arg {
    /// The bound value.
    pub value: ArgValue,
    /// Explicit type marker, if any.
    pub declared: Option<ArgType>,
}

impl Arg {
    /// An argument matched by the value's natural type.
    #[must_use]
    pub fn new(value: impl Into<ArgValue>) -> Self {
        Self {
            value: value.into(),
            declared: None,
        }
    }

    /// An argument paired with an explicit type marker.
    #[must_use]
    pub fn typed(declared: ArgType, value: impl Into<ArgValue>) -> Self {
        Self {
            value: value.into(),
            declared: Some(declared),
        }
    }

    /// A null argument for a nullable parameter type.
    #[must_use]
    pub fn null(declared: ArgType) -> Self {
        Self {
            value: ArgValue::Null,
            declared: Some(declared),
        }
    }

    /// Type used for signature matching.
    pub fn effective_type(&self, index: usize) -> Result<ArgType, ConfigurationError> {
        match (self.declared, self.value.natural_type()) {
            (Some(declared), Some(actual)) if declared == actual => Ok(declared),
            (Some(declared), None) if declared.is_nullable() => Ok(declared),
            (Some(declared), _) => Err(ConfigurationError::ArgumentTypeMismatch {
                index,
                declared,
                actual: self.value.describe(),
            }),
            (None, Some(actual)) => Ok(actual),
            (None, None) => Err(ConfigurationError::UntypedNull { index }),
        }
    }
}

// =============================================================================
// CALL KIND
// =============================================================================

/// Whether an operation may be deferred.
///
/// A `Handoff` operation posts its work to the thread that owns the subsystem,
/// so it behaves the same whether it runs on the submitting thread or on the
/// thread performing a transition. A `Direct` operation runs its body in place
/// and is never accepted for deferral.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallKind {
    Handoff,
    Direct,
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// A submission that cannot be resolved or is not eligible for deferral.
///
/// These are usage faults: they are never retried and nothing is queued.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    /// No operation with this name exists in the dispatch table.
    #[error("Unknown operation: {0}")]
    UnknownOperation(String),

    /// Operations with this name exist, but none accepts these argument types.
    #[error("No signature of '{name}' accepts ({})", join_types(.found))]
    NoMatchingSignature { name: String, found: Vec<ArgType> },

    /// An instance operation was submitted without a target, or a static
    /// operation with one.
    #[error("Operation '{name}' is {expected}, but the target is {actual}")]
    TargetMismatch {
        name: String,
        expected: &'static str,
        actual: &'static str,
    },

    /// The operation runs in place and cannot be queued.
    #[error("Operation '{0}' is not a handoff call and cannot be queued")]
    NotQueueable(String),

    /// An explicit type marker does not fit the value it is paired with.
    #[error("Argument {index} declared as {declared} but holds {actual}")]
    ArgumentTypeMismatch {
        index: usize,
        declared: ArgType,
        actual: &'static str,
    },

    /// A null argument was passed without an explicit type marker.
    #[error("Argument {index} is null and has no type marker")]
    UntypedNull { index: usize },

    /// A dispatch table already holds this name with these parameter types.
    #[error("Operation '{name}' already registered for ({})", join_types(.params))]
    DuplicateSignature { name: String, params: Vec<ArgType> },
}

fn join_types(types: &[ArgType]) -> String {
    types
        .iter()
        .map(|t| t.name())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Failure raised by an operation body.
#[derive(Debug, Error)]
pub enum CallError {
    /// The operation reported a failure.
    #[error("{0}")]
    Failed(String),

    /// An argument did not have the type the operation reads it as.
    #[error("Argument {index}: expected {expected}, got {actual}")]
    BadArgument {
        index: usize,
        expected: ArgType,
        actual: &'static str,
    },

    /// Any other error from the subsystem.
    #[error(transparent)]
    Source(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// Errors surfaced by the gate.
#[derive(Debug, Error)]
pub enum GateError {
    /// The submission was rejected before anything ran.
    #[error("Configuration fault: {0}")]
    Configuration(#[from] ConfigurationError),

    /// An operation ran and failed.
    #[error("Invocation fault in '{operation}': {source}")]
    Invocation {
        operation: String,
        #[source]
        source: CallError,
    },
}

impl GateError {
    /// Whether this is a configuration fault.
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(self, GateError::Configuration(_))
    }
}

// =============================================================================
// TESTS
// =============================================================================
