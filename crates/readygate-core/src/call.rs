//! # Handoff Calls
//!
//! A call may only be deferred if it hands its work to the thread that owns
//! the subsystem. Such a call behaves identically whether it runs on the
//! submitting thread or on whichever thread later performs the transition.
//!
//! Implementing [`HandoffCall`] is the explicit marker that a type is such a
//! call. Closures can be marked with [`Handoff::new`].

use crate::types::{CallError, GateError};
use std::fmt;

// =============================================================================
// HANDOFF CALL TRAIT
// =============================================================================

/// A call that is safe to run from any thread.
pub trait HandoffCall: Send + 'static {
    /// Name used in logs and invocation faults.
    fn name(&self) -> &str;

    /// Run the call, consuming it.
    fn call(self) -> Result<(), CallError>;
}

/// A closure marked as a handoff call.
pub struct Handoff<F> {
    name: &'static str,
    body: F,
}

impl<F> Handoff<F>
where
    F: FnOnce() -> Result<(), CallError> + Send + 'static,
{
    /// Mark `body` as a handoff call named `name`.
    #[must_use]
    pub fn new(name: &'static str, body: F) -> Self {
        Self { name, body }
    }
}

impl<F> HandoffCall for Handoff<F>
where
    F: FnOnce() -> Result<(), CallError> + Send + 'static,
{
    fn name(&self) -> &str {
        self.name
    }

    fn call(self) -> Result<(), CallError> {
        (self.body)()
    }
}

impl<F> fmt::Debug for Handoff<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handoff").field("name", &self.name).finish()
    }
}

// =============================================================================
// PENDING OPERATION
// =============================================================================

type Body = Box<dyn FnOnce() -> Result<(), CallError> + Send>;

/// A resolved call bound to the state it requires.
///
/// Owned by the queue from enqueue until it is either run or discarded.
pub struct PendingOperation<S> {
    name: String,
    required: S,
    body: Body,
}

impl<S> PendingOperation<S> {
    /// Bind a handoff call to its required state.
    pub fn new<C: HandoffCall>(required: S, call: C) -> Self {
        Self {
            name: call.name().to_string(),
            required,
            body: Box::new(move || call.call()),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn required(&self) -> &S {
        &self.required
    }

    /// Run the operation, wrapping a failure as an invocation fault.
    pub fn run(self) -> Result<(), GateError> {
        let Self { name, body, .. } = self;
        body().map_err(|source| GateError::Invocation {
            operation: name,
            source,
        })
    }
}

impl<S: fmt::Debug> fmt::Debug for PendingOperation<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingOperation")
            .field("name", &self.name)
            .field("required", &self.required)
            .finish()
    }
}

// =============================================================================
// TESTS
// =============================================================================
