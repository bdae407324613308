//! # State Gate
//!
//! The gate owns the current readiness state, the "ready" threshold and the
//! queue of deferred calls. One reentrant lock covers:
//! - every submission, from the state check to the append (or the immediate run)
//! - every transition, from the flush to the install of the new state
//!
//! A submission can therefore never observe a state, decide to queue, and
//! then miss the flush of a concurrent transition.
//!
//! Reading the state does not take that lock. `state()` may return the
//! previous state while a transition is flushing.
//!
//! ## Caller Contract
//!
//! The gate does not enforce monotonic transitions. Moving the state
//! backwards is allowed; calls that already ran are not queued again.

use crate::call::{HandoffCall, PendingOperation};
use crate::config::QueueConfig;
use crate::dispatch::{DispatchTable, Target};
use crate::queue::DeferredCallQueue;
use crate::state::ReadinessState;
use crate::types::{Arg, GateError};
use parking_lot::{ReentrantMutex, RwLock};
use serde::Serialize;
use std::fmt;

/// Outcome of a successful submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Submission {
    /// The call ran on the submitting thread before submission returned.
    Executed,
    /// The call was appended to the queue.
    Queued,
}

/// Readiness state holder with its own deferred-call queue.
pub struct StateGate<S> {
    queue: ReentrantMutex<DeferredCallQueue<S>>,
    current: RwLock<S>,
    ready: S,
}

impl<S: ReadinessState> StateGate<S> {
    /// Create a gate at `initial`, considered ready from `ready` onwards.
    #[must_use]
    pub fn new(initial: S, ready: S) -> Self {
        Self::with_config(initial, ready, &QueueConfig::default())
    }

    #[must_use]
    pub fn with_config(initial: S, ready: S, config: &QueueConfig) -> Self {
        Self {
            queue: ReentrantMutex::new(DeferredCallQueue::with_config(config)),
            current: RwLock::new(initial),
            ready,
        }
    }

    /// Whether the current state has reached the ready threshold.
    pub fn is_ready(&self) -> bool {
        self.state().is_at_least(&self.ready)
    }

    /// The current state.
    pub fn state(&self) -> S {
        *self.current.read()
    }

    /// The ready threshold.
    pub fn ready_state(&self) -> S {
        self.ready
    }

    /// Move to `new`, running every queued call it satisfies.
    pub fn set_state(&self, new: S) -> Result<(), GateError> {
        self.check_and_set_state(None, new).map(|_| ())
    }

    /// Move to `new` only if the current state is exactly `expected`.
    ///
    /// With `expected` of `None` the transition is unconditional. Returns
    /// `Ok(false)`, with no flush, when the current state differs.
    ///
    /// If a queued call fails, the fault is returned and the state is left
    /// unchanged. Calls that ran before the failure are not run again.
    pub fn check_and_set_state(&self, expected: Option<S>, new: S) -> Result<bool, GateError> {
        let queue = self.queue.lock();
        let previous = self.state();

        if let Some(expected) = expected {
            if !previous.is(&expected) {
                tracing::trace!(?previous, ?expected, ?new, "transition skipped");
                return Ok(false);
            }
        }

        let report = queue.flush(&new)?;
        *self.current.write() = new;

        tracing::debug!(
            ?previous,
            ?new,
            executed = report.executed,
            retained = report.retained,
            "state transition"
        );
        Ok(true)
    }

    /// Run `call` now if the gate is at or past `required`, else queue it.
    ///
    /// An immediate run happens on the calling thread and its failure is
    /// returned from here. A queued call runs on whichever thread performs
    /// the first transition that satisfies `required`.
    pub fn submit_if_not_ready<C: HandoffCall>(
        &self,
        required: S,
        call: C,
    ) -> Result<Submission, GateError> {
        let queue = self.queue.lock();
        let op = PendingOperation::new(required, call);

        if self.state().is_at_least(&required) {
            tracing::trace!(operation = op.name(), "running immediately");
            op.run()?;
            return Ok(Submission::Executed);
        }

        queue.push(op);
        Ok(Submission::Queued)
    }

    /// Resolve `name` against `table` and submit it.
    ///
    /// Resolution faults are returned before the gate is touched.
    pub fn submit_named<T: Send + Sync + 'static>(
        &self,
        required: S,
        table: &DispatchTable<T>,
        target: &Target<T>,
        name: &str,
        args: Vec<Arg>,
    ) -> Result<Submission, GateError> {
        let call = table.resolve(target, name, args)?;
        self.submit_if_not_ready(required, call)
    }

    /// Number of queued calls still waiting.
    pub fn pending_len(&self) -> usize {
        self.queue.lock().pending_len()
    }

    /// Number of queue slots, tombstones included.
    pub fn slot_len(&self) -> usize {
        self.queue.lock().slot_len()
    }

    /// Drop every queued call without running it.
    pub fn discard_pending(&self) -> usize {
        self.queue.lock().discard_pending()
    }
}

impl<S: fmt::Debug + Copy> fmt::Debug for StateGate<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateGate")
            .field("state", &*self.current.read())
            .field("ready", &self.ready)
            .finish()
    }
}

// =============================================================================
// TESTS
// =============================================================================
