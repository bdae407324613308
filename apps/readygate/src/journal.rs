//! # Execution Journal
//!
//! Records every call that actually ran, in run order, with the step that
//! submitted it and the thread that ran it.

use parking_lot::Mutex;
use readygate_core::{CallError, HandoffCall};
use serde::Serialize;
use std::sync::Arc;
use std::thread;

/// One executed call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JournalEntry {
    /// Position in run order.
    pub seq: usize,
    pub operation: String,
    /// Scenario step that submitted the call.
    pub step: usize,
    /// Name of the thread the call ran on.
    pub thread: String,
}

/// Shared, append-only run log.
#[derive(Debug, Clone, Default)]
pub struct Journal {
    entries: Arc<Mutex<Vec<JournalEntry>>>,
}

impl Journal {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, operation: String, step: usize) {
        let thread = thread::current().name().unwrap_or("unnamed").to_string();
        let mut entries = self.entries.lock();
        let seq = entries.len();
        entries.push(JournalEntry {
            seq,
            operation,
            step,
            thread,
        });
    }

    #[must_use]
    pub fn entries(&self) -> Vec<JournalEntry> {
        self.entries.lock().clone()
    }

    /// Wrap `call` so a successful run is recorded against `step`.
    pub fn wrap<C: HandoffCall>(&self, step: usize, call: C) -> Journaled<C> {
        Journaled {
            inner: call,
            journal: self.clone(),
            step,
        }
    }
}

/// A handoff call that records itself in a [`Journal`] when it succeeds.
pub struct Journaled<C> {
    inner: C,
    journal: Journal,
    step: usize,
}

impl<C: HandoffCall> HandoffCall for Journaled<C> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn call(self) -> Result<(), CallError> {
        let Self {
            inner,
            journal,
            step,
        } = self;
        let operation = inner.name().to_string();
        inner.call()?;
        journal.record(operation, step);
        Ok(())
    }
}
