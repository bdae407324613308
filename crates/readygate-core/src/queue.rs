//! # Deferred Call Queue
//!
//! Ordered slots of pending operations. A flush scans the slots once, front
//! to back, and runs every operation whose required state is satisfied by the
//! new state. A run operation leaves an empty slot (a tombstone) behind so the
//! scan never shifts indices under itself.
//!
//! Compaction happens once, after the scan:
//! - nothing left pending: the slots are dropped together with their storage
//! - otherwise: the tombstones are squeezed out in one pass, keeping the
//!   survivors in submission order
//!
//! No tombstone outlives the flush that made it, including a flush cut short
//! by a failing or panicking operation. The queue is expected to be empty most of the
//! time, so storage is released eagerly whenever it drains.
//!
//! ## Reentrancy
//!
//! No borrow of the slots is held while an operation runs. An operation may
//! push onto the queue it is being flushed from; the running scan picks the
//! new entry up when it reaches the end. A flush started from inside another
//! flush leaves compaction to the outermost one.

use crate::call::PendingOperation;
use crate::config::QueueConfig;
use crate::state::ReadinessState;
use crate::types::GateError;
use std::cell::{Cell, RefCell};
use std::fmt;

/// Result of one flush.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FlushReport {
    /// Operations run by this flush.
    pub executed: usize,
    /// Operations still pending afterwards.
    pub retained: usize,
}

/// Pending operations in submission order.
///
/// The queue is single-threaded on its own; [`crate::StateGate`] provides the
/// lock that makes it shareable.
pub struct DeferredCallQueue<S> {
    slots: RefCell<Vec<Option<PendingOperation<S>>>>,
    /// Nesting depth of running flushes.
    flushing: Cell<usize>,
}

impl<S: ReadinessState> Default for DeferredCallQueue<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: ReadinessState> DeferredCallQueue<S> {
    /// Create a queue with the default initial capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(&QueueConfig::default())
    }

    #[must_use]
    pub fn with_config(config: &QueueConfig) -> Self {
        Self {
            slots: RefCell::new(Vec::with_capacity(config.initial_capacity)),
            flushing: Cell::new(0),
        }
    }

    /// Append an operation at the tail.
    pub fn push(&self, op: PendingOperation<S>) {
        tracing::trace!(operation = op.name(), required = ?op.required(), "queued");
        self.slots.borrow_mut().push(Some(op));
    }

    /// Number of operations waiting to run.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.slots.borrow().iter().flatten().count()
    }

    /// Number of physical slots, tombstones included.
    #[must_use]
    pub fn slot_len(&self) -> usize {
        self.slots.borrow().len()
    }

    /// Allocated slot capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.borrow().capacity()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending_len() == 0
    }

    /// Drop every pending operation without running it.
    ///
    /// Returns how many were dropped.
    pub fn discard_pending(&self) -> usize {
        let dropped = std::mem::take(&mut *self.slots.borrow_mut());
        let count = dropped.iter().flatten().count();
        drop(dropped);
        if count > 0 {
            tracing::debug!(count, "discarded pending calls");
        }
        count
    }

    /// Run every pending operation satisfied by `new_state`.
    ///
    /// Stops at the first failing operation and returns its invocation fault.
    /// The failed operation is consumed and operations after it remain
    /// pending.
    pub fn flush(&self, new_state: &S) -> Result<FlushReport, GateError> {
        let mut executed = 0usize;
        let mut index = 0usize;
        let guard = FlushGuard::enter(self);

        loop {
            let ready = {
                let mut slots = self.slots.borrow_mut();
                let Some(slot) = slots.get_mut(index) else {
                    break;
                };
                let satisfied = slot
                    .as_ref()
                    .is_some_and(|op| new_state.is_at_least(op.required()));
                if satisfied { slot.take() } else { None }
            };
            index += 1;

            if let Some(op) = ready {
                op.run()?;
                executed += 1;
            }
        }

        drop(guard);
        let retained = self.pending_len();
        tracing::debug!(?new_state, executed, retained, "flushed deferred calls");
        Ok(FlushReport { executed, retained })
    }
}

impl<S> DeferredCallQueue<S> {
    /// Drop every tombstone; release storage when none is pending.
    fn compact(&self) {
        let mut slots = self.slots.borrow_mut();
        slots.retain(Option::is_some);
        if slots.is_empty() {
            *slots = Vec::new();
        }
    }
}

/// Marks a flush in progress. The outermost guard compacts on drop, so the
/// queue is compacted even when an operation fails or unwinds.
struct FlushGuard<'a, S> {
    queue: &'a DeferredCallQueue<S>,
}

impl<'a, S> FlushGuard<'a, S> {
    fn enter(queue: &'a DeferredCallQueue<S>) -> Self {
        queue.flushing.set(queue.flushing.get() + 1);
        Self { queue }
    }
}

impl<S> Drop for FlushGuard<'_, S> {
    fn drop(&mut self) {
        let depth = self.queue.flushing.get().saturating_sub(1);
        self.queue.flushing.set(depth);
        if depth == 0 {
            self.queue.compact();
        }
    }
}

impl<S: fmt::Debug> fmt::Debug for DeferredCallQueue<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.slots.try_borrow() {
            Ok(slots) => f.debug_list().entries(slots.iter()).finish(),
            Err(_) => f.write_str("DeferredCallQueue { <flushing> }"),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
