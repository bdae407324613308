//! # readygate-core
//!
//! The deferred-call gate - THE PRIMITIVE.
//!
//! A fast-starting thread often has to talk to a slow-starting subsystem (a
//! native engine, a driver, a remote peer). Calls made before the subsystem
//! reaches the milestone they need must not be dropped or reordered, and the
//! caller must not block waiting for it.
//!
//! [`StateGate`] solves this with a readiness state plus a queue:
//! - a submitted call whose required state is already reached runs at once,
//!   on the submitting thread
//! - otherwise it is queued
//! - every transition runs, in submission order, the queued calls the new
//!   state satisfies
//!
//! ## Architectural Constraints
//!
//! - Synchronous: nothing ever waits for a state
//! - No async, no I/O
//! - Failures propagate to the thread that triggered the call; nothing is
//!   swallowed or retried

// =============================================================================
// MODULES
// =============================================================================

pub mod call;
pub mod config;
pub mod dispatch;
pub mod gate;
pub mod queue;
pub mod state;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{Arg, ArgType, ArgValue, CallError, CallKind, ConfigurationError, GateError};

// =============================================================================
// RE-EXPORTS: Gate
// =============================================================================

pub use call::{Handoff, HandoffCall, PendingOperation};
pub use config::{DEFAULT_INITIAL_CAPACITY, QueueConfig};
pub use dispatch::{DispatchTable, InstanceFn, OperationDescriptor, ResolvedCall, StaticFn, Target};
pub use gate::{StateGate, Submission};
pub use queue::{DeferredCallQueue, FlushReport};
pub use state::{EngineState, ReadinessState};
