//! # Queue Configuration
//!
//! Tunables for a gate's queue. Deserializable so an application can carry
//! them in its own configuration file.

use serde::{Deserialize, Serialize};

/// Slots reserved when a queue is created.
pub const DEFAULT_INITIAL_CAPACITY: usize = 16;

/// Queue tunables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct QueueConfig {
    /// Slots reserved up front. Storage is released whenever the queue
    /// drains, so this only shapes the first burst of deferred calls.
    pub initial_capacity: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            initial_capacity: DEFAULT_INITIAL_CAPACITY,
        }
    }
}

impl QueueConfig {
    #[must_use]
    pub fn with_initial_capacity(initial_capacity: usize) -> Self {
        Self { initial_capacity }
    }
}
