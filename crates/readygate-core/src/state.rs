//! # Readiness States
//!
//! A readiness state is a milestone in a subsystem's startup. States form a
//! total order fixed when the state type is defined; the gate compares the
//! current state against the state each call requires.
//!
//! ## Engine Lifecycle
//!
//! | State | Name | Meaning |
//! |-------|------|---------|
//! | 0 | `initial` | Nothing loaded |
//! | 1 | `libs-ready` | Native libraries loaded |
//! | 2 | `launched` | Engine thread started |
//! | 3 | `bindings-ready` | Native call bindings registered |
//! | 4 | `profile-ready` | User profile opened |
//! | 5 | `running` | Engine fully up |

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// =============================================================================
// READINESS STATE TRAIT
// =============================================================================

/// An ordered milestone value.
///
/// The provided methods derive both relations from `Ord`, so a state type is
/// usually a fieldless enum with `#[derive(PartialEq, Eq, PartialOrd, Ord)]`
/// and its variants declared in milestone order.
pub trait ReadinessState: Copy + Ord + fmt::Debug + Send + Sync + 'static {
    /// Exact equality.
    fn is(&self, other: &Self) -> bool {
        self == other
    }

    /// True if this state equals `other` or comes after it.
    fn is_at_least(&self, other: &Self) -> bool {
        self >= other
    }

    /// True if this state lies in the inclusive range `[min, max]`.
    fn is_between(&self, min: &Self, max: &Self) -> bool {
        self.is_at_least(min) && max.is_at_least(self)
    }
}

// =============================================================================
// ENGINE STATE
// =============================================================================

/// Lifecycle milestones of a natively hosted engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EngineState {
    Initial,
    LibsReady,
    Launched,
    BindingsReady,
    ProfileReady,
    Running,
}

impl ReadinessState for EngineState {}

impl EngineState {
    /// Every state, in milestone order.
    pub const ALL: [EngineState; 6] = [
        EngineState::Initial,
        EngineState::LibsReady,
        EngineState::Launched,
        EngineState::BindingsReady,
        EngineState::ProfileReady,
        EngineState::Running,
    ];

    /// Get the state name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            EngineState::Initial => "initial",
            EngineState::LibsReady => "libs-ready",
            EngineState::Launched => "launched",
            EngineState::BindingsReady => "bindings-ready",
            EngineState::ProfileReady => "profile-ready",
            EngineState::Running => "running",
        }
    }

    /// Get the next state, if any.
    #[must_use]
    pub fn next(&self) -> Option<EngineState> {
        match self {
            EngineState::Initial => Some(EngineState::LibsReady),
            EngineState::LibsReady => Some(EngineState::Launched),
            EngineState::Launched => Some(EngineState::BindingsReady),
            EngineState::BindingsReady => Some(EngineState::ProfileReady),
            EngineState::ProfileReady => Some(EngineState::Running),
            EngineState::Running => None,
        }
    }

    /// Check if this state is terminal.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, EngineState::Running)
    }
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

impl FromStr for EngineState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EngineState::ALL
            .into_iter()
            .find(|state| state.name() == s)
            .ok_or_else(|| format!("unknown engine state '{}'", s))
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_ordering() {
        for pair in EngineState::ALL.windows(2) {
            assert!(pair[0] < pair[1]);
            assert!(pair[1].is_at_least(&pair[0]));
            assert!(!pair[0].is_at_least(&pair[1]));
        }
    }

    #[test]
    fn is_is_exact() {
        assert!(EngineState::Running.is(&EngineState::Running));
        assert!(!EngineState::Running.is(&EngineState::ProfileReady));
        assert!(EngineState::Running.is_at_least(&EngineState::Running));
    }

    #[test]
    fn is_between_inclusive() {
        let s = EngineState::Launched;
        assert!(s.is_between(&EngineState::LibsReady, &EngineState::ProfileReady));
        assert!(s.is_between(&EngineState::Launched, &EngineState::Launched));
        assert!(!s.is_between(&EngineState::BindingsReady, &EngineState::Running));
    }

    #[test]
    fn next_walks_all_states() {
        let mut walked = vec![EngineState::Initial];
        while let Some(next) = walked.last().and_then(EngineState::next) {
            walked.push(next);
        }
        assert_eq!(walked, EngineState::ALL.to_vec());
        assert!(EngineState::Running.is_terminal());
    }

    #[test]
    fn name_round_trips_through_from_str() {
        for state in EngineState::ALL {
            assert_eq!(state.name().parse::<EngineState>(), Ok(state));
        }
        assert!("exited".parse::<EngineState>().is_err());
    }
}
