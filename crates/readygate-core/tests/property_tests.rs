//! # Property-Based Tests
//!
//! The gate is checked against a plain model: a list of pending calls and a
//! current state. Any sequence of submissions and transitions must produce the
//! same execution log and the same pending count in both.

use parking_lot::Mutex;
use proptest::collection::vec;
use proptest::prelude::*;
use readygate_core::{EngineState, Handoff, ReadinessState, StateGate, Submission};
use std::collections::BTreeSet;
use std::sync::Arc;

#[derive(Debug, Clone)]
enum Action {
    Submit(EngineState),
    Transition(EngineState),
}

fn state() -> impl Strategy<Value = EngineState> {
    (0usize..EngineState::ALL.len()).prop_map(|i| EngineState::ALL[i])
}

fn action() -> impl Strategy<Value = Action> {
    prop_oneof![
        3 => state().prop_map(Action::Submit),
        1 => state().prop_map(Action::Transition),
    ]
}

/// Reference behavior.
struct Model {
    state: EngineState,
    pending: Vec<(usize, EngineState)>,
    log: Vec<usize>,
}

impl Model {
    fn submit(&mut self, id: usize, required: EngineState) -> Submission {
        if self.state.is_at_least(&required) {
            self.log.push(id);
            Submission::Executed
        } else {
            self.pending.push((id, required));
            Submission::Queued
        }
    }

    fn transition(&mut self, new: EngineState) {
        let (ready, waiting): (Vec<_>, Vec<_>) = self
            .pending
            .drain(..)
            .partition(|(_, required)| new.is_at_least(required));
        self.log.extend(ready.into_iter().map(|(id, _)| id));
        self.pending = waiting;
        self.state = new;
    }
}

proptest! {
    /// Gate and model agree on every outcome, the log, and the pending count.
    #[test]
    fn gate_matches_model(actions in vec(action(), 0..64)) {
        let gate = StateGate::new(EngineState::Initial, EngineState::Running);
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut model = Model { state: EngineState::Initial, pending: Vec::new(), log: Vec::new() };

        for (id, action) in actions.into_iter().enumerate() {
            match action {
                Action::Submit(required) => {
                    let sink = Arc::clone(&log);
                    let outcome = gate
                        .submit_if_not_ready(required, Handoff::new("op", move || {
                            sink.lock().push(id);
                            Ok(())
                        }))
                        .expect("submit");
                    prop_assert_eq!(outcome, model.submit(id, required));
                }
                Action::Transition(new) => {
                    gate.set_state(new).expect("set");
                    model.transition(new);
                }
            }
            prop_assert_eq!(gate.pending_len(), model.pending.len());
            prop_assert_eq!(gate.state(), model.state);
        }

        prop_assert_eq!(&*log.lock(), &model.log);
    }

    /// No call runs twice, and a final transition to the top state drains
    /// the queue completely.
    #[test]
    fn at_most_once_and_drain_to_empty(actions in vec(action(), 0..64)) {
        let gate = StateGate::new(EngineState::Initial, EngineState::Running);
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut submitted = 0usize;

        for (id, action) in actions.into_iter().enumerate() {
            match action {
                Action::Submit(required) => {
                    let sink = Arc::clone(&log);
                    gate.submit_if_not_ready(required, Handoff::new("op", move || {
                        sink.lock().push(id);
                        Ok(())
                    }))
                    .expect("submit");
                    submitted += 1;
                }
                Action::Transition(new) => gate.set_state(new).expect("set"),
            }
        }

        gate.set_state(EngineState::Running).expect("set");

        let log = log.lock();
        let unique: BTreeSet<_> = log.iter().collect();
        prop_assert_eq!(unique.len(), log.len());
        prop_assert_eq!(log.len(), submitted);
        prop_assert_eq!(gate.pending_len(), 0);
        prop_assert_eq!(gate.slot_len(), 0);
    }

    /// A completed flush leaves no tombstones behind.
    #[test]
    fn no_tombstones_after_flush(requirements in vec(state(), 1..32), target in state()) {
        let gate = StateGate::new(EngineState::Initial, EngineState::Running);
        for required in &requirements {
            gate.submit_if_not_ready(*required, Handoff::new("op", || Ok(()))).expect("submit");
        }
        let queued = gate.pending_len();

        gate.set_state(target).expect("set");

        prop_assert!(gate.pending_len() <= queued);
        prop_assert_eq!(gate.slot_len(), gate.pending_len());
    }
}
