//! Run state: the append-only history plus iteration bookkeeping.
//!
//! A `State` belongs to exactly one run. The controller is the only writer;
//! policies receive `&State` and can only read it.
//!
//! Append rules:
//!
//! - an action may only follow an observation (or start the history),
//! - an observation may only follow a non-terminal action,
//! - nothing may follow a `Finish` action.

use serde::Serialize;

use crate::error::StateError;
use crate::event::{Action, Event, EventPayload, Observation};

#[derive(Debug, Clone, Serialize)]
pub struct State {
    /// The task this run was started with (the user's seed message).
    task: String,
    history: Vec<Event>,
    iteration: u32,
    max_iterations: u32,
}

impl State {
    /// Create an empty state for `task` with a positive iteration budget.
    pub fn new(task: impl Into<String>, max_iterations: u32) -> Result<Self, StateError> {
        if max_iterations == 0 {
            return Err(StateError::InvalidBudget);
        }
        Ok(Self {
            task: task.into(),
            history: Vec::new(),
            iteration: 0,
            max_iterations,
        })
    }

    pub fn task(&self) -> &str {
        &self.task
    }

    /// Append an event to the end of the history.
    ///
    /// The event's `sequence` is set to its position. Appends that would
    /// break action/observation alternation are rejected and leave the
    /// history untouched.
    pub fn append(&mut self, mut event: Event) -> Result<&Event, StateError> {
        let last = self.history.last().map(|e| &e.payload);

        match (&event.payload, last) {
            (_, Some(EventPayload::Action(prev))) if prev.is_terminal() => {
                return Err(StateError::Closed);
            }
            (EventPayload::Action(_), Some(EventPayload::Action(_))) => {
                return Err(StateError::Alternation {
                    expected: "observation",
                    found: "action",
                });
            }
            (EventPayload::Observation(_), None | Some(EventPayload::Observation(_))) => {
                return Err(StateError::Alternation {
                    expected: "action",
                    found: "observation",
                });
            }
            (EventPayload::Action(_), None | Some(EventPayload::Observation(_)))
            | (EventPayload::Observation(_), Some(EventPayload::Action(_))) => {}
        }

        event.sequence = self.history.len();
        self.history.push(event);
        Ok(&self.history[self.history.len() - 1])
    }

    /// The most recently appended action event, if any.
    pub fn last_action(&self) -> Option<&Event> {
        self.history.iter().rev().find(|e| e.as_action().is_some())
    }

    /// The most recently appended observation event, if any.
    pub fn last_observation(&self) -> Option<&Event> {
        self.history.iter().rev().find(|e| e.as_observation().is_some())
    }

    /// Count one completed loop pass.
    ///
    /// Fails once the counter has reached the budget; callers check
    /// `is_budget_exhausted` before asking for another action.
    pub fn advance_iteration(&mut self) -> Result<u32, StateError> {
        if self.iteration >= self.max_iterations {
            return Err(StateError::BudgetExhausted {
                max_iterations: self.max_iterations,
            });
        }
        self.iteration += 1;
        Ok(self.iteration)
    }

    pub fn iteration(&self) -> u32 {
        self.iteration
    }

    pub fn max_iterations(&self) -> u32 {
        self.max_iterations
    }

    pub fn is_budget_exhausted(&self) -> bool {
        self.iteration >= self.max_iterations
    }

    /// True once a `Finish` action has been recorded.
    pub fn is_finished(&self) -> bool {
        self.last_action()
            .and_then(Event::as_action)
            .is_some_and(Action::is_terminal)
    }

    pub fn events(&self) -> &[Event] {
        &self.history
    }

    /// The last `n` events (fewer if the history is shorter).
    pub fn recent(&self, n: usize) -> &[Event] {
        let start = self.history.len().saturating_sub(n);
        &self.history[start..]
    }

    pub fn actions(&self) -> impl Iterator<Item = &Action> {
        self.history.iter().filter_map(Event::as_action)
    }

    pub fn observations(&self) -> impl Iterator<Item = &Observation> {
        self.history.iter().filter_map(Event::as_observation)
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    /// Give up ownership of the history, e.g. for archiving.
    pub fn into_events(self) -> Vec<Event> {
        self.history
    }
}
