use std::fmt;
use std::sync::Mutex;

use crate::error::{InterceptError, Result};

/// Phase of a DOM interception round trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InterceptState {
    #[default]
    Idle,
    Extracting,
    AwaitingScan,
    Rewriting,
    Retriggering,
}

impl InterceptState {
    pub fn can_transition_to(self, next: InterceptState) -> bool {
        use InterceptState::*;
        matches!(
            (self, next),
            (Idle, Extracting)
                | (Extracting, Idle)
                | (Extracting, AwaitingScan)
                | (AwaitingScan, Rewriting)
                | (AwaitingScan, Retriggering)
                | (Rewriting, Retriggering)
                | (Retriggering, Idle)
        )
    }

    /// A round trip owns the input between extraction and re-dispatch.
    pub fn is_in_flight(self) -> bool {
        matches!(
            self,
            InterceptState::Extracting | InterceptState::AwaitingScan | InterceptState::Rewriting
        )
    }
}

impl fmt::Display for InterceptState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InterceptState::Idle => "IDLE",
            InterceptState::Extracting => "EXTRACTING",
            InterceptState::AwaitingScan => "AWAITING_SCAN",
            InterceptState::Rewriting => "REWRITING",
            InterceptState::Retriggering => "RETRIGGERING",
        };
        f.write_str(name)
    }
}

/// Shared interception state with guarded transitions.
#[derive(Debug, Default)]
pub struct StateMachine {
    state: Mutex<InterceptState>,
}

impl StateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> InterceptState {
        *self.lock()
    }

    /// Move to `next`, returning the previous state. The check and the
    /// update happen under one lock.
    pub fn transition(&self, next: InterceptState) -> Result<InterceptState> {
        let mut state = self.lock();
        let from = *state;
        if !from.can_transition_to(next) {
            return Err(InterceptError::IllegalTransition { from, to: next });
        }
        *state = next;
        Ok(from)
    }

    /// Force the machine back to idle after an unexpected failure.
    pub fn reset(&self) {
        *self.lock() = InterceptState::Idle;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, InterceptState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
