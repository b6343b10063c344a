//! Worker lifecycle state machine.
//!
//! A worker moves forward only: `installing → installed → activating →
//! activated`. Any state may also become `redundant` when the worker is
//! replaced or its install fails. Only an `activated` worker handles
//! requests.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerState {
    Installing,
    Installed,
    Activating,
    Activated,
    Redundant,
}

impl WorkerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkerState::Installing => "installing",
            WorkerState::Installed => "installed",
            WorkerState::Activating => "activating",
            WorkerState::Activated => "activated",
            WorkerState::Redundant => "redundant",
        }
    }

    pub fn can_transition_to(self, next: WorkerState) -> bool {
        matches!(
            (self, next),
            (WorkerState::Installing, WorkerState::Installed)
                | (WorkerState::Installed, WorkerState::Activating)
                | (WorkerState::Activating, WorkerState::Activated)
        ) || (next == WorkerState::Redundant && self != WorkerState::Redundant)
    }

    /// Move to `next`, or fail with [`Error::Lifecycle`].
    pub fn transition(self, next: WorkerState) -> Result<WorkerState, Error> {
        if self.can_transition_to(next) { Ok(next) } else { Err(Error::Lifecycle { from: self, to: next }) }
    }

    pub fn handles_fetches(&self) -> bool {
        *self == WorkerState::Activated
    }
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
