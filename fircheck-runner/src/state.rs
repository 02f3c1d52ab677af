//! Stage lifecycle state machine
//!
//! Every stage in a run moves `Pending -> Running -> Succeeded | Failed`.
//! A stage that never starts because the run was cancelled goes
//! `Pending -> Cancelled`. Terminal states never change.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of one stage within a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageState {
    Pending,
    Running,
    Succeeded,
    Failed,
    Cancelled,
}

impl StageState {
    /// Check if transition from current state to target state is valid
    pub fn can_transition_to(&self, target: StageState) -> bool {
        use StageState::*;

        matches!(
            (self, target),
            (Pending, Running) | (Pending, Cancelled) | (Running, Succeeded) | (Running, Failed)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            StageState::Succeeded | StageState::Failed | StageState::Cancelled
        )
    }
}

impl Default for StageState {
    fn default() -> Self {
        StageState::Pending
    }
}

impl fmt::Display for StageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageState::Pending => write!(f, "pending"),
            StageState::Running => write!(f, "running"),
            StageState::Succeeded => write!(f, "succeeded"),
            StageState::Failed => write!(f, "failed"),
            StageState::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Tracks one stage's state and rejects illegal transitions
#[derive(Debug, Clone)]
pub struct StageTracker {
    stage: String,
    state: StageState,
}

impl StageTracker {
    pub fn new(stage: impl Into<String>) -> Self {
        Self {
            stage: stage.into(),
            state: StageState::Pending,
        }
    }

    pub fn state(&self) -> StageState {
        self.state
    }

    /// Move to `target`; returns false (and leaves the state unchanged) if the
    /// transition is not allowed.
    pub fn transition(&mut self, target: StageState) -> bool {
        if !self.state.can_transition_to(target) {
            tracing::warn!(
                stage = %self.stage,
                from = %self.state,
                to = %target,
                "Rejected stage state transition"
            );
            return false;
        }
        tracing::debug!(stage = %self.stage, from = %self.state, to = %target, "Stage state");
        self.state = target;
        true
    }
}
