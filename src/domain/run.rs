//! Run lifecycle.
//!
//! A run moves `Idle -> Running -> {Completed, Failed, Cancelled}` and never
//! leaves a terminal state.

use serde::{Deserialize, Serialize};

/// State of a generation run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum RunState {
    /// Created, nothing done yet
    Idle,

    /// Issuing remote calls
    Running,

    /// All propositions were processed (possibly with zero artifacts)
    Completed,

    /// Setup could not complete
    Failed { error: String },

    /// Stopped by the caller
    Cancelled,
}

impl Default for RunState {
    fn default() -> Self {
        Self::Idle
    }
}

impl RunState {
    /// Move to `next`, refusing to leave a terminal state
    pub fn advance(&mut self, next: RunState) -> bool {
        let allowed = matches!(
            (&*self, &next),
            (Self::Idle, Self::Running)
                | (Self::Idle, Self::Failed { .. })
                | (Self::Running, Self::Completed)
                | (Self::Running, Self::Failed { .. })
                | (Self::Running, Self::Cancelled)
        );
        if allowed {
            *self = next;
        }
        allowed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path() {
        let mut state = RunState::default();
        assert!(state.advance(RunState::Running));
        assert!(state.advance(RunState::Completed));
        assert_eq!(state, RunState::Completed);
    }

    #[test]
    fn test_terminal_states_are_sticky() {
        let mut state = RunState::Running;
        assert!(state.advance(RunState::Cancelled));
        assert!(!state.advance(RunState::Running));
        assert!(!state.advance(RunState::Completed));
        assert_eq!(state, RunState::Cancelled);
    }

    #[test]
    fn test_setup_failure_from_idle() {
        let mut state = RunState::Idle;
        assert!(!state.advance(RunState::Completed));
        assert!(state.advance(RunState::Failed {
            error: "disk full".to_string()
        }));
    }
}
