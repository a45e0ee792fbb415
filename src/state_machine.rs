//! Acquisition runner states:
//! Wait → CheckShutdown → Build → {NotReady → Wait | Ready → Filter → Publish → Wait}
//! Stopped is terminal and reachable only from Wait or CheckShutdown.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum RunnerState {
    Wait,
    CheckShutdown,
    Build,
    NotReady,
    Ready,
    Filter,
    Publish,
    Stopped,
}

impl std::fmt::Display for RunnerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunnerState::Wait => write!(f, "Wait"),
            RunnerState::CheckShutdown => write!(f, "CheckShutdown"),
            RunnerState::Build => write!(f, "Build"),
            RunnerState::NotReady => write!(f, "NotReady"),
            RunnerState::Ready => write!(f, "Ready"),
            RunnerState::Filter => write!(f, "Filter"),
            RunnerState::Publish => write!(f, "Publish"),
            RunnerState::Stopped => write!(f, "Stopped"),
        }
    }
}

impl RunnerState {
    /// Returns whether transitioning from `self` to `next` is valid.
    pub fn can_transition_to(self, next: RunnerState) -> bool {
        matches!(
            (self, next),
            (RunnerState::Wait, RunnerState::CheckShutdown)
                | (RunnerState::Wait, RunnerState::Stopped)
                | (RunnerState::CheckShutdown, RunnerState::Build)
                | (RunnerState::CheckShutdown, RunnerState::Stopped)
                | (RunnerState::Build, RunnerState::NotReady)
                | (RunnerState::Build, RunnerState::Ready)
                | (RunnerState::NotReady, RunnerState::Wait)
                | (RunnerState::Ready, RunnerState::Filter)
                | (RunnerState::Filter, RunnerState::Publish)
                | (RunnerState::Publish, RunnerState::Wait)
        )
    }

    pub fn is_terminal(self) -> bool {
        self == RunnerState::Stopped
    }
}
