//! Engine lifecycle state machine.
//!
//! # State Transitions
//! ```text
//! Created → Rebalancing | Running | Failed | Stopped
//! Rebalancing ⇄ Running
//! Rebalancing | Running → Failed | Stopped
//! Failed, Stopped: terminal
//! ```

use std::fmt;

/// Lifecycle state of a stream processing engine.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleState {
    Created = 0,
    Rebalancing = 1,
    Running = 2,
    Failed = 3,
    Stopped = 4,
}

impl LifecycleState {
    /// Once failed or stopped, an engine never changes state again.
    pub fn is_terminal(self) -> bool {
        matches!(self, LifecycleState::Failed | LifecycleState::Stopped)
    }

    pub fn can_transition_to(self, next: LifecycleState) -> bool {
        if self.is_terminal() || self == next {
            return false;
        }
        next != LifecycleState::Created
    }

    /// The edge that means "work assignment finished".
    pub fn is_startup_edge(from: LifecycleState, to: LifecycleState) -> bool {
        from == LifecycleState::Rebalancing && to == LifecycleState::Running
    }
}

impl From<u8> for LifecycleState {
    fn from(val: u8) -> Self {
        match val {
            1 => LifecycleState::Rebalancing,
            2 => LifecycleState::Running,
            3 => LifecycleState::Failed,
            4 => LifecycleState::Stopped,
            _ => LifecycleState::Created,
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LifecycleState::Created => "CREATED",
            LifecycleState::Rebalancing => "REBALANCING",
            LifecycleState::Running => "RUNNING",
            LifecycleState::Failed => "FAILED",
            LifecycleState::Stopped => "STOPPED",
        };
        f.write_str(name)
    }
}
