//! Types shared by the streaming pipeline

use std::fmt;

use serde::Serialize;

/// Connection supervisor lifecycle
///
/// ```text
/// Idle -> Connecting -> Streaming -> Reconnecting -> Connecting ...
///                                         \-> Terminated (retries exhausted)
/// Connecting | Streaming | Reconnecting -> Stopped (explicit stop)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SupervisorState {
    Idle,
    Connecting,
    Streaming,
    Reconnecting,
    Stopped,
    Terminated,
}

impl SupervisorState {
    /// Whether the supervisor has finished for good
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Stopped | Self::Terminated)
    }
}

impl fmt::Display for SupervisorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Streaming => "streaming",
            Self::Reconnecting => "reconnecting",
            Self::Stopped => "stopped",
            Self::Terminated => "terminated",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(SupervisorState::Stopped.is_terminal());
        assert!(SupervisorState::Terminated.is_terminal());
        assert!(!SupervisorState::Reconnecting.is_terminal());
        assert_eq!(SupervisorState::Streaming.to_string(), "streaming");
    }
}
