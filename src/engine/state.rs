use std::fmt;

/// Lifecycle of an [`Engine`](super::Engine)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// Built, `run` not called yet
    Idle,
    Running,
    /// Request loop has stopped; the last flush is in flight
    Draining,
    Stopped,
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            EngineState::Idle => "idle",
            EngineState::Running => "running",
            EngineState::Draining => "draining",
            EngineState::Stopped => "stopped",
        };
        f.write_str(label)
    }
}
