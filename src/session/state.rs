//! Per-session thread identity and lifecycle phase.

use strum::Display;

use crate::error::{RelayError, Result};

/// Conversation thread bound to a session.
///
/// Starts as [`ThreadState::NoThread`] and moves to [`ThreadState::Thread`]
/// exactly once; the id never changes afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ThreadState {
    #[default]
    NoThread,
    Thread { id: String },
}

impl ThreadState {
    pub fn id(&self) -> Option<&str> {
        match self {
            Self::NoThread => None,
            Self::Thread { id } => Some(id),
        }
    }

    /// Bind the thread id. A second assignment is rejected.
    pub fn assign(&mut self, id: impl Into<String>) -> Result<&str> {
        if let Self::Thread { id: existing } = self {
            return Err(RelayError::InvalidState(format!(
                "thread already assigned: {existing}"
            )));
        }
        *self = Self::Thread { id: id.into() };
        Ok(self.id().unwrap_or_default())
    }
}

/// Where a session is in the message → run → tools → resume cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display)]
#[strum(serialize_all = "kebab-case")]
pub enum SessionPhase {
    /// No thread yet.
    #[default]
    Idle,
    /// Thread known, nothing in flight.
    ThreadReady,
    /// A run stream is being relayed.
    Running,
    /// Tool calls of a paused run are executing.
    AwaitingToolResults,
}
