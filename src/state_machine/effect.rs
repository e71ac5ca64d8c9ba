//! Effects produced by state transitions

use crate::remote::RemoteError;
use crate::session::SessionId;

/// Effects to be executed after a state transition
#[derive(Debug, Clone)]
pub enum Effect {
    /// Load persisted history (spawns as background task)
    FetchHistory { session_id: SessionId },

    /// Post a user message (spawns as background task)
    PostMessage { session_id: SessionId, text: String },

    /// Ask the service to drop a session (spawns as background task)
    DeleteSession { session_id: SessionId },

    /// Mint and persist a replacement session id
    RotateSession,

    /// Record a failure that was absorbed into the transcript or ignored
    LogSuppressed {
        operation: &'static str,
        error: RemoteError,
    },
}
