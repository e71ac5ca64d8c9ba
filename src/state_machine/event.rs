//! Events that can occur in a conversation

use crate::history::LoadedHistory;
use crate::remote::RemoteError;
use crate::session::SessionId;

/// Events that trigger state transitions
#[derive(Debug, Clone)]
pub enum Event {
    // User actions
    UserMessage { text: String },
    ResetRequested,
    LoadRequested,

    // Completions of background remote calls
    HistoryLoaded { history: LoadedHistory },
    ReplyReceived { outcome: Result<String, RemoteError> },
    SessionDeleted { outcome: Result<(), RemoteError> },

    // Local completion of a reset
    SessionRotated { session_id: SessionId },
}

impl Event {
    /// Whether this event originates from the user rather than a completion
    pub fn is_user_action(&self) -> bool {
        matches!(
            self,
            Event::UserMessage { .. } | Event::ResetRequested | Event::LoadRequested
        )
    }
}
