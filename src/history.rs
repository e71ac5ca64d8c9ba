//! History loading
//!
//! Turns the service's persisted exchanges into a transcript. Any failure
//! reads as "no history" and yields the greeting.

use crate::remote::{ConversationService, HistoryRecord, RemoteError};
use crate::session::SessionId;
use crate::state_machine::Message;

/// Transcript seed for a session with no usable history
pub const GREETING_TEXT: &str =
    "Hello! I'm NewsBot, your AI assistant for the latest news. How can I help you?";

/// Result of a history load: always a usable transcript, plus the failure
/// that was absorbed to produce it, if any
#[derive(Debug, Clone)]
pub struct LoadedHistory {
    pub transcript: Vec<Message>,
    pub suppressed: Option<RemoteError>,
}

impl LoadedHistory {
    pub fn from_outcome(outcome: Result<Vec<HistoryRecord>, RemoteError>) -> Self {
        match outcome {
            Ok(records) if !records.is_empty() => Self {
                transcript: expand_records(&records),
                suppressed: None,
            },
            Ok(_) => Self {
                transcript: greeting(),
                suppressed: None,
            },
            Err(e) => Self {
                transcript: greeting(),
                suppressed: Some(e),
            },
        }
    }
}

/// Fetch and convert the history for `session_id`
pub async fn load_history<S>(service: &S, session_id: &SessionId) -> LoadedHistory
where
    S: ConversationService + ?Sized,
{
    LoadedHistory::from_outcome(service.get_history(session_id).await)
}

/// Each record becomes a user message followed by a bot message
pub fn expand_records(records: &[HistoryRecord]) -> Vec<Message> {
    records
        .iter()
        .flat_map(|r| [Message::user(r.user.clone()), Message::bot(r.bot.clone())])
        .collect()
}

pub fn greeting() -> Vec<Message> {
    vec![Message::bot(GREETING_TEXT)]
}
