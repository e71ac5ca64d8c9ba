//! Wire types for the conversation service

use serde::{Deserialize, Serialize};

/// One persisted exchange as returned by the history endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub user: String,
    pub bot: String,
}

impl HistoryRecord {
    #[allow(dead_code)] // Used in tests
    pub fn new(user: impl Into<String>, bot: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            bot: bot.into(),
        }
    }
}

/// Body of the post-message call
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostMessageRequest<'a> {
    pub session_id: &'a str,
    pub message: &'a str,
}

/// Body returned by the post-message call
#[derive(Debug, Deserialize)]
pub struct PostMessageResponse {
    pub reply: String,
}
