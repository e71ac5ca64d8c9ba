//! Conversation state types

use crate::session::SessionId;
use serde::{Deserialize, Serialize};

/// Reply appended when posting a message fails for any reason
pub const APOLOGY_TEXT: &str = "Sorry, I encountered an error. Please try again.";

/// Transcript seed after an explicit session reset
pub const NEW_SESSION_TEXT: &str = "New session started. Ask me anything about the news!";

/// Who authored a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    User,
    Bot,
}

/// One transcript entry. Append order is the only ordering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub text: String,
    pub sender: Sender,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            sender: Sender::User,
        }
    }

    pub fn bot(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            sender: Sender::Bot,
        }
    }
}

/// Which network round-trip, if any, is outstanding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Idle,
    Loading,
    Sending,
    Resetting,
}

impl Phase {
    pub fn is_busy(self) -> bool {
        self != Phase::Idle
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Loading => "loading",
            Phase::Sending => "sending",
            Phase::Resetting => "resetting",
        }
    }
}

/// Full controller state: active session, transcript, and busy phase
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConvState {
    pub session_id: SessionId,
    pub transcript: Vec<Message>,
    pub phase: Phase,
}

impl ConvState {
    /// Fresh state for a session whose history has not been loaded yet
    pub fn new(session_id: SessionId) -> Self {
        Self {
            session_id,
            transcript: Vec::new(),
            phase: Phase::Idle,
        }
    }

    pub fn is_busy(&self) -> bool {
        self.phase.is_busy()
    }
}
