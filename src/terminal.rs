//! Line-oriented terminal front-end
//!
//! Pure consumer of conversation snapshots: it never touches state except
//! through the handle.

use crate::runtime::ConversationSnapshot;
use crate::session::SessionId;
use crate::state_machine::{Message, Sender};
use tokio::sync::watch;

pub const HELP_TEXT: &str = "Commands: /new (new session), /reload (reload history), \
/session (show session id), /history (show transcript), /help, /quit";

/// A parsed line of user input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Send(String),
    NewSession,
    Reload,
    ShowSession,
    ShowHistory,
    Help,
    Quit,
    Unknown(String),
}

impl Command {
    pub fn parse(line: &str) -> Self {
        let trimmed = line.trim();
        if !trimmed.starts_with('/') {
            return Command::Send(line.to_string());
        }
        match trimmed {
            "/new" | "/reset" => Command::NewSession,
            "/reload" => Command::Reload,
            "/session" => Command::ShowSession,
            "/history" => Command::ShowHistory,
            "/help" | "/?" => Command::Help,
            "/quit" | "/exit" => Command::Quit,
            other => Command::Unknown(other.to_string()),
        }
    }
}

pub fn format_message(message: &Message) -> String {
    match message.sender {
        Sender::User => format!("you> {}", message.text),
        Sender::Bot => format!("newsbot> {}", message.text),
    }
}

pub fn format_transcript(snapshot: &ConversationSnapshot) -> Vec<String> {
    snapshot.messages.iter().map(format_message).collect()
}

/// Tracks what has been printed and works out what to print next
#[derive(Debug, Default)]
pub struct Renderer {
    shown: Vec<Message>,
    session_id: SessionId,
    typing_shown: bool,
}

impl Renderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lines to print for a new snapshot
    pub fn update(&mut self, snapshot: &ConversationSnapshot) -> Vec<String> {
        let mut lines = Vec::new();

        let appended = snapshot.session_id == self.session_id
            && snapshot.messages.starts_with(&self.shown);
        if appended {
            lines.extend(
                snapshot
                    .messages
                    .iter()
                    .skip(self.shown.len())
                    .map(format_message),
            );
        } else {
            // Transcript was replaced by a load or reset
            if !snapshot.session_id.is_absent() {
                lines.push(format!("--- session {} ---", snapshot.session_id));
            }
            lines.extend(format_transcript(snapshot));
        }

        let typing = snapshot.awaiting_reply();
        if typing && !self.typing_shown {
            lines.push("newsbot is typing...".to_string());
        }

        self.typing_shown = typing;
        self.shown.clone_from(&snapshot.messages);
        self.session_id = snapshot.session_id.clone();
        lines
    }
}

/// Print transcript changes until the runtime goes away
pub async fn render_loop(mut rx: watch::Receiver<ConversationSnapshot>) {
    let mut renderer = Renderer::new();
    loop {
        let snapshot = rx.borrow_and_update().clone();
        for line in renderer.update(&snapshot) {
            println!("{line}");
        }
        if rx.changed().await.is_err() {
            break;
        }
    }
}
