//! Runtime for a client conversation
//!
//! One task owns the conversation state and applies every transition; callers
//! talk to it through a [`ConversationHandle`] and observe it through
//! immutable snapshots.

mod executor;

#[cfg(test)]
pub mod testing;

pub use executor::ConversationRuntime;

use crate::remote::ConversationService;
use crate::session::{KeyValueStore, SessionId, SessionStore};
use crate::state_machine::{ConvState, Event, Message, Phase, Sender};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

const EVENT_CHANNEL_CAPACITY: usize = 32;

/// Read-only view of the conversation published after every change
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversationSnapshot {
    pub session_id: SessionId,
    pub messages: Vec<Message>,
    pub phase: Phase,
}

impl ConversationSnapshot {
    pub fn from_state(state: &ConvState) -> Self {
        Self {
            session_id: state.session_id.clone(),
            messages: state.transcript.clone(),
            phase: state.phase,
        }
    }

    pub fn is_busy(&self) -> bool {
        self.phase.is_busy()
    }

    /// Busy with the user's message as the latest entry: the bot is "typing"
    pub fn awaiting_reply(&self) -> bool {
        self.is_busy()
            && self
                .messages
                .last()
                .is_some_and(|m| m.sender == Sender::User)
    }
}

#[derive(Debug, Error)]
pub enum HandleError {
    #[error("Conversation runtime has stopped")]
    RuntimeStopped,
}

/// Caller-side entry point to a running conversation
#[derive(Clone)]
pub struct ConversationHandle {
    event_tx: mpsc::Sender<Event>,
    snapshot_rx: watch::Receiver<ConversationSnapshot>,
    shutdown: CancellationToken,
}

impl ConversationHandle {
    /// Send a user message. Ignored if blank or while a request is in flight.
    pub async fn send(&self, text: impl Into<String>) -> Result<(), HandleError> {
        self.dispatch(Event::UserMessage { text: text.into() }).await
    }

    /// Start a new session. Ignored while a request is in flight.
    pub async fn reset_session(&self) -> Result<(), HandleError> {
        self.dispatch(Event::ResetRequested).await
    }

    /// Replace the transcript with the service's copy. Ignored while busy.
    pub async fn reload_history(&self) -> Result<(), HandleError> {
        self.dispatch(Event::LoadRequested).await
    }

    pub fn snapshot(&self) -> ConversationSnapshot {
        self.snapshot_rx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ConversationSnapshot> {
        self.snapshot_rx.clone()
    }

    /// Stop the runtime. Requests already in flight are not cancelled; their
    /// completions are dropped.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    async fn dispatch(&self, event: Event) -> Result<(), HandleError> {
        self.event_tx
            .send(event)
            .await
            .map_err(|_| HandleError::RuntimeStopped)
    }
}

/// Resolve the session, spawn the runtime task, and kick off the history load
pub fn start<S, K>(service: Arc<S>, sessions: SessionStore<K>) -> (ConversationHandle, JoinHandle<()>)
where
    S: ConversationService + ?Sized + 'static,
    K: KeyValueStore + ?Sized + 'static,
{
    let session_id = sessions.get_or_create_session_id();
    let state = ConvState::new(session_id);

    let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
    let (snapshot_tx, snapshot_rx) = watch::channel(ConversationSnapshot::from_state(&state));
    let shutdown = CancellationToken::new();

    let runtime = ConversationRuntime::new(
        state,
        service,
        sessions,
        event_rx,
        event_tx.clone(),
        snapshot_tx,
        shutdown.clone(),
    );
    let task = tokio::spawn(runtime.run());

    let handle = ConversationHandle {
        event_tx,
        snapshot_rx,
        shutdown,
    };
    (handle, task)
}
