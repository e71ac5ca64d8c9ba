//! Conversation runtime executor

use super::ConversationSnapshot;
use crate::history::load_history;
use crate::remote::ConversationService;
use crate::session::{KeyValueStore, SessionStore};
use crate::state_machine::{transition, ConvState, Effect, Event};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

/// Owns the conversation state and executes the effects of each transition
pub struct ConversationRuntime<S, K>
where
    S: ConversationService + ?Sized + 'static,
    K: KeyValueStore + ?Sized + 'static,
{
    state: ConvState,
    service: Arc<S>,
    sessions: SessionStore<K>,
    event_rx: mpsc::Receiver<Event>,
    event_tx: mpsc::Sender<Event>,
    snapshot_tx: watch::Sender<ConversationSnapshot>,
    shutdown: CancellationToken,
}

impl<S, K> ConversationRuntime<S, K>
where
    S: ConversationService + ?Sized + 'static,
    K: KeyValueStore + ?Sized + 'static,
{
    pub fn new(
        state: ConvState,
        service: Arc<S>,
        sessions: SessionStore<K>,
        event_rx: mpsc::Receiver<Event>,
        event_tx: mpsc::Sender<Event>,
        snapshot_tx: watch::Sender<ConversationSnapshot>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            state,
            service,
            sessions,
            event_rx,
            event_tx,
            snapshot_tx,
            shutdown,
        }
    }

    pub async fn run(mut self) {
        tracing::info!(session_id = %self.state.session_id, "Starting conversation runtime");

        // Seed the transcript before accepting any user action
        if self.state.session_id.is_absent() {
            tracing::warn!("No session id available, skipping history load");
        } else {
            self.process_event(Event::LoadRequested);
        }

        loop {
            tokio::select! {
                biased;

                () = self.shutdown.cancelled() => break,

                Some(event) = self.event_rx.recv() => {
                    self.process_event(event);
                }

                else => break,
            }
        }

        tracing::info!(session_id = %self.state.session_id, "Conversation runtime stopped");
    }

    fn process_event(&mut self, event: Event) {
        // Effects may generate follow-up events; handle them in order
        let mut events_to_process = VecDeque::from([event]);

        while let Some(current_event) = events_to_process.pop_front() {
            let is_user_action = current_event.is_user_action();

            let result = match transition(&self.state, current_event) {
                Ok(r) => r,
                Err(e) if is_user_action => {
                    // Busy or blank input: the action is simply a no-op
                    tracing::debug!(error = %e, "Ignoring user action");
                    continue;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Dropping unexpected event");
                    continue;
                }
            };

            self.state = result.new_state;
            self.publish();

            for effect in result.effects {
                if let Some(generated_event) = self.execute_effect(effect) {
                    events_to_process.push_back(generated_event);
                }
            }
        }
    }

    fn publish(&self) {
        let snapshot = ConversationSnapshot::from_state(&self.state);
        self.snapshot_tx.send_if_modified(|current| {
            if *current == snapshot {
                false
            } else {
                *current = snapshot;
                true
            }
        });
    }

    /// Execute an effect and optionally return a generated event.
    ///
    /// Remote calls run as background tasks and report back through the
    /// event channel, so the loop keeps rejecting user actions meanwhile.
    fn execute_effect(&self, effect: Effect) -> Option<Event> {
        match effect {
            Effect::FetchHistory { session_id } => {
                let service = Arc::clone(&self.service);
                let event_tx = self.event_tx.clone();
                tokio::spawn(async move {
                    let history = load_history(&*service, &session_id).await;
                    let _ = event_tx.send(Event::HistoryLoaded { history }).await;
                });
                None
            }

            Effect::PostMessage { session_id, text } => {
                let service = Arc::clone(&self.service);
                let event_tx = self.event_tx.clone();
                tokio::spawn(async move {
                    let outcome = service.post_message(&session_id, &text).await;
                    let _ = event_tx.send(Event::ReplyReceived { outcome }).await;
                });
                None
            }

            Effect::DeleteSession { session_id } => {
                let service = Arc::clone(&self.service);
                let event_tx = self.event_tx.clone();
                tokio::spawn(async move {
                    let outcome = service.delete_session(&session_id).await;
                    let _ = event_tx.send(Event::SessionDeleted { outcome }).await;
                });
                None
            }

            Effect::RotateSession => {
                let old = self.state.session_id.clone();
                let session_id = self.sessions.rotate();
                tracing::info!(old_session_id = %old, session_id = %session_id, "Session reset");
                Some(Event::SessionRotated { session_id })
            }

            Effect::LogSuppressed { operation, error } => {
                tracing::warn!(
                    operation,
                    session_id = %self.state.session_id,
                    kind = error.kind.as_str(),
                    status = ?error.status,
                    error = %error.message,
                    "Remote call failed, continuing with local fallback"
                );
                None
            }
        }
    }
}
