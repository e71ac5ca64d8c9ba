//! Pure state transition function
//!
//! Given the same state and event this always produces the same new state
//! and effects; all I/O happens in the runtime that executes the effects.

use super::state::{APOLOGY_TEXT, NEW_SESSION_TEXT};
use super::{ConvState, Effect, Event, Message, Phase};
use thiserror::Error;

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: ConvState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: ConvState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }
}

/// Reasons an event is not accepted in the current state
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("A request is already in flight ({0})")]
    Busy(&'static str),
    #[error("Message is empty")]
    EmptyMessage,
    #[error("No active session")]
    NoSession,
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
}

/// Pure transition function
pub fn transition(state: &ConvState, event: Event) -> Result<TransitionResult, TransitionError> {
    // Every user action is gated on the idle phase
    if event.is_user_action() && state.is_busy() {
        return Err(TransitionError::Busy(state.phase.display_name()));
    }

    match (state.phase, event) {
        // ============================================================
        // Send: optimistic append, then the outcome message
        // ============================================================
        (Phase::Idle, Event::UserMessage { text }) => {
            if text.trim().is_empty() {
                return Err(TransitionError::EmptyMessage);
            }
            let mut next = state.clone();
            next.transcript.push(Message::user(text.clone()));
            next.phase = Phase::Sending;
            Ok(TransitionResult::new(next).with_effect(Effect::PostMessage {
                session_id: state.session_id.clone(),
                text,
            }))
        }

        (Phase::Sending, Event::ReplyReceived { outcome }) => {
            let mut next = state.clone();
            next.phase = Phase::Idle;
            match outcome {
                Ok(reply) => {
                    next.transcript.push(Message::bot(reply));
                    Ok(TransitionResult::new(next))
                }
                Err(error) => {
                    // The user's message stays; only the reply is substituted
                    next.transcript.push(Message::bot(APOLOGY_TEXT));
                    Ok(TransitionResult::new(next).with_effect(Effect::LogSuppressed {
                        operation: "post_message",
                        error,
                    }))
                }
            }
        }

        // ============================================================
        // History load: transcript is replaced, never merged
        // ============================================================
        (Phase::Idle, Event::LoadRequested) => {
            if state.session_id.is_absent() {
                return Err(TransitionError::NoSession);
            }
            let mut next = state.clone();
            next.phase = Phase::Loading;
            Ok(TransitionResult::new(next).with_effect(Effect::FetchHistory {
                session_id: state.session_id.clone(),
            }))
        }

        (Phase::Loading, Event::HistoryLoaded { history }) => {
            let next = ConvState {
                session_id: state.session_id.clone(),
                transcript: history.transcript,
                phase: Phase::Idle,
            };
            let result = TransitionResult::new(next);
            Ok(match history.suppressed {
                Some(error) => result.with_effect(Effect::LogSuppressed {
                    operation: "get_history",
                    error,
                }),
                None => result,
            })
        }

        // ============================================================
        // Reset: delete remotely, then rotate regardless of the outcome
        // ============================================================
        (Phase::Idle, Event::ResetRequested) => {
            if state.session_id.is_absent() {
                return Err(TransitionError::NoSession);
            }
            let mut next = state.clone();
            next.phase = Phase::Resetting;
            Ok(TransitionResult::new(next).with_effect(Effect::DeleteSession {
                session_id: state.session_id.clone(),
            }))
        }

        (Phase::Resetting, Event::SessionDeleted { outcome }) => {
            let result = TransitionResult::new(state.clone());
            let result = match outcome {
                Ok(()) => result,
                Err(error) => result.with_effect(Effect::LogSuppressed {
                    operation: "delete_session",
                    error,
                }),
            };
            Ok(result.with_effect(Effect::RotateSession))
        }

        (Phase::Resetting, Event::SessionRotated { session_id }) => {
            Ok(TransitionResult::new(ConvState {
                session_id,
                transcript: vec![Message::bot(NEW_SESSION_TEXT)],
                phase: Phase::Idle,
            }))
        }

        (phase, event) => Err(TransitionError::InvalidTransition(format!(
            "{event:?} while {}",
            phase.display_name()
        ))),
    }
}
