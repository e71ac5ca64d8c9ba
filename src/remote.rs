//! Remote conversation service
//!
//! The service keeps the authoritative transcript per session. The client
//! consumes exactly three calls: fetch history, post a message, delete a
//! session.

mod error;
mod http;
mod types;

pub use error::{RemoteError, RemoteErrorKind};
pub use http::HttpConversationService;
pub use types::{HistoryRecord, PostMessageRequest, PostMessageResponse};

use crate::session::SessionId;
use async_trait::async_trait;
use std::sync::Arc;

/// Calls the client makes against the conversation service
#[async_trait]
pub trait ConversationService: Send + Sync {
    /// Fetch the persisted exchanges for a session, oldest first
    async fn get_history(&self, session_id: &SessionId) -> Result<Vec<HistoryRecord>, RemoteError>;

    /// Post a user message and return the bot's reply text
    async fn post_message(&self, session_id: &SessionId, message: &str) -> Result<String, RemoteError>;

    /// Drop everything the service holds for a session
    async fn delete_session(&self, session_id: &SessionId) -> Result<(), RemoteError>;
}

#[async_trait]
impl<T: ConversationService + ?Sized> ConversationService for Arc<T> {
    async fn get_history(&self, session_id: &SessionId) -> Result<Vec<HistoryRecord>, RemoteError> {
        (**self).get_history(session_id).await
    }

    async fn post_message(&self, session_id: &SessionId, message: &str) -> Result<String, RemoteError> {
        (**self).post_message(session_id, message).await
    }

    async fn delete_session(&self, session_id: &SessionId) -> Result<(), RemoteError> {
        (**self).delete_session(session_id).await
    }
}

/// Logging wrapper for conversation services
pub struct LoggingService {
    inner: Arc<dyn ConversationService>,
}

impl LoggingService {
    pub fn new(inner: Arc<dyn ConversationService>) -> Self {
        Self { inner }
    }

    fn log_outcome<T>(
        operation: &'static str,
        session_id: &SessionId,
        start: std::time::Instant,
        result: &Result<T, RemoteError>,
    ) {
        let duration = start.elapsed();
        match result {
            Ok(_) => {
                tracing::info!(
                    operation,
                    session_id = %session_id,
                    duration_ms = %duration.as_millis(),
                    "Remote call completed"
                );
            }
            Err(e) => {
                tracing::warn!(
                    operation,
                    session_id = %session_id,
                    duration_ms = %duration.as_millis(),
                    kind = e.kind.as_str(),
                    status = ?e.status,
                    error = %e.message,
                    "Remote call failed"
                );
            }
        }
    }
}

#[async_trait]
impl ConversationService for LoggingService {
    async fn get_history(&self, session_id: &SessionId) -> Result<Vec<HistoryRecord>, RemoteError> {
        let start = std::time::Instant::now();
        let result = self.inner.get_history(session_id).await;
        Self::log_outcome("get_history", session_id, start, &result);
        result
    }

    async fn post_message(&self, session_id: &SessionId, message: &str) -> Result<String, RemoteError> {
        let start = std::time::Instant::now();
        let result = self.inner.post_message(session_id, message).await;
        Self::log_outcome("post_message", session_id, start, &result);
        result
    }

    async fn delete_session(&self, session_id: &SessionId) -> Result<(), RemoteError> {
        let start = std::time::Instant::now();
        let result = self.inner.delete_session(session_id).await;
        Self::log_outcome("delete_session", session_id, start, &result);
        result
    }
}
