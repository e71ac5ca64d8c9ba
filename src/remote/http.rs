//! HTTP implementation of the conversation service

use super::{ConversationService, HistoryRecord, PostMessageRequest, PostMessageResponse, RemoteError};
use crate::session::SessionId;
use async_trait::async_trait;
use reqwest::{Client, Response};
use std::time::Duration;

/// Talks to the service's `/api/chat` endpoints
pub struct HttpConversationService {
    client: Client,
    base_url: String,
}

impl HttpConversationService {
    /// `timeout` of `None` leaves the transport default in place
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Self {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Self {
            client: builder.build().unwrap_or_else(|_| Client::new()),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn chat_url(&self) -> String {
        format!("{}/api/chat", self.base_url)
    }

    fn session_url(&self, session_id: &SessionId) -> String {
        format!("{}/api/chat/{}", self.base_url, session_id)
    }

    /// Turn a non-2xx response into an error carrying the body text
    async fn check_status(response: Response) -> Result<Response, RemoteError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(RemoteError::status(
            status.as_u16(),
            format!("Service returned {status}: {body}"),
        ))
    }
}

#[async_trait]
impl ConversationService for HttpConversationService {
    async fn get_history(&self, session_id: &SessionId) -> Result<Vec<HistoryRecord>, RemoteError> {
        let response = self.client.get(self.session_url(session_id)).send().await?;
        let response = Self::check_status(response).await?;
        Ok(response.json::<Vec<HistoryRecord>>().await?)
    }

    async fn post_message(&self, session_id: &SessionId, message: &str) -> Result<String, RemoteError> {
        let body = PostMessageRequest {
            session_id: session_id.as_str(),
            message,
        };
        let response = self.client.post(self.chat_url()).json(&body).send().await?;
        let response = Self::check_status(response).await?;
        let parsed: PostMessageResponse = response.json().await?;
        Ok(parsed.reply)
    }

    async fn delete_session(&self, session_id: &SessionId) -> Result<(), RemoteError> {
        let response = self
            .client
            .delete(self.session_url(session_id))
            .send()
            .await?;
        Self::check_status(response).await?;
        Ok(())
    }
}
