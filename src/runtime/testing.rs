//! Mock implementations for testing
//!
//! These mocks enable integration testing without real I/O.

use super::{start, ConversationHandle, ConversationSnapshot};
use crate::remote::{ConversationService, HistoryRecord, RemoteError};
use crate::session::{KeyValueStore, MemoryKeyValueStore, SessionId, SessionStore};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Semaphore;

// ============================================================================
// Mock Conversation Service
// ============================================================================

/// A call observed by the mock service
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    GetHistory(SessionId),
    PostMessage(SessionId, String),
    DeleteSession(SessionId),
}

/// Mock service that returns queued outcomes and records every call.
///
/// With nothing queued: history is empty, deletes succeed, and posts fail.
pub struct MockConversationService {
    history: Mutex<VecDeque<Result<Vec<HistoryRecord>, RemoteError>>>,
    replies: Mutex<VecDeque<Result<String, RemoteError>>>,
    deletes: Mutex<VecDeque<Result<(), RemoteError>>>,
    calls: Mutex<Vec<Call>>,
    /// When set, each call waits for a permit before answering
    gate: Mutex<Option<Arc<Semaphore>>>,
}

impl MockConversationService {
    pub fn new() -> Self {
        Self {
            history: Mutex::new(VecDeque::new()),
            replies: Mutex::new(VecDeque::new()),
            deletes: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
            gate: Mutex::new(None),
        }
    }

    pub fn queue_history(&self, outcome: Result<Vec<HistoryRecord>, RemoteError>) {
        self.history.lock().unwrap().push_back(outcome);
    }

    pub fn queue_reply(&self, outcome: Result<String, RemoteError>) {
        self.replies.lock().unwrap().push_back(outcome);
    }

    pub fn queue_delete(&self, outcome: Result<(), RemoteError>) {
        self.deletes.lock().unwrap().push_back(outcome);
    }

    /// Make subsequent calls block until [`Self::release`] is called
    pub fn hold(&self) {
        *self.gate.lock().unwrap() = Some(Arc::new(Semaphore::new(0)));
    }

    /// Let one held call answer
    pub fn release(&self) {
        if let Some(gate) = self.gate.lock().unwrap().as_ref() {
            gate.add_permits(1);
        }
    }

    pub fn recorded_calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    async fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);

        let gate = self.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.acquire().await.unwrap().forget();
        }
    }
}

impl Default for MockConversationService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConversationService for MockConversationService {
    async fn get_history(&self, session_id: &SessionId) -> Result<Vec<HistoryRecord>, RemoteError> {
        self.record(Call::GetHistory(session_id.clone())).await;
        self.history.lock().unwrap().pop_front().unwrap_or(Ok(vec![]))
    }

    async fn post_message(&self, session_id: &SessionId, message: &str) -> Result<String, RemoteError> {
        self.record(Call::PostMessage(session_id.clone(), message.to_string()))
            .await;
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(RemoteError::network("No mock reply queued")))
    }

    async fn delete_session(&self, session_id: &SessionId) -> Result<(), RemoteError> {
        self.record(Call::DeleteSession(session_id.clone())).await;
        self.deletes.lock().unwrap().pop_front().unwrap_or(Ok(()))
    }
}

// ============================================================================
// Test Runtime Builder
// ============================================================================

const WAIT_TIMEOUT: Duration = Duration::from_secs(2);

/// A running conversation wired to mocks
pub struct TestRuntime {
    pub handle: ConversationHandle,
    pub service: Arc<MockConversationService>,
    pub storage: Arc<dyn KeyValueStore>,
    runtime_task: tokio::task::JoinHandle<()>,
}

impl TestRuntime {
    pub fn builder() -> TestRuntimeBuilder {
        TestRuntimeBuilder::new()
    }

    /// Wait until a snapshot satisfies `pred`, or time out
    pub async fn wait_until(
        &self,
        pred: impl FnMut(&ConversationSnapshot) -> bool,
    ) -> Option<ConversationSnapshot> {
        let mut rx = self.handle.subscribe();
        tokio::time::timeout(WAIT_TIMEOUT, async move {
            rx.wait_for(pred).await.map(|snap| snap.clone()).ok()
        })
        .await
        .ok()
        .flatten()
    }

    /// Wait for the startup history load to land
    pub async fn wait_ready(&self) -> ConversationSnapshot {
        self.wait_until(|s| !s.is_busy() && !s.messages.is_empty())
            .await
            .expect("history load should complete")
    }

    pub async fn wait_idle(&self) -> ConversationSnapshot {
        self.wait_until(|s| !s.is_busy())
            .await
            .expect("runtime should become idle")
    }
}

impl Drop for TestRuntime {
    fn drop(&mut self) {
        self.handle.shutdown();
    }
}

pub struct TestRuntimeBuilder {
    service: Option<MockConversationService>,
    storage: Option<Arc<dyn KeyValueStore>>,
}

impl TestRuntimeBuilder {
    pub fn new() -> Self {
        Self {
            service: None,
            storage: None,
        }
    }

    pub fn service(mut self, service: MockConversationService) -> Self {
        self.service = Some(service);
        self
    }

    pub fn storage(mut self, storage: Arc<dyn KeyValueStore>) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn build(self) -> TestRuntime {
        let service = Arc::new(self.service.unwrap_or_default());
        let storage = self
            .storage
            .unwrap_or_else(|| Arc::new(MemoryKeyValueStore::new()) as Arc<dyn KeyValueStore>);

        let (handle, runtime_handle) =
            start(Arc::clone(&service), SessionStore::new(Arc::clone(&storage)));

        TestRuntime {
            handle,
            service,
            storage,
            runtime_task: runtime_handle,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::GREETING_TEXT;
    use crate::session::{StorageError, SESSION_KEY};
    use crate::state_machine::state::{APOLOGY_TEXT, NEW_SESSION_TEXT};
    use crate::state_machine::{Message, Phase};

    struct BrokenStore;

    impl KeyValueStore for BrokenStore {
        fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
            Err(StorageError::Unavailable("read-only profile".to_string()))
        }

        fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
            Err(StorageError::Unavailable("read-only profile".to_string()))
        }
    }

    #[tokio::test]
    async fn test_mock_service_defaults() {
        let mock = MockConversationService::new();
        let id = SessionId::from("s");

        assert_eq!(mock.get_history(&id).await.unwrap(), vec![]);
        assert!(mock.post_message(&id, "hi").await.is_err());
        assert!(mock.delete_session(&id).await.is_ok());
        assert_eq!(
            mock.recorded_calls(),
            vec![
                Call::GetHistory(id.clone()),
                Call::PostMessage(id.clone(), "hi".to_string()),
                Call::DeleteSession(id),
            ]
        );
    }

    /// Fresh install: id is created, service has nothing, greeting is shown
    #[tokio::test]
    async fn test_startup_new_session_greets() {
        let rt = TestRuntime::builder().build();
        let snap = rt.wait_ready().await;

        assert_eq!(snap.messages, vec![Message::bot(GREETING_TEXT)]);
        assert!(!snap.session_id.is_absent());
        assert_eq!(
            rt.storage.get(SESSION_KEY).unwrap().as_deref(),
            Some(snap.session_id.as_str())
        );
        assert_eq!(
            rt.service.recorded_calls(),
            vec![Call::GetHistory(snap.session_id)]
        );
    }

    /// Returning user: persisted id is reused and its history replayed
    #[tokio::test]
    async fn test_startup_restores_history() {
        let storage = Arc::new(MemoryKeyValueStore::new());
        storage.set(SESSION_KEY, "returning-user").unwrap();

        let service = MockConversationService::new();
        service.queue_history(Ok(vec![
            HistoryRecord::new("top stories?", "Here are three."),
            HistoryRecord::new("more", "Sure."),
        ]));

        let rt = TestRuntime::builder()
            .service(service)
            .storage(storage)
            .build();
        let snap = rt.wait_ready().await;

        assert_eq!(snap.session_id.as_str(), "returning-user");
        assert_eq!(
            snap.messages,
            vec![
                Message::user("top stories?"),
                Message::bot("Here are three."),
                Message::user("more"),
                Message::bot("Sure."),
            ]
        );
    }

    #[tokio::test]
    async fn test_startup_history_failure_greets() {
        let service = MockConversationService::new();
        service.queue_history(Err(RemoteError::status(500, "down")));

        let rt = TestRuntime::builder().service(service).build();
        let snap = rt.wait_ready().await;
        assert_eq!(snap.messages, vec![Message::bot(GREETING_TEXT)]);
        assert_eq!(snap.phase, Phase::Idle);
    }

    #[tokio::test]
    async fn test_send_success_scenario() {
        let service = MockConversationService::new();
        service.queue_reply(Ok("Here are today's top stories...".to_string()));

        let rt = TestRuntime::builder().service(service).build();
        let ready = rt.wait_ready().await;

        rt.handle.send("latest headlines").await.unwrap();
        let snap = rt
            .wait_until(|s| !s.is_busy() && s.messages.len() == 3)
            .await
            .unwrap();

        assert_eq!(
            snap.messages,
            vec![
                Message::bot(GREETING_TEXT),
                Message::user("latest headlines"),
                Message::bot("Here are today's top stories..."),
            ]
        );
        assert_eq!(
            rt.service.recorded_calls().last(),
            Some(&Call::PostMessage(
                ready.session_id,
                "latest headlines".to_string()
            ))
        );
    }

    /// Failure keeps the user's message and appends the apology
    #[tokio::test]
    async fn test_send_failure_scenario() {
        let service = MockConversationService::new();
        service.queue_reply(Err(RemoteError::network("connection reset")));

        let rt = TestRuntime::builder().service(service).build();
        rt.wait_ready().await;

        rt.handle.send("x").await.unwrap();
        let snap = rt
            .wait_until(|s| !s.is_busy() && s.messages.len() == 3)
            .await
            .unwrap();

        assert_eq!(snap.messages[1], Message::user("x"));
        assert_eq!(snap.messages[2], Message::bot(APOLOGY_TEXT));
        assert_eq!(snap.phase, Phase::Idle);
    }

    /// Optimistic append is visible while the request is still outstanding
    #[tokio::test]
    async fn test_send_is_two_phase() {
        let service = MockConversationService::new();
        service.queue_reply(Ok("reply".to_string()));

        let rt = TestRuntime::builder().service(service).build();
        rt.wait_ready().await;
        rt.service.hold();

        rt.handle.send("question").await.unwrap();
        let pending = rt.wait_until(|s| s.messages.len() == 2).await.unwrap();
        assert_eq!(pending.phase, Phase::Sending);
        assert!(pending.awaiting_reply());
        assert_eq!(pending.messages[1], Message::user("question"));

        rt.service.release();
        let done = rt
            .wait_until(|s| !s.is_busy() && s.messages.len() == 3)
            .await
            .unwrap();
        assert_eq!(done.messages[2], Message::bot("reply"));
    }

    /// Actions issued while a request is outstanding change nothing
    #[tokio::test]
    async fn test_actions_ignored_while_busy() {
        let service = MockConversationService::new();
        service.queue_reply(Ok("first answer".to_string()));

        let rt = TestRuntime::builder().service(service).build();
        let ready = rt.wait_ready().await;
        rt.service.hold();

        rt.handle.send("first").await.unwrap();
        rt.wait_until(|s| s.phase == Phase::Sending).await.unwrap();

        rt.handle.send("second").await.unwrap();
        rt.handle.reset_session().await.unwrap();
        rt.handle.reload_history().await.unwrap();

        rt.service.release();
        let snap = rt
            .wait_until(|s| !s.is_busy() && s.messages.len() == 3)
            .await
            .unwrap();

        assert_eq!(snap.session_id, ready.session_id);
        assert_eq!(
            snap.messages,
            vec![
                Message::bot(GREETING_TEXT),
                Message::user("first"),
                Message::bot("first answer"),
            ]
        );
        assert_eq!(
            rt.service.recorded_calls(),
            vec![
                Call::GetHistory(ready.session_id.clone()),
                Call::PostMessage(ready.session_id, "first".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_blank_message_ignored() {
        let rt = TestRuntime::builder().build();
        let ready = rt.wait_ready().await;

        rt.handle.send("   ").await.unwrap();
        rt.handle.send("").await.unwrap();

        // A held reload queued behind the blank sends proves they were processed
        rt.service.hold();
        rt.handle.reload_history().await.unwrap();
        rt.wait_until(|s| s.phase == Phase::Loading).await.unwrap();
        rt.service.release();
        let snap = rt.wait_idle().await;

        assert_eq!(snap.messages, ready.messages);
        assert_eq!(
            rt.service.recorded_calls(),
            vec![
                Call::GetHistory(ready.session_id.clone()),
                Call::GetHistory(ready.session_id),
            ]
        );
    }

    #[tokio::test]
    async fn test_reset_rotates_session() {
        let rt = TestRuntime::builder().build();
        let ready = rt.wait_ready().await;

        rt.handle.reset_session().await.unwrap();
        let snap = rt
            .wait_until(|s| !s.is_busy() && s.session_id != ready.session_id)
            .await
            .unwrap();

        assert_eq!(snap.messages, vec![Message::bot(NEW_SESSION_TEXT)]);
        assert_eq!(
            rt.storage.get(SESSION_KEY).unwrap().as_deref(),
            Some(snap.session_id.as_str())
        );
        assert_eq!(
            rt.service.recorded_calls().last(),
            Some(&Call::DeleteSession(ready.session_id))
        );
    }

    /// The local reset proceeds even when the service refuses the delete
    #[tokio::test]
    async fn test_reset_proceeds_when_delete_fails() {
        let service = MockConversationService::new();
        service.queue_delete(Err(RemoteError::status(503, "unavailable")));

        let rt = TestRuntime::builder().service(service).build();
        let ready = rt.wait_ready().await;

        rt.handle.reset_session().await.unwrap();
        let snap = rt
            .wait_until(|s| !s.is_busy() && s.session_id != ready.session_id)
            .await
            .unwrap();

        assert!(!snap.session_id.is_absent());
        assert_eq!(snap.messages, vec![Message::bot(NEW_SESSION_TEXT)]);
    }

    /// Messages after a reset go out under the new id
    #[tokio::test]
    async fn test_send_after_reset_uses_new_session() {
        let service = MockConversationService::new();
        service.queue_reply(Ok("fresh".to_string()));

        let rt = TestRuntime::builder().service(service).build();
        let ready = rt.wait_ready().await;

        rt.handle.reset_session().await.unwrap();
        let reset = rt
            .wait_until(|s| !s.is_busy() && s.session_id != ready.session_id)
            .await
            .unwrap();

        rt.handle.send("hello again").await.unwrap();
        rt.wait_until(|s| !s.is_busy() && s.messages.len() == 3)
            .await
            .unwrap();

        assert_eq!(
            rt.service.recorded_calls().last(),
            Some(&Call::PostMessage(reset.session_id, "hello again".to_string()))
        );
    }

    #[tokio::test]
    async fn test_reload_replaces_transcript() {
        let service = MockConversationService::new();
        service.queue_reply(Ok("answer".to_string()));

        let rt = TestRuntime::builder().service(service).build();
        rt.wait_ready().await;

        rt.handle.send("question").await.unwrap();
        rt.wait_until(|s| !s.is_busy() && s.messages.len() == 3)
            .await
            .unwrap();

        rt.service
            .queue_history(Ok(vec![HistoryRecord::new("question", "answer")]));
        rt.handle.reload_history().await.unwrap();
        let snap = rt
            .wait_until(|s| !s.is_busy() && s.messages.len() == 2)
            .await
            .unwrap();
        assert_eq!(
            snap.messages,
            vec![Message::user("question"), Message::bot("answer")]
        );
    }

    /// Without durable storage there is no session: no load, reset is a no-op
    #[tokio::test]
    async fn test_unavailable_storage_runs_without_session() {
        let service = MockConversationService::new();
        service.queue_reply(Ok("still here".to_string()));

        let rt = TestRuntime::builder()
            .service(service)
            .storage(Arc::new(BrokenStore))
            .build();

        rt.handle.reset_session().await.unwrap();
        rt.handle.send("anyone?").await.unwrap();
        let snap = rt
            .wait_until(|s| !s.is_busy() && s.messages.len() == 2)
            .await
            .unwrap();

        assert!(snap.session_id.is_absent());
        assert_eq!(
            snap.messages,
            vec![Message::user("anyone?"), Message::bot("still here")]
        );
        assert_eq!(
            rt.service.recorded_calls(),
            vec![Call::PostMessage(SessionId::absent(), "anyone?".to_string())]
        );
    }

    #[tokio::test]
    async fn test_handle_errors_after_shutdown() {
        let rt = TestRuntime::builder().build();
        rt.wait_ready().await;

        rt.handle.shutdown();
        tokio::time::timeout(WAIT_TIMEOUT, async {
            while !rt.runtime_task.is_finished() {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("runtime should stop");

        assert!(rt.handle.send("late").await.is_err());
    }
}
