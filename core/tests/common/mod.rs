#![allow(dead_code)]
/// Shared test fixtures: a scriptable in-process transport and
/// conversation builders
use async_trait::async_trait;
use chatlink_core::error::{ChatError, Result};
use chatlink_core::transport::ChatTransport;
use chatlink_core::types::{Conversation, ConversationUpdatedEvent, Participant, User};
use chrono::{DateTime, TimeZone, Utc};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::broadcast;

pub struct MockTransport {
    conversations: Mutex<Vec<Conversation>>,
    mark_calls: Mutex<Vec<(String, String)>>,
    fail_mark: Mutex<bool>,
    mark_delay: Mutex<Option<Duration>>,
    created_tx: broadcast::Sender<Conversation>,
    updated_tx: broadcast::Sender<ConversationUpdatedEvent>,
}

impl MockTransport {
    pub fn new() -> Self {
        let (created_tx, _) = broadcast::channel(16);
        let (updated_tx, _) = broadcast::channel(16);
        Self {
            conversations: Mutex::new(Vec::new()),
            mark_calls: Mutex::new(Vec::new()),
            fail_mark: Mutex::new(false),
            mark_delay: Mutex::new(None),
            created_tx,
            updated_tx,
        }
    }

    pub fn set_conversations(&self, conversations: Vec<Conversation>) {
        *self.conversations.lock().unwrap() = conversations;
    }

    pub fn set_fail_mark(&self, fail: bool) {
        *self.fail_mark.lock().unwrap() = fail;
    }

    pub fn set_mark_delay(&self, delay: Duration) {
        *self.mark_delay.lock().unwrap() = Some(delay);
    }

    pub fn push_created(&self, conversation: Conversation) {
        let _ = self.created_tx.send(conversation);
    }

    pub fn push_updated(&self, conversation: Conversation) {
        let _ = self.updated_tx.send(ConversationUpdatedEvent { conversation });
    }

    pub fn mark_call_count(&self) -> usize {
        self.mark_calls.lock().unwrap().len()
    }

    pub fn mark_calls(&self) -> Vec<(String, String)> {
        self.mark_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatTransport for MockTransport {
    async fn fetch_conversations(&self, _user_id: &str) -> Result<Vec<Conversation>> {
        Ok(self.conversations.lock().unwrap().clone())
    }

    async fn mark_as_read(&self, user_id: &str, conversation_id: &str) -> Result<bool> {
        self.mark_calls
            .lock()
            .unwrap()
            .push((user_id.to_string(), conversation_id.to_string()));

        let delay = *self.mark_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if *self.fail_mark.lock().unwrap() {
            return Err(ChatError::Confirmation("mutation rejected".to_string()));
        }
        Ok(true)
    }

    fn conversation_created(&self) -> broadcast::Receiver<Conversation> {
        self.created_tx.subscribe()
    }

    fn conversation_updated(&self) -> broadcast::Receiver<ConversationUpdatedEvent> {
        self.updated_tx.subscribe()
    }
}

pub fn ts(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).unwrap()
}

pub fn user(id: &str, public_key: Option<String>) -> User {
    User {
        id: id.to_string(),
        name: Some(format!("{} name", id)),
        email: None,
        image: None,
        public_key,
    }
}

pub fn participant(id: &str, public_key: Option<String>, has_seen: bool) -> Participant {
    Participant {
        user: user(id, public_key),
        has_seen_latest_message: has_seen,
    }
}

pub fn conversation(id: &str, participants: Vec<Participant>, updated_secs: i64) -> Conversation {
    Conversation {
        id: id.to_string(),
        participants,
        updated_at: ts(updated_secs),
        latest_message: None,
    }
}
