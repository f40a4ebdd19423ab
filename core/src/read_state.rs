/// Read-state tracking: the optimistic seen-flag and its reconciliation
/// against the server's confirmation
use crate::feed::LiveFeed;
use crate::transport::ChatTransport;
use crate::types::ConversationUpdatedEvent;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

pub struct ReadStateTracker {
    transport: Arc<dyn ChatTransport>,
    feed: Arc<RwLock<LiveFeed>>,
    local_user_id: String,
    /// The conversation currently on screen, session-scoped
    current: Arc<RwLock<Option<String>>>,
}

impl ReadStateTracker {
    pub fn new(
        transport: Arc<dyn ChatTransport>,
        feed: Arc<RwLock<LiveFeed>>,
        local_user_id: String,
    ) -> Self {
        Self {
            transport,
            feed,
            local_user_id,
            current: Arc::new(RwLock::new(None)),
        }
    }

    /// Currently open conversation, if any
    pub async fn selected(&self) -> Option<String> {
        self.current.read().await.clone()
    }

    /// The user opened a conversation. When the flag is already true this
    /// is a pure selection change: no confirmation is dispatched.
    pub async fn open(&self, conversation_id: &str, has_seen: bool) {
        {
            let mut current = self.current.write().await;
            *current = Some(conversation_id.to_string());
        }

        if has_seen {
            debug!(
                "conversation {} already seen, skipping confirmation",
                conversation_id
            );
            return;
        }

        // Optimistic: flip the local flag before the server answers
        {
            let mut feed = self.feed.write().await;
            feed.patch_participant(conversation_id, &self.local_user_id, true);
        }

        match self
            .transport
            .mark_as_read(&self.local_user_id, conversation_id)
            .await
        {
            Ok(true) => {
                let mut feed = self.feed.write().await;
                if !feed.patch_participant(conversation_id, &self.local_user_id, true) {
                    debug!(
                        "conversation {} not cached, confirmation patch skipped",
                        conversation_id
                    );
                }
            }
            Ok(false) => {
                warn!(
                    "server did not confirm read state for conversation {}",
                    conversation_id
                );
            }
            // The optimistic flag stays set: rolling back here could
            // flicker against a concurrent push that marks the
            // conversation seen.
            Err(e) => {
                warn!(
                    "read confirmation failed for conversation {}: {}",
                    conversation_id, e
                );
            }
        }
    }

    /// New content arrived on a conversation. If it is the one currently on
    /// screen the user is already looking at it: re-mark it seen.
    pub async fn apply_update(&self, event: &ConversationUpdatedEvent) {
        let is_open = {
            let current = self.current.read().await;
            current.as_deref() == Some(event.conversation.id.as_str())
        };
        if is_open {
            self.open(&event.conversation.id, false).await;
        }
    }
}

impl Clone for ReadStateTracker {
    fn clone(&self) -> Self {
        Self {
            transport: self.transport.clone(),
            feed: self.feed.clone(),
            local_user_id: self.local_user_id.clone(),
            current: self.current.clone(),
        }
    }
}
