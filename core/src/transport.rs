/// Transport collaborator boundary
///
/// Queries, the read-state mutation and the subscription streams of
/// conversation events. The engine never touches the wire; implementations
/// own the protocol and deliver events in emission order per conversation.
use crate::error::Result;
use crate::types::{Conversation, ConversationUpdatedEvent};
use async_trait::async_trait;
use tokio::sync::broadcast;

#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// All conversations the user is a member of
    async fn fetch_conversations(&self, user_id: &str) -> Result<Vec<Conversation>>;

    /// Confirm that the user has seen the conversation's latest message.
    /// Returns the server's acknowledgement.
    async fn mark_as_read(&self, user_id: &str, conversation_id: &str) -> Result<bool>;

    /// Subscription stream of newly created conversations
    fn conversation_created(&self) -> broadcast::Receiver<Conversation>;

    /// Subscription stream of conversation updates
    fn conversation_updated(&self) -> broadcast::Receiver<ConversationUpdatedEvent>;
}
