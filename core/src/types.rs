/// Shared types for the conversation engine
///
/// Wire shapes mirror the chat server's payloads (camelCase field names);
/// users, participants and conversations are owned by the transport
/// collaborator and observed here through queries and subscription events.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A chat user as delivered by the identity/transport collaborator
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    /// base64-encoded x25519 public key used for key agreement.
    /// Absent until the user has published one.
    #[serde(default)]
    pub public_key: Option<String>,
}

/// One (user, conversation) membership with its read flag
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub user: User,
    pub has_seen_latest_message: bool,
}

/// A conversation thread. Message history is opaque to this engine; only
/// the id, the participant list and the recency timestamp are interpreted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: String,
    pub participants: Vec<Participant>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub latest_message: Option<serde_json::Value>,
}

impl Conversation {
    pub fn participant(&self, user_id: &str) -> Option<&Participant> {
        self.participants.iter().find(|p| p.user.id == user_id)
    }

    /// All participants except the given user
    pub fn counterparts<'a>(&'a self, user_id: &'a str) -> impl Iterator<Item = &'a Participant> {
        self.participants.iter().filter(move |p| p.user.id != user_id)
    }

    pub fn has_seen(&self, user_id: &str) -> bool {
        self.participant(user_id)
            .map(|p| p.has_seen_latest_message)
            .unwrap_or(false)
    }

    /// List-view title: the other participants' names, comma-joined
    pub fn counterpart_names(&self, user_id: &str) -> String {
        self.counterparts(user_id)
            .filter_map(|p| p.user.name.as_deref())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// List-view avatar: the first counterpart that has an image
    pub fn counterpart_image(&self, user_id: &str) -> Option<&str> {
        self.participants
            .iter()
            .filter(|p| p.user.id != user_id)
            .find_map(|p| p.user.image.as_deref())
    }
}

/// Payload of the conversation-updated subscription channel
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationUpdatedEvent {
    pub conversation: Conversation,
}
