/// Live conversation feed: the materialized list the rendering layer reads
///
/// Unique by conversation id, ordered newest-first by `updated_at`. The
/// order is a property of the whole feed, restored on every change, since
/// arrival order of events does not by itself guarantee recency order.
use crate::types::Conversation;

#[derive(Debug, Default)]
pub struct LiveFeed {
    entries: Vec<Conversation>,
}

impl LiveFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace by conversation id, then restore recency order.
    /// A duplicate id never produces a second entry, and an older duplicate
    /// never clobbers a newer one.
    pub fn upsert(&mut self, conversation: Conversation) {
        match self.entries.iter().position(|c| c.id == conversation.id) {
            Some(idx) => {
                if conversation.updated_at >= self.entries[idx].updated_at {
                    self.entries[idx] = conversation;
                }
            }
            None => self.entries.push(conversation),
        }
        self.entries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
    }

    /// Field-scoped write of one participant's read flag, leaving every
    /// other participant and field untouched. Returns false (changing
    /// nothing) when the conversation or participant is not cached yet;
    /// absence is expected, not an error.
    pub fn patch_participant(
        &mut self,
        conversation_id: &str,
        user_id: &str,
        has_seen: bool,
    ) -> bool {
        let conversation = match self.entries.iter_mut().find(|c| c.id == conversation_id) {
            Some(c) => c,
            None => return false,
        };
        match conversation
            .participants
            .iter_mut()
            .find(|p| p.user.id == user_id)
        {
            Some(participant) => {
                participant.has_seen_latest_message = has_seen;
                true
            }
            None => false,
        }
    }

    pub fn has_seen(&self, conversation_id: &str, user_id: &str) -> bool {
        self.entries
            .iter()
            .find(|c| c.id == conversation_id)
            .map(|c| c.has_seen(user_id))
            .unwrap_or(false)
    }

    /// Ordered copy for the rendering collaborator
    pub fn snapshot(&self) -> Vec<Conversation> {
        self.entries.clone()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
