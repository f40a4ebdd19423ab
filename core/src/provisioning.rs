/// Key provisioning: ensure every conversation the local user is a member
/// of has exactly one persisted shared secret.
///
/// Invariant: at-most-one write per conversation id. A record that already
/// exists is never rederived or overwritten; for the group path a second
/// derivation is not guaranteed to reproduce the secret already in use, so
/// the existence check is load-bearing, not an optimization.
use crate::error::{ChatError, Result};
use crate::identity::LocalIdentity;
use crate::key_store::{SharedKeyRecord, SharedKeyStore};
use crate::types::Conversation;
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info};

/// What a provisioning call did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisionOutcome {
    /// A new record was derived and persisted
    Provisioned,
    /// A record already existed (or a concurrent call won the write race);
    /// nothing was written
    AlreadyPresent,
}

pub struct KeyProvisioner {
    identity: Arc<LocalIdentity>,
    store: Arc<dyn SharedKeyStore>,
    local_user_id: String,
}

impl KeyProvisioner {
    pub fn new(
        identity: Arc<LocalIdentity>,
        store: Arc<dyn SharedKeyStore>,
        local_user_id: String,
    ) -> Self {
        Self {
            identity,
            store,
            local_user_id,
        }
    }

    /// Derive and persist the conversation's shared secret unless one is
    /// already stored. Safe to re-invoke after a failed write: a failed
    /// write leaves nothing behind, so the retry derives again.
    pub fn provision(&self, conversation: &Conversation) -> Result<ProvisionOutcome> {
        if self.store.get(&conversation.id)?.is_some() {
            debug!(
                "shared key for conversation {} already present",
                conversation.id
            );
            return Ok(ProvisionOutcome::AlreadyPresent);
        }

        let counterparts: Vec<_> = conversation.counterparts(&self.local_user_id).collect();
        if conversation.participants.len() < 2 || counterparts.is_empty() {
            return Err(ChatError::KeyExchange(format!(
                "conversation {} has no counterpart for key agreement",
                conversation.id
            )));
        }

        let shared_key = if conversation.participants.len() == 2 {
            let other = counterparts[0];
            let public_key = other
                .user
                .public_key
                .as_deref()
                .ok_or_else(|| ChatError::MissingPublicKey(other.user.id.clone()))?;
            self.identity.keys.pairwise_secret(public_key)?
        } else {
            let mut public_keys = Vec::with_capacity(counterparts.len());
            for participant in &counterparts {
                match participant.user.public_key.as_deref() {
                    Some(key) => public_keys.push(key.to_string()),
                    None => {
                        return Err(ChatError::MissingPublicKey(participant.user.id.clone()))
                    }
                }
            }
            self.identity.keys.group_secret(&public_keys)?
        };

        let record = SharedKeyRecord {
            conversation_id: conversation.id.clone(),
            shared_key,
            created_at: Utc::now(),
        };

        if self.store.put_if_absent(&record)? {
            info!(
                "provisioned shared key for conversation {} ({} participants)",
                conversation.id,
                conversation.participants.len()
            );
            Ok(ProvisionOutcome::Provisioned)
        } else {
            debug!(
                "lost provisioning race for conversation {}, keeping existing record",
                conversation.id
            );
            Ok(ProvisionOutcome::AlreadyPresent)
        }
    }
}

impl Clone for KeyProvisioner {
    fn clone(&self) -> Self {
        Self {
            identity: self.identity.clone(),
            store: self.store.clone(),
            local_user_id: self.local_user_id.clone(),
        }
    }
}
