/// Shared-key persistence: one symmetric secret per conversation
///
/// The write path is compare-and-set so that two provisioning calls racing
/// on the same conversation id can never both persist: at-most-one record
/// per id holds even under concurrent triggers.
use crate::error::{ChatError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

/// The derived symmetric secret for one conversation, written exactly once
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedKeyRecord {
    pub conversation_id: String,
    /// hex-encoded key material
    pub shared_key: String,
    pub created_at: DateTime<Utc>,
}

pub trait SharedKeyStore: Send + Sync {
    fn get(&self, conversation_id: &str) -> Result<Option<SharedKeyRecord>>;

    /// Persist the record unless one already exists for its conversation id.
    /// Returns false (writing nothing) when a record is already present.
    fn put_if_absent(&self, record: &SharedKeyRecord) -> Result<bool>;
}

/// sled-backed store under `<data_dir>/shared_keys.db`
pub struct SledKeyStore {
    db: sled::Db,
}

impl SledKeyStore {
    pub fn new(data_dir: &Path) -> Result<Self> {
        let db = sled::open(data_dir.join("shared_keys.db"))
            .map_err(|e| ChatError::Storage(format!("shared keys DB: {}", e)))?;
        Ok(Self { db })
    }
}

impl SharedKeyStore for SledKeyStore {
    fn get(&self, conversation_id: &str) -> Result<Option<SharedKeyRecord>> {
        match self
            .db
            .get(conversation_id.as_bytes())
            .map_err(|e| ChatError::Storage(format!("get shared key: {}", e)))?
        {
            Some(val) => {
                let record = serde_json::from_slice::<SharedKeyRecord>(&val)
                    .map_err(ChatError::Serialization)?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    fn put_if_absent(&self, record: &SharedKeyRecord) -> Result<bool> {
        let val = serde_json::to_vec(record).map_err(ChatError::Serialization)?;
        let swap = self
            .db
            .compare_and_swap(record.conversation_id.as_bytes(), None as Option<&[u8]>, Some(val))
            .map_err(|e| ChatError::Storage(format!("put shared key: {}", e)))?;
        Ok(swap.is_ok())
    }
}

impl Clone for SledKeyStore {
    fn clone(&self) -> Self {
        Self { db: self.db.clone() }
    }
}

/// In-memory store for tests and ephemeral sessions
#[derive(Default)]
pub struct MemoryKeyStore {
    records: Mutex<HashMap<String, SharedKeyRecord>>,
}

impl MemoryKeyStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SharedKeyStore for MemoryKeyStore {
    fn get(&self, conversation_id: &str) -> Result<Option<SharedKeyRecord>> {
        let records = self
            .records
            .lock()
            .map_err(|_| ChatError::Storage("key store mutex poisoned".to_string()))?;
        Ok(records.get(conversation_id).cloned())
    }

    fn put_if_absent(&self, record: &SharedKeyRecord) -> Result<bool> {
        let mut records = self
            .records
            .lock()
            .map_err(|_| ChatError::Storage("key store mutex poisoned".to_string()))?;
        if records.contains_key(&record.conversation_id) {
            return Ok(false);
        }
        records.insert(record.conversation_id.clone(), record.clone());
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(conversation_id: &str, shared_key: &str) -> SharedKeyRecord {
        SharedKeyRecord {
            conversation_id: conversation_id.to_string(),
            shared_key: shared_key.to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn memory_store_never_overwrites() {
        let store = MemoryKeyStore::new();

        assert!(store.put_if_absent(&record("c1", "aaaa")).unwrap());
        assert!(!store.put_if_absent(&record("c1", "bbbb")).unwrap());

        let kept = store.get("c1").unwrap().unwrap();
        assert_eq!(kept.shared_key, "aaaa");
    }

    #[test]
    fn sled_store_never_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let store = SledKeyStore::new(dir.path()).unwrap();

        assert!(store.put_if_absent(&record("c1", "aaaa")).unwrap());
        assert!(!store.put_if_absent(&record("c1", "bbbb")).unwrap());

        let kept = store.get("c1").unwrap().unwrap();
        assert_eq!(kept.shared_key, "aaaa");
        assert!(store.get("c2").unwrap().is_none());
    }

    #[test]
    fn sled_store_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();

        {
            let store = SledKeyStore::new(dir.path()).unwrap();
            assert!(store.put_if_absent(&record("c1", "aaaa")).unwrap());
        }

        let reopened = SledKeyStore::new(dir.path()).unwrap();
        assert_eq!(reopened.get("c1").unwrap().unwrap().shared_key, "aaaa");
    }
}
