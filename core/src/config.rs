/// Session configuration
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Everything a session needs that is not an injected collaborator.
/// Created at session start by the embedding application.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Id of the locally signed-in user (assigned by the auth collaborator)
    pub local_user_id: String,

    /// Directory for the persisted identity keypair and the shared-key store
    pub data_dir: PathBuf,
}

impl SessionConfig {
    pub fn new(local_user_id: impl Into<String>, data_dir: impl Into<PathBuf>) -> Self {
        Self {
            local_user_id: local_user_id.into(),
            data_dir: data_dir.into(),
        }
    }
}
