use crate::crypto::KeyAgreement;
use crate::error::{ChatError, Result};
use base64::{engine::general_purpose, Engine as _};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Local key-agreement identity, persisted across sessions so derived
/// conversation secrets stay recoverable
pub struct LocalIdentity {
    /// base58-encoded hash of the public key (for logs)
    pub fingerprint: String,
    pub keys: KeyAgreement,
}

impl LocalIdentity {
    pub fn new(keys: KeyAgreement) -> Self {
        Self {
            fingerprint: keys.fingerprint(),
            keys,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct IdentityFileV1 {
    version: u8,
    x25519_secret_b64: String,
}

fn keys_dir(data_dir: &Path) -> PathBuf {
    data_dir.join("keys")
}

fn identity_path(data_dir: &Path) -> PathBuf {
    keys_dir(data_dir).join("identity.json")
}

pub fn load_or_create(data_dir: &Path) -> Result<LocalIdentity> {
    let keys_dir = keys_dir(data_dir);
    fs::create_dir_all(&keys_dir).map_err(ChatError::Io)?;

    let path = identity_path(data_dir);
    if path.exists() {
        let raw = fs::read_to_string(&path).map_err(ChatError::Io)?;
        let parsed: IdentityFileV1 =
            serde_json::from_str(&raw).map_err(ChatError::Serialization)?;
        if parsed.version != 1 {
            return Err(ChatError::Config(format!(
                "Unsupported identity file version: {}",
                parsed.version
            )));
        }

        let secret = general_purpose::STANDARD
            .decode(parsed.x25519_secret_b64)
            .map_err(|e| ChatError::Config(format!("Invalid base64 in identity: {}", e)))?;
        let secret: [u8; 32] = secret
            .as_slice()
            .try_into()
            .map_err(|_| ChatError::Config("Identity secret must be 32 bytes".to_string()))?;

        return Ok(LocalIdentity::new(KeyAgreement::from_bytes(secret)));
    }

    // Create a new identity
    let keys = KeyAgreement::generate();
    let file = IdentityFileV1 {
        version: 1,
        x25519_secret_b64: general_purpose::STANDARD.encode(keys.secret_bytes()),
    };
    let json = serde_json::to_string_pretty(&file).map_err(ChatError::Serialization)?;
    fs::write(&path, json).map_err(ChatError::Io)?;

    // Best-effort file permissions (0600)
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let _ = fs::set_permissions(&path, fs::Permissions::from_mode(0o600));
    }

    Ok(LocalIdentity::new(keys))
}
