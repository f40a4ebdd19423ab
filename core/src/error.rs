/// Error types for the conversation engine
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChatError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Missing public key for user {0}")]
    MissingPublicKey(String),

    #[error("Key exchange error: {0}")]
    KeyExchange(String),

    #[error("Read confirmation error: {0}")]
    Confirmation(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, ChatError>;
