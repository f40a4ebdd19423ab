/// ChatLink - secure conversation engine for a real-time chat client
///
/// Per-conversation key provisioning, optimistic read-state reconciliation
/// and a live deduplicated conversation feed, driven by an injected
/// transport. Rendering, authentication and the wire protocol live in the
/// embedding application.

pub mod config;
pub mod crypto;
pub mod error;
pub mod feed;
pub mod identity;
pub mod key_store;
pub mod provisioning;
pub mod read_state;
pub mod session;
pub mod transport;
pub mod types;

pub use config::SessionConfig;
pub use error::{ChatError, Result};
pub use session::ChatSession;
