/// Chat session: wires the engine together and drives the subscription
/// event loop
///
/// Created at session start, torn down at session end. All collaborators
/// (transport, key store, identity) are injected; nothing is read from
/// ambient globals.
use crate::config::SessionConfig;
use crate::error::Result;
use crate::feed::LiveFeed;
use crate::identity::{self, LocalIdentity};
use crate::key_store::{SharedKeyStore, SledKeyStore};
use crate::provisioning::KeyProvisioner;
use crate::read_state::ReadStateTracker;
use crate::transport::ChatTransport;
use crate::types::{Conversation, ConversationUpdatedEvent};
use std::sync::Arc;
use tokio::sync::{broadcast, watch, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

pub struct ChatSession {
    local_user_id: String,
    transport: Arc<dyn ChatTransport>,
    provisioner: KeyProvisioner,
    feed: Arc<RwLock<LiveFeed>>,
    read_state: ReadStateTracker,
    shutdown: Arc<watch::Sender<bool>>,
}

impl ChatSession {
    /// Create a session with persistent stores under `config.data_dir`
    pub fn new(config: SessionConfig, transport: Arc<dyn ChatTransport>) -> Result<Self> {
        let identity = Arc::new(identity::load_or_create(&config.data_dir)?);
        info!("local identity {}", identity.fingerprint);

        let store: Arc<dyn SharedKeyStore> = Arc::new(SledKeyStore::new(&config.data_dir)?);
        Ok(Self::with_stores(
            config.local_user_id,
            transport,
            store,
            identity,
        ))
    }

    /// Create a session over explicitly injected stores
    pub fn with_stores(
        local_user_id: String,
        transport: Arc<dyn ChatTransport>,
        store: Arc<dyn SharedKeyStore>,
        identity: Arc<LocalIdentity>,
    ) -> Self {
        let feed = Arc::new(RwLock::new(LiveFeed::new()));
        let provisioner = KeyProvisioner::new(identity, store, local_user_id.clone());
        let read_state =
            ReadStateTracker::new(transport.clone(), feed.clone(), local_user_id.clone());
        let (shutdown, _) = watch::channel(false);

        Self {
            local_user_id,
            transport,
            provisioner,
            feed,
            read_state,
            shutdown: Arc::new(shutdown),
        }
    }

    /// Seed the feed with the user's existing conversations and make sure
    /// each has a shared key. Per-conversation provisioning failures are
    /// logged and skipped; one bad conversation never aborts the bootstrap.
    pub async fn bootstrap(&self) -> Result<()> {
        let conversations = self
            .transport
            .fetch_conversations(&self.local_user_id)
            .await?;
        info!("fetched {} conversations", conversations.len());

        let mut feed = self.feed.write().await;
        for conversation in conversations {
            if let Err(e) = self.provisioner.provision(&conversation) {
                warn!(
                    "key provisioning failed for conversation {}: {}",
                    conversation.id, e
                );
            }
            feed.upsert(conversation);
        }
        Ok(())
    }

    /// Start applying subscription events. The loop runs until `stop` is
    /// called or the transport closes its streams; the event being applied
    /// when the shutdown lands is finished, not aborted.
    pub fn start(&self) -> JoinHandle<()> {
        let session = self.clone();
        let mut created_rx = self.transport.conversation_created();
        let mut updated_rx = self.transport.conversation_updated();
        let mut shutdown_rx = self.shutdown.subscribe();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown_rx.changed() => {
                        info!("subscription loop stopping");
                        break;
                    }
                    created = created_rx.recv() => match created {
                        Ok(conversation) => session.handle_created(conversation).await,
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            warn!("created stream lagged {} events", n);
                        }
                        Err(broadcast::error::RecvError::Closed) => {
                            debug!("created stream closed");
                            break;
                        }
                    },
                    updated = updated_rx.recv() => match updated {
                        Ok(event) => session.handle_updated(event).await,
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            warn!("updated stream lagged {} events", n);
                        }
                        Err(broadcast::error::RecvError::Closed) => {
                            debug!("updated stream closed");
                            break;
                        }
                    },
                }
            }
        })
    }

    /// Unsubscribe: the loop exits at the next event boundary. An event
    /// already being applied completes rather than being aborted.
    pub fn stop(&self) {
        let _ = self.shutdown.send(true);
    }

    /// Rendering intent: the user opened a conversation
    pub async fn open_conversation(&self, conversation_id: &str) {
        let has_seen = {
            let feed = self.feed.read().await;
            feed.has_seen(conversation_id, &self.local_user_id)
        };
        self.read_state.open(conversation_id, has_seen).await;
    }

    /// Ordered feed snapshot for the rendering collaborator
    pub async fn feed(&self) -> Vec<Conversation> {
        self.feed.read().await.snapshot()
    }

    pub async fn selected_conversation(&self) -> Option<String> {
        self.read_state.selected().await
    }

    async fn handle_created(&self, conversation: Conversation) {
        // Provision before the conversation becomes visible in the feed.
        // A failed provisioning still renders the conversation; it just
        // stays unencryptable until a key record exists.
        if let Err(e) = self.provisioner.provision(&conversation) {
            warn!(
                "key provisioning failed for conversation {}: {}",
                conversation.id, e
            );
        }

        let mut feed = self.feed.write().await;
        feed.upsert(conversation);
    }

    async fn handle_updated(&self, event: ConversationUpdatedEvent) {
        // The push carries the authoritative conversation state; apply it
        // to the feed before re-evaluating the read flag.
        {
            let mut feed = self.feed.write().await;
            feed.upsert(event.conversation.clone());
        }
        self.read_state.apply_update(&event).await;
    }
}

impl Clone for ChatSession {
    fn clone(&self) -> Self {
        Self {
            local_user_id: self.local_user_id.clone(),
            transport: self.transport.clone(),
            provisioner: self.provisioner.clone(),
            feed: self.feed.clone(),
            read_state: self.read_state.clone(),
            shutdown: self.shutdown.clone(),
        }
    }
}
