//! In-process messaging network.
//!
//! Implements the protocol traits entirely in memory: identities register by
//! signing a registration message, each address pair shares one topic, and
//! live delivery goes through a `tokio::sync::broadcast` channel per topic.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use uuid::Uuid;
use walletchat_core::identity::Address;
use walletchat_core::protocol::{
    ChatMessage, ClientOptions, Conversation, MessageStream, ProtocolClient,
    ProtocolClientFactory, ProtocolError, ProtocolSigner,
};

const CHANNEL_CAPACITY: usize = 256;

struct Topic {
    name: String,
    members: [Address; 2],
    created_at: DateTime<Utc>,
    history: Mutex<Vec<ChatMessage>>,
    live: broadcast::Sender<ChatMessage>,
}

impl Topic {
    fn peer_of(&self, me: &Address) -> Address {
        if &self.members[0] == me {
            self.members[1].clone()
        } else {
            self.members[0].clone()
        }
    }
}

#[derive(Default)]
struct NetworkState {
    registered: RwLock<HashSet<Address>>,
    topics: RwLock<HashMap<String, Arc<Topic>>>,
    offline: AtomicBool,
}

impl NetworkState {
    fn check_online(&self) -> Result<(), ProtocolError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(ProtocolError::Network("network offline".to_string()));
        }
        Ok(())
    }

    fn topic(&self, a: &Address, b: &Address) -> Arc<Topic> {
        let name = MemoryNetwork::topic_for(a, b);
        if let Some(topic) = self
            .topics
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&name)
        {
            return topic.clone();
        }

        let mut topics = self.topics.write().unwrap_or_else(|e| e.into_inner());
        topics
            .entry(name.clone())
            .or_insert_with(|| {
                tracing::debug!("[MemoryNetwork] created topic {}", name);
                let (live, _) = broadcast::channel(CHANNEL_CAPACITY);
                Arc::new(Topic {
                    name,
                    members: [a.clone(), b.clone()],
                    created_at: Utc::now(),
                    history: Mutex::new(Vec::new()),
                    live,
                })
            })
            .clone()
    }
}

/// Shared in-memory network. Clones see the same state.
#[derive(Clone, Default)]
pub struct MemoryNetwork {
    state: Arc<NetworkState>,
}

impl MemoryNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deterministic topic name for a pair of addresses, in either order.
    pub fn topic_for(a: &Address, b: &Address) -> String {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        format!("dm:{}:{}", low, high)
    }

    /// Marks `address` as reachable without constructing a client for it.
    pub fn register(&self, address: Address) {
        let mut registered = self.state.registered.write().unwrap_or_else(|e| e.into_inner());
        if registered.insert(address.clone()) {
            tracing::debug!("[MemoryNetwork] registered {}", address);
        }
    }

    pub fn is_registered(&self, address: &Address) -> bool {
        self.state
            .registered
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contains(address)
    }

    /// While offline every network operation fails with a network error.
    pub fn set_offline(&self, offline: bool) {
        self.state.offline.store(offline, Ordering::SeqCst);
    }

    pub fn topic_count(&self) -> usize {
        self.state.topics.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Number of open live subscriptions on the topic between `a` and `b`.
    pub fn subscriber_count(&self, a: &Address, b: &Address) -> usize {
        let name = Self::topic_for(a, b);
        self.state
            .topics
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&name)
            .map(|topic| topic.live.receiver_count())
            .unwrap_or(0)
    }
}

fn registration_text(address: &Address, options: &ClientOptions) -> String {
    format!(
        "Register {} for walletchat messaging on {}",
        address, options.environment
    )
}

#[async_trait]
impl ProtocolClientFactory for MemoryNetwork {
    async fn create(
        &self,
        signer: Arc<dyn ProtocolSigner>,
        options: ClientOptions,
    ) -> Result<Arc<dyn ProtocolClient>, ProtocolError> {
        self.state.check_online()?;
        let address = signer.account().await?;
        let signature = signer
            .sign_message(&registration_text(&address, &options))
            .await?;
        if signature.is_empty() {
            return Err(ProtocolError::Rejected("empty registration signature".to_string()));
        }

        self.register(address.clone());
        tracing::info!(
            "[MemoryNetwork] client ready for {} ({})",
            address,
            options.environment
        );
        Ok(Arc::new(MemoryClient {
            state: self.state.clone(),
            address,
        }))
    }
}

pub struct MemoryClient {
    state: Arc<NetworkState>,
    address: Address,
}

impl MemoryClient {
    fn conversation(&self, topic: Arc<Topic>) -> Arc<dyn Conversation> {
        Arc::new(MemoryConversation {
            state: self.state.clone(),
            peer: topic.peer_of(&self.address),
            me: self.address.clone(),
            topic,
        })
    }
}

#[async_trait]
impl ProtocolClient for MemoryClient {
    fn address(&self) -> &Address {
        &self.address
    }

    async fn can_message(&self, address: &Address) -> Result<bool, ProtocolError> {
        self.state.check_online()?;
        let registered = self.state.registered.read().unwrap_or_else(|e| e.into_inner());
        Ok(registered.contains(address))
    }

    async fn list_conversations(&self) -> Result<Vec<Arc<dyn Conversation>>, ProtocolError> {
        self.state.check_online()?;
        let mut topics: Vec<Arc<Topic>> = self
            .state
            .topics
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .filter(|topic| topic.members.contains(&self.address))
            .cloned()
            .collect();
        topics.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.name.cmp(&b.name)));
        Ok(topics.into_iter().map(|topic| self.conversation(topic)).collect())
    }

    async fn open_conversation(&self, peer: &Address) -> Result<Arc<dyn Conversation>, ProtocolError> {
        self.state.check_online()?;
        Ok(self.conversation(self.state.topic(&self.address, peer)))
    }
}

pub struct MemoryConversation {
    state: Arc<NetworkState>,
    topic: Arc<Topic>,
    me: Address,
    peer: Address,
}

#[async_trait]
impl Conversation for MemoryConversation {
    fn topic(&self) -> &str {
        &self.topic.name
    }

    fn peer_address(&self) -> &Address {
        &self.peer
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.topic.created_at
    }

    async fn history(&self) -> Result<Vec<ChatMessage>, ProtocolError> {
        self.state.check_online()?;
        Ok(self
            .topic
            .history
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone())
    }

    async fn subscribe(&self) -> Result<MessageStream, ProtocolError> {
        self.state.check_online()?;
        let receiver = self.topic.live.subscribe();
        let topic = self.topic.name.clone();
        let stream = futures::stream::unfold((receiver, topic), |(mut receiver, topic)| async move {
            loop {
                match receiver.recv().await {
                    Ok(message) => return Some((Ok(message), (receiver, topic))),
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!("[MemoryNetwork] subscriber on {} lagged by {}", topic, skipped);
                    }
                    Err(RecvError::Closed) => return None,
                }
            }
        });
        Ok(Box::pin(stream))
    }

    async fn send(&self, text: &str) -> Result<(), ProtocolError> {
        self.state.check_online()?;
        let message = ChatMessage {
            id: Uuid::new_v4().to_string(),
            topic: self.topic.name.clone(),
            sender: self.me.clone(),
            content: text.to_string(),
            sent_at: Utc::now(),
        };

        let mut history = self.topic.history.lock().unwrap_or_else(|e| e.into_inner());
        history.push(message.clone());
        // No receivers is fine; the message is still in history.
        let _ = self.topic.live.send(message);
        Ok(())
    }
}
