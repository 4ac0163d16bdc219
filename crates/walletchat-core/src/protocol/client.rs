use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use super::{ChatMessage, ProtocolError};
use crate::identity::Address;
use crate::wallet::WalletError;

/// Messaging network a client connects to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Production,
    Dev,
    Local,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Production => "production",
            Self::Dev => "dev",
            Self::Local => "local",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "production" => Ok(Self::Production),
            "dev" => Ok(Self::Dev),
            "local" => Ok(Self::Local),
            other => Err(format!("unknown environment '{other}'")),
        }
    }
}

/// Options passed to [`ProtocolClientFactory::create`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientOptions {
    pub environment: Environment,
}

/// The signing capability a protocol client is constructed from.
#[async_trait]
pub trait ProtocolSigner: Send + Sync {
    /// The currently selected wallet account.
    async fn account(&self) -> Result<Address, WalletError>;

    /// The currently selected chain id.
    async fn chain_id(&self) -> Result<u64, WalletError>;

    /// Forwards any other request, including signature requests.
    async fn request(&self, method: &str, params: Vec<Value>) -> Result<Value, WalletError>;

    /// Asks the wallet to sign `message` with the current account.
    async fn sign_message(&self, message: &str) -> Result<String, WalletError>;
}

/// A live subscription to new messages. Dropping it ends the subscription.
pub type MessageStream = BoxStream<'static, Result<ChatMessage, ProtocolError>>;

/// Builds protocol clients. Construction usually prompts the wallet for a
/// signature.
#[async_trait]
pub trait ProtocolClientFactory: Send + Sync {
    async fn create(
        &self,
        signer: Arc<dyn ProtocolSigner>,
        options: ClientOptions,
    ) -> Result<Arc<dyn ProtocolClient>, ProtocolError>;
}

/// A connected protocol identity.
#[async_trait]
pub trait ProtocolClient: Send + Sync {
    /// The identity this client was constructed for.
    fn address(&self) -> &Address;

    /// Whether `address` can receive protocol messages at all.
    async fn can_message(&self, address: &Address) -> Result<bool, ProtocolError>;

    /// Conversations known to the network for this identity.
    async fn list_conversations(&self) -> Result<Vec<Arc<dyn Conversation>>, ProtocolError>;

    /// Opens (or creates) the conversation with `peer`.
    async fn open_conversation(&self, peer: &Address) -> Result<Arc<dyn Conversation>, ProtocolError>;
}

/// A bidirectional channel with one peer.
#[async_trait]
pub trait Conversation: Send + Sync {
    /// Stable topic identifier.
    fn topic(&self) -> &str;

    fn peer_address(&self) -> &Address;

    fn created_at(&self) -> DateTime<Utc>;

    /// Full message history. Order is not guaranteed.
    async fn history(&self) -> Result<Vec<ChatMessage>, ProtocolError>;

    /// Opens a live subscription of newly arriving messages.
    async fn subscribe(&self) -> Result<MessageStream, ProtocolError>;

    async fn send(&self, text: &str) -> Result<(), ProtocolError>;
}

impl fmt::Debug for dyn Conversation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Conversation")
            .field("topic", &self.topic())
            .field("peer_address", self.peer_address())
            .finish()
    }
}

impl fmt::Debug for dyn ProtocolClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProtocolClient")
            .field("address", self.address())
            .finish()
    }
}
