//! Error types for walletchat.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::protocol::ProtocolError;
use crate::wallet::WalletError;

/// Coarse classification of a [`ChatError`].
///
/// Views use this to decide how an error is presented: cancellations are
/// never shown, transient failures expire, everything else stays visible
/// until the user acts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    UserCancelled,
    UnreachablePeer,
    Transient,
    Construction,
    Resolution,
    Other,
}

/// A shared error type for the whole walletchat workspace.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ChatError {
    /// A signature or connection request was dismissed by the user.
    #[error("Request cancelled by user: {0}")]
    UserCancelled(String),

    /// The reachability pre-check failed for the peer.
    #[error("{address} is not reachable on the messaging network")]
    UnreachablePeer { address: String },

    /// Network or protocol failure that does not invalidate the session.
    #[error("Network error: {0}")]
    Transient(String),

    /// Protocol client construction failed for a reason other than cancellation.
    #[error("Failed to initialize messaging client: {0}")]
    Construction(String),

    /// A name could not be resolved to an address.
    #[error("Could not resolve '{input}': {message}")]
    Resolution { input: String, message: String },

    /// Input is not a canonical 20-byte hex address.
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// No wallet identity is active.
    #[error("No wallet connected")]
    NoIdentity,

    /// The operation requires a Ready session.
    #[error("Messaging session is not ready: {0}")]
    NotReady(String),

    /// The operation requires an active conversation.
    #[error("No active conversation")]
    NoConversation,

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error (file system operations)
    #[error("IO error: {message}")]
    Io { message: String },

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization { format: String, message: String },

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ChatError {
    // ============================================================================
    // Constructor helpers
    // ============================================================================

    pub fn unreachable_peer(address: impl Into<String>) -> Self {
        Self::UnreachablePeer {
            address: address.into(),
        }
    }

    pub fn resolution(input: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Resolution {
            input: input.into(),
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Classifies an error raised while constructing a protocol client.
    ///
    /// User rejections become [`ChatError::UserCancelled`], everything else
    /// is a [`ChatError::Construction`] failure.
    pub fn from_construction(err: ProtocolError) -> Self {
        if err.is_user_rejection() {
            return Self::UserCancelled(err.to_string());
        }
        Self::Construction(err.to_string())
    }

    /// Classifies an error raised by a conversation operation (history,
    /// subscribe, send, reachability). These never invalidate the session.
    pub fn transient(err: ProtocolError) -> Self {
        if err.is_user_rejection() {
            return Self::UserCancelled(err.to_string());
        }
        Self::Transient(err.to_string())
    }

    // ============================================================================
    // Type checking methods
    // ============================================================================

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UserCancelled(_) => ErrorKind::UserCancelled,
            Self::UnreachablePeer { .. } => ErrorKind::UnreachablePeer,
            Self::Transient(_) => ErrorKind::Transient,
            Self::Construction(_) => ErrorKind::Construction,
            Self::Resolution { .. } | Self::InvalidAddress(_) => ErrorKind::Resolution,
            _ => ErrorKind::Other,
        }
    }

    pub fn is_user_cancelled(&self) -> bool {
        matches!(self, Self::UserCancelled(_))
    }

    pub fn is_unreachable_peer(&self) -> bool {
        matches!(self, Self::UnreachablePeer { .. })
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<WalletError> for ChatError {
    fn from(err: WalletError) -> Self {
        if err.is_user_rejection() {
            Self::UserCancelled(err.message)
        } else {
            Self::Transient(err.to_string())
        }
    }
}

impl From<std::io::Error> for ChatError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<serde_json::Error> for ChatError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for ChatError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::ser::Error> for ChatError {
    fn from(err: toml::ser::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

/// A type alias for `Result<T, ChatError>`.
pub type Result<T> = std::result::Result<T, ChatError>;
