//! Messaging protocol abstraction.
//!
//! The protocol's cryptography, transport and storage live behind these
//! traits. walletchat only orchestrates sessions and streams on top of them.
//!
//! # Module Structure
//!
//! - `message`: delivered message model (`ChatMessage`)
//! - `client`: signer, client factory, client and conversation traits

mod client;
mod message;

pub use client::{
    ClientOptions, Conversation, Environment, MessageStream, ProtocolClient,
    ProtocolClientFactory, ProtocolSigner,
};
pub use message::ChatMessage;

use thiserror::Error;

use crate::wallet::{WalletError, is_rejection_message};

/// An error raised by a protocol collaborator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// The wallet refused or failed a request made on the protocol's behalf.
    #[error("{0}")]
    Wallet(#[from] WalletError),

    /// Transport-level failure.
    #[error("network: {0}")]
    Network(String),

    /// The network refused the operation.
    #[error("rejected: {0}")]
    Rejected(String),

    #[error("{0}")]
    Other(String),
}

impl ProtocolError {
    /// Returns true when this error originates from a user-dismissed request.
    pub fn is_user_rejection(&self) -> bool {
        match self {
            Self::Wallet(e) => e.is_user_rejection(),
            Self::Network(_) => false,
            Self::Rejected(message) | Self::Other(message) => is_rejection_message(message),
        }
    }
}
