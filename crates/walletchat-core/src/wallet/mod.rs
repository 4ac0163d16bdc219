//! Wallet collaborator interface and the signer adapter built on it.

mod signer;

pub use signer::SignerAdapter;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// EIP-1193 code for a request the user rejected.
pub const USER_REJECTED_CODE: i64 = 4001;

/// An error returned by the wallet's request interface.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("wallet error {code}: {message}")]
pub struct WalletError {
    pub code: i64,
    pub message: String,
}

impl WalletError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn user_rejected() -> Self {
        Self::new(USER_REJECTED_CODE, "User rejected the request.")
    }

    /// Returns true for a request the user dismissed.
    pub fn is_user_rejection(&self) -> bool {
        self.code == USER_REJECTED_CODE || is_rejection_message(&self.message)
    }
}

/// Heuristic for rejection errors that lost their code on the way up.
pub fn is_rejection_message(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    lower.contains("user rejected")
        || lower.contains("user denied")
        || lower.contains("action_rejected")
        || lower.contains("request cancelled")
}

/// The request capability a connected wallet exposes.
///
/// Every call reaches the live wallet session; implementations must not
/// cache responses.
#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Sends `method` with positional `params` to the wallet.
    async fn request(&self, method: &str, params: Vec<Value>) -> Result<Value, WalletError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_by_code() {
        assert!(WalletError::user_rejected().is_user_rejection());
        assert!(!WalletError::new(-32603, "internal").is_user_rejection());
    }

    #[test]
    fn test_rejection_by_message() {
        assert!(WalletError::new(-32000, "MetaMask: User denied message signature").is_user_rejection());
        assert!(WalletError::new(0, "ACTION_REJECTED").is_user_rejection());
    }
}
