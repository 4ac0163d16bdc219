//! Local development wallet.
//!
//! Answers the handful of JSON-RPC methods the messaging layer needs without
//! any key material. Signatures are deterministic placeholders.

use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use uuid::Uuid;
use walletchat_core::error::Result;
use walletchat_core::identity::Address;
use walletchat_core::wallet::{WalletError, WalletProvider};

const UNAUTHORIZED_CODE: i64 = 4100;
const UNSUPPORTED_METHOD_CODE: i64 = 4200;
const INVALID_PARAMS_CODE: i64 = -32602;

pub struct DevWallet {
    account: Address,
    chain_id: u64,
    rejecting: AtomicBool,
    signature_requests: AtomicUsize,
}

impl DevWallet {
    pub fn new(account: Address) -> Self {
        Self {
            account,
            chain_id: 1,
            rejecting: AtomicBool::new(false),
            signature_requests: AtomicUsize::new(0),
        }
    }

    /// Creates a wallet for `account`, which must be a valid address.
    pub fn from_address(account: &str) -> Result<Self> {
        Ok(Self::new(Address::parse(account)?))
    }

    /// A wallet with a fresh random account.
    pub fn random() -> Self {
        let mut bytes = [0u8; 20];
        bytes[..16].copy_from_slice(Uuid::new_v4().as_bytes());
        bytes[16..].copy_from_slice(&Uuid::new_v4().as_bytes()[..4]);
        Self::new(Address::from_bytes(bytes))
    }

    pub fn with_chain_id(mut self, chain_id: u64) -> Self {
        self.chain_id = chain_id;
        self
    }

    pub fn account(&self) -> &Address {
        &self.account
    }

    /// While set, every signature request is rejected as if by the user.
    pub fn set_rejecting(&self, rejecting: bool) {
        self.rejecting.store(rejecting, Ordering::SeqCst);
    }

    /// Number of signature requests received, including rejected ones.
    pub fn signature_count(&self) -> usize {
        self.signature_requests.load(Ordering::SeqCst)
    }

    fn personal_sign(&self, params: &[Value]) -> std::result::Result<Value, WalletError> {
        self.signature_requests.fetch_add(1, Ordering::SeqCst);
        if self.rejecting.load(Ordering::SeqCst) {
            tracing::info!("[DevWallet] signature request rejected");
            return Err(WalletError::user_rejected());
        }

        let message = params
            .first()
            .and_then(Value::as_str)
            .ok_or_else(|| WalletError::new(INVALID_PARAMS_CODE, "missing message"))?;
        if let Some(signer) = params.get(1).and_then(Value::as_str)
            && Address::parse(signer).ok().as_ref() != Some(&self.account)
        {
            return Err(WalletError::new(
                UNAUTHORIZED_CODE,
                format!("account {} is not managed by this wallet", signer),
            ));
        }

        let mut hasher = DefaultHasher::new();
        self.account.hash(&mut hasher);
        message.hash(&mut hasher);
        tracing::debug!("[DevWallet] signed {} bytes for {}", message.len(), self.account);
        Ok(json!(format!("0x{:016x}", hasher.finish())))
    }
}

#[async_trait]
impl WalletProvider for DevWallet {
    async fn request(&self, method: &str, params: Vec<Value>) -> std::result::Result<Value, WalletError> {
        match method {
            "eth_accounts" | "eth_requestAccounts" => Ok(json!([self.account.as_str()])),
            "eth_chainId" => Ok(json!(format!("0x{:x}", self.chain_id))),
            "personal_sign" => self.personal_sign(&params),
            other => Err(WalletError::new(
                UNSUPPORTED_METHOD_CODE,
                format!("unsupported method {}", other),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use walletchat_core::protocol::ProtocolSigner;
    use walletchat_core::wallet::SignerAdapter;

    const ACCOUNT: &str = "0xAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA";

    #[tokio::test]
    async fn test_signer_adapter_over_dev_wallet() {
        let wallet = Arc::new(DevWallet::from_address(ACCOUNT).unwrap().with_chain_id(11155111));
        let signer = SignerAdapter::new(wallet.clone());

        assert_eq!(signer.account().await.unwrap(), *wallet.account());
        assert_eq!(signer.chain_id().await.unwrap(), 11155111);

        let first = signer.sign_message("hello").await.unwrap();
        let second = signer.sign_message("hello").await.unwrap();
        assert_eq!(first, second);
        assert!(first.starts_with("0x"));
        assert_eq!(wallet.signature_count(), 2);
    }

    #[tokio::test]
    async fn test_rejecting_wallet_reports_user_rejection() {
        let wallet = DevWallet::from_address(ACCOUNT).unwrap();
        wallet.set_rejecting(true);
        let err = wallet
            .request("personal_sign", vec![json!("hello"), json!(ACCOUNT)])
            .await
            .unwrap_err();
        assert!(err.is_user_rejection());
        assert_eq!(wallet.signature_count(), 1);
    }

    #[tokio::test]
    async fn test_foreign_account_and_unknown_method() {
        let wallet = DevWallet::from_address(ACCOUNT).unwrap();
        let err = wallet
            .request(
                "personal_sign",
                vec![json!("hello"), json!("0xbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb")],
            )
            .await
            .unwrap_err();
        assert_eq!(err.code, UNAUTHORIZED_CODE);
        assert!(!err.is_user_rejection());

        let err = wallet.request("eth_sendTransaction", Vec::new()).await.unwrap_err();
        assert_eq!(err.code, UNSUPPORTED_METHOD_CODE);
    }

    #[test]
    fn test_random_accounts_differ() {
        assert_ne!(DevWallet::random().account(), DevWallet::random().account());
    }
}
