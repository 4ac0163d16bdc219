use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::Arc;

use super::{WalletError, WalletProvider};
use crate::identity::Address;
use crate::protocol::ProtocolSigner;

/// JSON-RPC error code for a malformed wallet response.
const INVALID_RESPONSE_CODE: i64 = -32603;

/// Adapts a [`WalletProvider`] into the [`ProtocolSigner`] a protocol client
/// is built from.
///
/// Every call is forwarded to the wallet as-is. Wallet errors are returned
/// unchanged so the caller can classify them.
pub struct SignerAdapter {
    wallet: Arc<dyn WalletProvider>,
}

impl SignerAdapter {
    pub fn new(wallet: Arc<dyn WalletProvider>) -> Self {
        Self { wallet }
    }
}

#[async_trait]
impl ProtocolSigner for SignerAdapter {
    async fn account(&self) -> Result<Address, WalletError> {
        let response = self.wallet.request("eth_accounts", Vec::new()).await?;
        let first = response
            .as_array()
            .and_then(|accounts| accounts.first())
            .and_then(Value::as_str)
            .ok_or_else(|| WalletError::new(INVALID_RESPONSE_CODE, "wallet returned no accounts"))?;
        Address::parse(first).map_err(|e| WalletError::new(INVALID_RESPONSE_CODE, e.to_string()))
    }

    async fn chain_id(&self) -> Result<u64, WalletError> {
        let response = self.wallet.request("eth_chainId", Vec::new()).await?;
        parse_chain_id(&response)
            .ok_or_else(|| WalletError::new(INVALID_RESPONSE_CODE, format!("invalid chain id: {response}")))
    }

    async fn request(&self, method: &str, params: Vec<Value>) -> Result<Value, WalletError> {
        self.wallet.request(method, params).await
    }

    async fn sign_message(&self, message: &str) -> Result<String, WalletError> {
        let account = self.account().await?;
        let response = self
            .wallet
            .request("personal_sign", vec![json!(message), json!(account.as_str())])
            .await?;
        response
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| WalletError::new(INVALID_RESPONSE_CODE, "signature is not a string"))
    }
}

/// Accepts `"0x1"`, `"1"` or `1`.
fn parse_chain_id(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            Some(hex) => u64::from_str_radix(hex, 16).ok(),
            None => s.parse().ok(),
        },
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct ScriptedWallet {
        calls: Mutex<Vec<String>>,
        reject_sign: bool,
    }

    impl ScriptedWallet {
        fn new(reject_sign: bool) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                reject_sign,
            }
        }
    }

    #[async_trait]
    impl WalletProvider for ScriptedWallet {
        async fn request(&self, method: &str, params: Vec<Value>) -> Result<Value, WalletError> {
            self.calls.lock().unwrap().push(method.to_string());
            match method {
                "eth_accounts" => Ok(json!(["0xABCDEF0123456789ABCDEF0123456789ABCDEF01"])),
                "eth_chainId" => Ok(json!("0x1")),
                "personal_sign" if self.reject_sign => Err(WalletError::user_rejected()),
                "personal_sign" => Ok(json!(format!("signed:{}", params[0].as_str().unwrap()))),
                _ => Ok(json!({ "method": method, "params": params })),
            }
        }
    }

    #[tokio::test]
    async fn test_account_and_chain_id() {
        let signer = SignerAdapter::new(Arc::new(ScriptedWallet::new(false)));
        let account = signer.account().await.unwrap();
        assert_eq!(account.as_str(), "0xabcdef0123456789abcdef0123456789abcdef01");
        assert_eq!(signer.chain_id().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_every_call_reaches_wallet() {
        let wallet = Arc::new(ScriptedWallet::new(false));
        let signer = SignerAdapter::new(wallet.clone());
        signer.account().await.unwrap();
        signer.account().await.unwrap();
        signer.request("eth_signTypedData_v4", vec![json!("x")]).await.unwrap();
        assert_eq!(
            *wallet.calls.lock().unwrap(),
            vec!["eth_accounts", "eth_accounts", "eth_signTypedData_v4"]
        );
    }

    #[tokio::test]
    async fn test_sign_rejection_propagates_unchanged() {
        let signer = SignerAdapter::new(Arc::new(ScriptedWallet::new(true)));
        let err = signer.sign_message("hello").await.unwrap_err();
        assert_eq!(err, WalletError::user_rejected());
    }

    #[test]
    fn test_parse_chain_id_forms() {
        assert_eq!(parse_chain_id(&json!("0x2105")), Some(8453));
        assert_eq!(parse_chain_id(&json!("10")), Some(10));
        assert_eq!(parse_chain_id(&json!(137)), Some(137));
        assert_eq!(parse_chain_id(&json!(null)), None);
    }
}
