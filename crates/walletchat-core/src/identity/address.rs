use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ChatError;

/// A canonical wallet address: lowercase `0x` followed by 40 hex digits.
///
/// Comparison is case-insensitive by construction, since every accepted
/// spelling is folded into the same canonical string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(String);

impl Address {
    /// Parses any `0x`/`0X`-prefixed, mixed-case 20-byte hex address.
    pub fn parse(value: &str) -> Result<Self, ChatError> {
        let trimmed = value.trim();
        let hex = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .ok_or_else(|| ChatError::InvalidAddress(value.to_string()))?;
        if hex.len() != 40 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(ChatError::InvalidAddress(value.to_string()));
        }
        Ok(Self(format!("0x{}", hex.to_ascii_lowercase())))
    }

    /// Builds an address from its 20 raw bytes.
    pub fn from_bytes(bytes: [u8; 20]) -> Self {
        let hex: String = bytes.iter().map(|b| format!("{:02x}", b)).collect();
        Self(format!("0x{}", hex))
    }

    /// Returns true when `value` has the shape of an address.
    pub fn is_address(value: &str) -> bool {
        Self::parse(value).is_ok()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `0x1234...abcd` for compact display.
    pub fn abbreviated(&self) -> String {
        format!("{}...{}", &self.0[..6], &self.0[self.0.len() - 4..])
    }
}

/// Prefers a resolved name and falls back to the abbreviated address.
pub fn display_label(address: &Address, name: Option<&str>) -> String {
    match name {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => address.abbreviated(),
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Address {
    type Err = ChatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Address {
    type Error = ChatError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.0
    }
}

impl AsRef<str> for Address {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIXED: &str = "0xABCDEF0123456789ABCDEF0123456789ABCDEF01";

    #[test]
    fn test_parse_folds_case() {
        let address = Address::parse(MIXED).unwrap();
        assert_eq!(address.as_str(), "0xabcdef0123456789abcdef0123456789abcdef01");
        assert_eq!(address, Address::parse(&MIXED.to_lowercase()).unwrap());
        assert_eq!(address, Address::parse(&MIXED.replacen("0x", "0X", 1)).unwrap());
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(Address::parse("alice.eth").is_err());
        assert!(Address::parse("0x1234").is_err());
        assert!(Address::parse("abcdef0123456789abcdef0123456789abcdef01").is_err());
        assert!(Address::parse("0xzzcdef0123456789abcdef0123456789abcdef01").is_err());
    }

    #[test]
    fn test_abbreviated_and_label() {
        let address = Address::parse(MIXED).unwrap();
        assert_eq!(address.abbreviated(), "0xabcd...ef01");
        assert_eq!(display_label(&address, Some("alice.eth")), "alice.eth");
        assert_eq!(display_label(&address, None), "0xabcd...ef01");
    }

    #[test]
    fn test_from_bytes_matches_parse() {
        let mut bytes = [0u8; 20];
        bytes[0] = 0xAB;
        bytes[19] = 0x01;
        let address = Address::from_bytes(bytes);
        assert_eq!(address, Address::parse("0xAB00000000000000000000000000000000000001").unwrap());
    }

    #[test]
    fn test_serde_uses_canonical_string() {
        let address = Address::parse(MIXED).unwrap();
        let json = serde_json::to_string(&address).unwrap();
        assert_eq!(json, "\"0xabcdef0123456789abcdef0123456789abcdef01\"");
        let back: Address = serde_json::from_str(&format!("\"{MIXED}\"")).unwrap();
        assert_eq!(back, address);
        assert!(serde_json::from_str::<Address>("\"bob\"").is_err());
    }
}
