use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::address::{Address, display_label};
use crate::error::{ChatError, Result};

/// External name-resolution service (forward and reverse lookups).
#[async_trait]
pub trait NameResolver: Send + Sync {
    /// Resolves a human-readable name to an address.
    ///
    /// - `Ok(Some(address))`: the name resolves
    /// - `Ok(None)`: the name has no address record
    async fn forward(&self, name: &str) -> Result<Option<Address>>;

    /// Looks up the primary name of an address.
    async fn reverse(&self, address: &Address) -> Result<Option<String>>;
}

/// What a conversation target input looks like before any lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Empty,
    Address(Address),
    Name(String),
}

impl Target {
    pub fn parse(input: &str) -> Self {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Self::Empty;
        }
        match Address::parse(trimmed) {
            Ok(address) => Self::Address(address),
            Err(_) => Self::Name(trimmed.to_string()),
        }
    }
}

/// A resolved `(address, display name)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedIdentity {
    pub address: Address,
    pub display_name: Option<String>,
}

impl ResolvedIdentity {
    pub fn label(&self) -> String {
        display_label(&self.address, self.display_name.as_deref())
    }
}

/// Normalizes user input (address or name) into a [`ResolvedIdentity`].
pub struct IdentityResolver {
    resolver: Arc<dyn NameResolver>,
    name_suffixes: Vec<String>,
}

impl IdentityResolver {
    /// Creates a resolver accepting names that end with one of `name_suffixes`.
    ///
    /// An empty suffix list accepts every name.
    pub fn new(resolver: Arc<dyn NameResolver>, name_suffixes: Vec<String>) -> Self {
        Self {
            resolver,
            name_suffixes,
        }
    }

    /// Resolves `input` into an address and, where available, a name.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::Resolution`] when the input is empty, the name has
    /// an unsupported suffix, the name has no address, or the forward lookup
    /// fails. Reverse lookup failures are never errors.
    pub async fn resolve(&self, input: &str) -> Result<ResolvedIdentity> {
        let mut resolved = self.resolve_address(input).await?;
        if resolved.display_name.is_none() {
            resolved.display_name = self.display_name(&resolved.address).await;
        }
        Ok(resolved)
    }

    /// Resolves `input` to an address without the reverse lookup.
    ///
    /// Address input returns at once with no name; name input carries the
    /// name it was resolved from. Errors as for [`IdentityResolver::resolve`].
    pub async fn resolve_address(&self, input: &str) -> Result<ResolvedIdentity> {
        match Target::parse(input) {
            Target::Empty => Err(ChatError::resolution(input, "empty input")),
            Target::Address(address) => Ok(ResolvedIdentity {
                address,
                display_name: None,
            }),
            Target::Name(name) => {
                if !self.accepts_name(&name) {
                    return Err(ChatError::resolution(&name, "unsupported name"));
                }
                match self.resolver.forward(&name).await {
                    Ok(Some(address)) => {
                        tracing::debug!("[IdentityResolver] {} -> {}", name, address);
                        Ok(ResolvedIdentity {
                            address,
                            display_name: Some(name),
                        })
                    }
                    Ok(None) => Err(ChatError::resolution(&name, "no address record")),
                    Err(e) => {
                        tracing::warn!("[IdentityResolver] forward lookup failed for {}: {}", name, e);
                        Err(ChatError::resolution(&name, e.to_string()))
                    }
                }
            }
        }
    }

    /// Best-effort reverse lookup. Failures are logged and yield `None`.
    pub async fn display_name(&self, address: &Address) -> Option<String> {
        match self.resolver.reverse(address).await {
            Ok(name) => name,
            Err(e) => {
                tracing::debug!("[IdentityResolver] reverse lookup failed for {}: {}", address, e);
                None
            }
        }
    }

    fn accepts_name(&self, name: &str) -> bool {
        if self.name_suffixes.is_empty() {
            return true;
        }
        let lower = name.to_ascii_lowercase();
        self.name_suffixes
            .iter()
            .any(|suffix| lower.ends_with(&suffix.to_ascii_lowercase()) && lower.len() > suffix.len())
    }
}
