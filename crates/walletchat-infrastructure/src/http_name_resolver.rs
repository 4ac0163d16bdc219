//! HTTP client for a name-resolution service.
//!
//! The service answers `GET {endpoint}/{name-or-address}` with
//! `{ "address": "0x...", "name": "alice.eth" }`. Either field may be null.

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use std::time::Duration;
use walletchat_core::config::ResolverConfig;
use walletchat_core::error::{ChatError, Result};
use walletchat_core::identity::{Address, NameResolver};

#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    address: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

pub struct HttpNameResolver {
    client: Client,
    endpoint: Url,
    timeout: Duration,
}

impl HttpNameResolver {
    /// # Errors
    ///
    /// Returns [`ChatError::Config`] when `endpoint` is not a URL that can
    /// take path segments.
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| ChatError::Config(format!("invalid resolver endpoint '{}': {}", endpoint, e)))?;
        if endpoint.cannot_be_a_base() {
            return Err(ChatError::Config(format!(
                "resolver endpoint '{}' cannot take a path",
                endpoint
            )));
        }
        Ok(Self {
            client: Client::new(),
            endpoint,
            timeout,
        })
    }

    pub fn from_config(config: &ResolverConfig) -> Result<Self> {
        Self::new(&config.endpoint, config.timeout())
    }

    /// `{endpoint}/{key}` with `key` encoded as a single path segment.
    fn lookup_url(&self, key: &str) -> Url {
        let mut url = self.endpoint.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(key);
        }
        url
    }

    /// Fetches the record for `key`; `None` when the service has none.
    async fn lookup(&self, key: &str) -> Result<Option<LookupResponse>> {
        let url = self.lookup_url(key);
        tracing::debug!("[HttpNameResolver] GET {}", url);

        let response = self
            .client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| ChatError::Transient(format!("Name lookup request failed: {}", e)))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ChatError::Transient(format!(
                "Name lookup failed ({}): {}",
                status, error_text
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| ChatError::Transient(format!("Failed to read lookup response: {}", e)))?;
        parse_response(&body).map(Some)
    }
}

fn parse_response(body: &str) -> Result<LookupResponse> {
    Ok(serde_json::from_str(body)?)
}

/// Extracts a forward-lookup address; malformed addresses are errors.
fn forward_address(response: &LookupResponse) -> Result<Option<Address>> {
    match response.address.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(address) => Address::parse(address).map(Some),
    }
}

fn reverse_name(response: &LookupResponse) -> Option<String> {
    response
        .name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
}

#[async_trait]
impl NameResolver for HttpNameResolver {
    async fn forward(&self, name: &str) -> Result<Option<Address>> {
        match self.lookup(name).await? {
            Some(response) => forward_address(&response),
            None => Ok(None),
        }
    }

    async fn reverse(&self, address: &Address) -> Result<Option<String>> {
        Ok(self
            .lookup(address.as_str())
            .await?
            .as_ref()
            .and_then(reverse_name))
    }
}
