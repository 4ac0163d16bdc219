use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::protocol::{ClientOptions, Environment};

pub const DEFAULT_RESOLVER_ENDPOINT: &str = "https://api.ensideas.com/ens/resolve";
pub const DEFAULT_NOTICE_TTL_SECS: u64 = 5;

/// Root configuration (`config.toml`).
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatConfig {
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub resolver: ResolverConfig,
    #[serde(default)]
    pub chat: ConversationConfig,
}

impl ChatConfig {
    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            environment: self.network.environment,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct NetworkConfig {
    #[serde(default)]
    pub environment: Environment,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ResolverConfig {
    #[serde(default = "default_resolver_endpoint")]
    pub endpoint: String,
    /// Names must end with one of these to be looked up. Empty accepts all.
    #[serde(default = "default_name_suffixes")]
    pub name_suffixes: Vec<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            endpoint: default_resolver_endpoint(),
            name_suffixes: default_name_suffixes(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl ResolverConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ConversationConfig {
    /// How long a failed-send notice stays visible.
    #[serde(default = "default_notice_ttl_secs")]
    pub notice_ttl_secs: u64,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            notice_ttl_secs: default_notice_ttl_secs(),
        }
    }
}

impl ConversationConfig {
    pub fn notice_ttl(&self) -> Duration {
        Duration::from_secs(self.notice_ttl_secs)
    }
}

fn default_resolver_endpoint() -> String {
    DEFAULT_RESOLVER_ENDPOINT.to_string()
}

fn default_name_suffixes() -> Vec<String> {
    vec![".eth".to_string()]
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_notice_ttl_secs() -> u64 {
    DEFAULT_NOTICE_TTL_SECS
}
