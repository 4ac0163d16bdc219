//! Configuration service implementation.
//!
//! This module provides a ConfigService that loads the root configuration
//! from the configuration file (~/.config/walletchat/config.toml).

use crate::paths::ChatPaths;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use walletchat_core::config::ChatConfig;
use walletchat_core::error::{ChatError, Result};

/// Configuration service that loads and caches the root configuration.
///
/// This implementation reads the configuration from config.toml
/// and caches it to avoid repeated file I/O operations.
#[derive(Debug, Clone)]
pub struct ConfigService {
    /// Explicit config file; `None` means the platform default.
    path: Option<PathBuf>,
    /// Cached configuration loaded from file.
    config: Arc<RwLock<Option<ChatConfig>>>,
}

impl ConfigService {
    /// Creates a ConfigService reading the default config file.
    ///
    /// The configuration is loaded lazily on first access.
    pub fn new() -> Self {
        Self {
            path: None,
            config: Arc::new(RwLock::new(None)),
        }
    }

    /// Creates a ConfigService reading `path` instead of the default file.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            config: Arc::new(RwLock::new(None)),
        }
    }

    /// Returns the config file this service reads.
    pub fn config_path(&self) -> Result<PathBuf> {
        match &self.path {
            Some(path) => Ok(path.clone()),
            None => ChatPaths::config_file().map_err(|e| ChatError::config(e.to_string())),
        }
    }

    /// Gets the root configuration, loading from file if not cached.
    ///
    /// A missing or unreadable file yields the defaults.
    pub fn get_config(&self) -> ChatConfig {
        {
            let read_lock = self.config.read().unwrap_or_else(|e| e.into_inner());
            if let Some(ref cached) = *read_lock {
                return cached.clone();
            }
        }

        let loaded = match self.load() {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("[ConfigService] using default configuration: {}", e);
                ChatConfig::default()
            }
        };

        {
            let mut write_lock = self.config.write().unwrap_or_else(|e| e.into_inner());
            *write_lock = Some(loaded.clone());
        }

        loaded
    }

    /// Loads the configuration without touching the cache.
    ///
    /// A missing file is not an error; a malformed one is.
    pub fn load(&self) -> Result<ChatConfig> {
        let path = self.config_path()?;
        Self::load_from(&path)
    }

    /// Invalidates the cache, forcing a reload on next access.
    pub fn invalidate_cache(&self) {
        let mut write_lock = self.config.write().unwrap_or_else(|e| e.into_inner());
        *write_lock = None;
    }

    /// Writes the default configuration unless the file already exists.
    ///
    /// Returns the config file path.
    pub fn save_default(&self) -> Result<PathBuf> {
        let path = self.config_path()?;
        if path.exists() {
            tracing::debug!("[ConfigService] {} already exists", path.display());
            return Ok(path);
        }

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(&ChatConfig::default())?;
        std::fs::write(&path, content)?;
        tracing::info!("[ConfigService] wrote default configuration to {}", path.display());

        self.invalidate_cache();
        Ok(path)
    }

    fn load_from(path: &Path) -> Result<ChatConfig> {
        if !path.exists() {
            tracing::debug!("[ConfigService] {} not found, using defaults", path.display());
            return Ok(ChatConfig::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config = toml::from_str(&content)?;
        tracing::debug!("[ConfigService] loaded {}", path.display());
        Ok(config)
    }
}

impl Default for ConfigService {
    fn default() -> Self {
        Self::new()
    }
}
