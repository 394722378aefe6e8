//! Configuration for a Tether instance.
//!
//! Loaded from TOML, then overridden from the environment:
//!
//! | Variable | Field |
//! |---|---|
//! | `TETHER_GATEWAY_URL` | `content.gateway_url` |
//! | `TETHER_NAMING_URL` | `naming.endpoint` |
//! | `TETHER_REGISTRY_URL` | `registry.endpoint` |
//! | `TETHER_REGISTRY_ADDRESS` | `registry.contract_address` |
//! | `TETHER_KEYSTORE_PATH` | `keystore.path` |
//!
//! Every section has defaults, so an empty file is a valid (in-memory)
//! configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tether_naming::HttpNamingConfig;
use tether_registry::RpcRegistryConfig;
use tether_store::HttpStoreConfig;
use thiserror::Error;

/// Configuration errors. Fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("missing required setting: {0}")]
    Missing(&'static str),

    #[error("invalid setting {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Content store backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentBackend {
    Memory,
    Sqlite,
    Http,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentConfig {
    pub backend: ContentBackend,
    pub gateway_url: String,
    /// Database file for the `sqlite` backend.
    pub sqlite_path: Option<PathBuf>,
    pub timeout_secs: u64,
    pub max_attempts: u32,
    pub backoff_ms: u64,
}

impl Default for ContentConfig {
    fn default() -> Self {
        let http = HttpStoreConfig::default();
        Self {
            backend: ContentBackend::Memory,
            gateway_url: http.gateway_url,
            sqlite_path: None,
            timeout_secs: http.timeout.as_secs(),
            max_attempts: http.max_attempts,
            backoff_ms: http.backoff_base.as_millis() as u64,
        }
    }
}

impl ContentConfig {
    pub fn http_config(&self) -> HttpStoreConfig {
        HttpStoreConfig {
            gateway_url: self.gateway_url.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
            max_attempts: self.max_attempts,
            backoff_base: Duration::from_millis(self.backoff_ms),
        }
    }
}

/// Naming service backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NamingBackend {
    Memory,
    Http,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NamingConfig {
    pub backend: NamingBackend,
    pub endpoint: String,
    pub timeout_secs: u64,
    pub max_attempts: u32,
    pub backoff_ms: u64,
    /// Requests allowed per `rate_window_secs`.
    pub rate_limit: usize,
    pub rate_window_secs: u64,
    /// Simulated propagation delay for the `memory` backend.
    pub propagation_delay_ms: u64,
}

impl Default for NamingConfig {
    fn default() -> Self {
        let http = HttpNamingConfig::default();
        Self {
            backend: NamingBackend::Memory,
            endpoint: http.endpoint,
            timeout_secs: http.timeout.as_secs(),
            max_attempts: http.max_attempts,
            backoff_ms: http.backoff_base.as_millis() as u64,
            rate_limit: http.rate_limit,
            rate_window_secs: http.rate_window.as_secs(),
            propagation_delay_ms: 0,
        }
    }
}

impl NamingConfig {
    pub fn http_config(&self) -> HttpNamingConfig {
        HttpNamingConfig {
            endpoint: self.endpoint.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
            max_attempts: self.max_attempts,
            backoff_base: Duration::from_millis(self.backoff_ms),
            rate_limit: self.rate_limit,
            rate_window: Duration::from_secs(self.rate_window_secs),
        }
    }
}

/// Registry backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistryBackend {
    /// In-process chain.
    Local,
    /// HTTP chain gateway.
    Rpc,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    pub backend: RegistryBackend,
    pub endpoint: String,
    /// Required for the `rpc` backend.
    pub contract_address: Option<String>,
    pub confirmations: u64,
    pub poll_interval_ms: u64,
    pub confirmation_timeout_secs: u64,
    pub timeout_secs: u64,
    pub max_attempts: u32,
    /// Concurrent count queries when reading many identities.
    pub read_concurrency: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        let rpc = RpcRegistryConfig::default();
        Self {
            backend: RegistryBackend::Local,
            endpoint: rpc.endpoint,
            contract_address: None,
            confirmations: rpc.confirmations,
            poll_interval_ms: rpc.poll_interval.as_millis() as u64,
            confirmation_timeout_secs: rpc.confirmation_timeout.as_secs(),
            timeout_secs: rpc.timeout.as_secs(),
            max_attempts: rpc.max_attempts,
            read_concurrency: 8,
        }
    }
}

impl RegistryConfig {
    pub fn rpc_config(&self) -> Result<RpcRegistryConfig, ConfigError> {
        let contract_address = self
            .contract_address
            .clone()
            .ok_or(ConfigError::Missing("registry.contract_address"))?;
        Ok(RpcRegistryConfig {
            endpoint: self.endpoint.clone(),
            contract_address,
            timeout: Duration::from_secs(self.timeout_secs),
            confirmations: self.confirmations,
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            confirmation_timeout: Duration::from_secs(self.confirmation_timeout_secs),
            max_attempts: self.max_attempts,
            ..RpcRegistryConfig::default()
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecoveryConfig {
    /// Blobs fetched and decrypted concurrently.
    pub batch_size: usize,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self { batch_size: 10 }
    }
}

/// Local key store backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeystoreBackend {
    Memory,
    Sqlite,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KeystoreConfig {
    pub backend: KeystoreBackend,
    pub path: Option<PathBuf>,
}

impl Default for KeystoreConfig {
    fn default() -> Self {
        Self {
            backend: KeystoreBackend::Memory,
            path: None,
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TetherConfig {
    pub content: ContentConfig,
    pub naming: NamingConfig,
    pub registry: RegistryConfig,
    pub recovery: RecoveryConfig,
    pub keystore: KeystoreConfig,
}

impl TetherConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    /// Read a TOML file, apply environment overrides and validate.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config = Self::from_toml_str(&content)?;
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides from `lookup`, which maps a variable name to its value.
    pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("TETHER_GATEWAY_URL") {
            self.content.gateway_url = url;
            self.content.backend = ContentBackend::Http;
        }
        if let Some(url) = lookup("TETHER_NAMING_URL") {
            self.naming.endpoint = url;
            self.naming.backend = NamingBackend::Http;
        }
        if let Some(url) = lookup("TETHER_REGISTRY_URL") {
            self.registry.endpoint = url;
            self.registry.backend = RegistryBackend::Rpc;
        }
        if let Some(address) = lookup("TETHER_REGISTRY_ADDRESS") {
            self.registry.contract_address = Some(address);
        }
        if let Some(path) = lookup("TETHER_KEYSTORE_PATH") {
            self.keystore.path = Some(PathBuf::from(path));
            self.keystore.backend = KeystoreBackend::Sqlite;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.registry.backend == RegistryBackend::Rpc
            && self
                .registry
                .contract_address
                .as_deref()
                .map_or(true, str::is_empty)
        {
            return Err(ConfigError::Missing("registry.contract_address"));
        }
        if self.content.backend == ContentBackend::Sqlite && self.content.sqlite_path.is_none() {
            return Err(ConfigError::Missing("content.sqlite_path"));
        }
        if self.keystore.backend == KeystoreBackend::Sqlite && self.keystore.path.is_none() {
            return Err(ConfigError::Missing("keystore.path"));
        }
        if self.recovery.batch_size == 0 {
            return Err(invalid("recovery.batch_size", "must be at least 1"));
        }
        if self.registry.read_concurrency == 0 {
            return Err(invalid("registry.read_concurrency", "must be at least 1"));
        }
        if self.naming.rate_limit == 0 {
            return Err(invalid("naming.rate_limit", "must be at least 1"));
        }
        if self.naming.rate_window_secs == 0 {
            return Err(invalid("naming.rate_window_secs", "must be at least 1"));
        }
        Ok(())
    }
}

fn invalid(field: &'static str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.to_string(),
    }
}
