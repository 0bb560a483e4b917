use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{
    cache::MAX_ENTRY_TTL,
    error::ConfigError,
    orchestrator::FailoverMode,
    provider::{ProviderId, ProviderPriority},
};

/// Longest per-provider call budget accepted.
pub const MAX_SERVICE_TIMEOUT_SECONDS: u64 = 300;

/// Longest cache TTL accepted; matches what the stores will honour.
pub const MAX_CACHE_TTL_SECONDS: u64 = MAX_ENTRY_TTL.as_secs();

/// Configuration for a single provider.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default)]
    pub api_key: String,

    /// Overrides the provider's public endpoint, e.g. for a mock upstream.
    #[serde(default)]
    pub base_url: Option<String>,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &redact(&self.api_key))
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// Service configuration: defaults, then an optional TOML file, then the
/// environment.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// `redis://...` / `rediss://...`, or `memory://` for the in-process store.
    pub cache_store_url: String,
    pub cache_store_secret: Option<String>,

    /// Per-provider call budget.
    pub service_timeout_seconds: u64,
    pub cache_ttl_seconds: u64,

    /// Comma separated provider names, highest priority first.
    pub provider_priority: String,
    pub failover_mode: FailoverMode,

    /// Treat cache store errors as misses instead of failing the request.
    pub cache_fail_open: bool,

    /// Example TOML:
    /// [providers.openweather]
    /// api_key = "..."
    pub providers: HashMap<String, ProviderConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_store_url: "redis://localhost:6379/0".to_string(),
            cache_store_secret: None,
            service_timeout_seconds: 3,
            cache_ttl_seconds: 3,
            provider_priority: "weatherstack, openweather".to_string(),
            failover_mode: FailoverMode::Sequential,
            cache_fail_open: false,
            providers: HashMap::new(),
        }
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("cache_store_url", &self.cache_store_url)
            .field("cache_store_secret", &self.cache_store_secret.as_deref().map(redact))
            .field("service_timeout_seconds", &self.service_timeout_seconds)
            .field("cache_ttl_seconds", &self.cache_ttl_seconds)
            .field("provider_priority", &self.provider_priority)
            .field("failover_mode", &self.failover_mode)
            .field("cache_fail_open", &self.cache_fail_open)
            .field("providers", &self.providers)
            .finish()
    }
}

fn redact(secret: &str) -> &'static str {
    if secret.is_empty() { "<unset>" } else { "<redacted>" }
}

impl Config {
    /// Load from `path`, or from the platform config file when `path` is
    /// `None`, then apply environment overrides.
    ///
    /// Without a usable platform config directory only the environment is read.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => Some(p.to_path_buf()),
            None => Self::config_file_path().ok(),
        };

        let mut cfg = match path {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };
        cfg.apply_env(|name| std::env::var(name).ok())?;
        Ok(cfg)
    }

    /// Read a TOML config file, or return defaults if it doesn't exist.
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Path to the default config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "weather-task", "weather-server")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Override fields from environment variables looked up through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("CACHE_STORE_URL") {
            self.cache_store_url = url;
        }
        if let Some(secret) = lookup("CACHE_STORE_SECRET") {
            self.cache_store_secret = Some(secret).filter(|s| !s.is_empty());
        }
        if let Some(raw) = lookup("SERVICE_TIMEOUT_SECONDS") {
            self.service_timeout_seconds = parse_value("SERVICE_TIMEOUT_SECONDS", &raw)?;
        }
        if let Some(raw) = lookup("CACHE_TTL_SECONDS") {
            self.cache_ttl_seconds = parse_value("CACHE_TTL_SECONDS", &raw)?;
        }
        if let Some(raw) = lookup("PROVIDER_PRIORITY") {
            self.provider_priority = raw;
        }
        if let Some(raw) = lookup("FAILOVER_MODE") {
            self.failover_mode = FailoverMode::try_from(raw.as_str())
                .map_err(|_| ConfigError::InvalidValue { name: "FAILOVER_MODE", value: raw })?;
        }
        if let Some(raw) = lookup("CACHE_FAIL_OPEN") {
            self.cache_fail_open = parse_value("CACHE_FAIL_OPEN", &raw)?;
        }

        for &id in ProviderId::all() {
            if let Some(key) = lookup(id.api_key_env()) {
                self.upsert_provider_api_key(id, key);
            }
            if let Some(url) = lookup(id.base_url_env()) {
                self.provider_entry(id).base_url = Some(url);
            }
        }

        Ok(())
    }

    /// Check the configuration is usable and resolve the provider priority.
    pub fn validate(&self) -> Result<ProviderPriority, ConfigError> {
        if self.service_timeout_seconds == 0 {
            return Err(ConfigError::NonPositive("service_timeout_seconds"));
        }
        if self.cache_ttl_seconds == 0 {
            return Err(ConfigError::NonPositive("cache_ttl_seconds"));
        }
        if self.service_timeout_seconds > MAX_SERVICE_TIMEOUT_SECONDS {
            return Err(ConfigError::InvalidValue {
                name: "service_timeout_seconds",
                value: self.service_timeout_seconds.to_string(),
            });
        }
        if self.cache_ttl_seconds > MAX_CACHE_TTL_SECONDS {
            return Err(ConfigError::InvalidValue {
                name: "cache_ttl_seconds",
                value: self.cache_ttl_seconds.to_string(),
            });
        }

        let priority = ProviderPriority::parse(&self.provider_priority);
        for &id in priority.ids() {
            if !self.is_provider_configured(id) {
                return Err(ConfigError::MissingApiKey(id, id.api_key_env()));
            }
        }

        Ok(priority)
    }

    pub fn service_timeout(&self) -> Duration {
        Duration::from_secs(self.service_timeout_seconds)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_seconds)
    }

    pub fn provider_config(&self, id: ProviderId) -> Option<&ProviderConfig> {
        self.providers.get(id.as_str())
    }

    fn provider_entry(&mut self, id: ProviderId) -> &mut ProviderConfig {
        self.providers.entry(id.as_str().to_string()).or_default()
    }

    /// Set or replace a provider API key.
    pub fn upsert_provider_api_key(&mut self, provider_id: ProviderId, api_key: String) {
        self.provider_entry(provider_id).api_key = api_key;
    }

    /// Returns API key for a provider, if present and non-blank.
    pub fn provider_api_key(&self, provider_id: ProviderId) -> Option<&str> {
        self.provider_config(provider_id)
            .map(|cfg| cfg.api_key.trim())
            .filter(|key| !key.is_empty())
    }

    /// Configured base URL, falling back to the provider's public endpoint.
    pub fn provider_base_url(&self, provider_id: ProviderId) -> &str {
        self.provider_config(provider_id)
            .and_then(|cfg| cfg.base_url.as_deref())
            .unwrap_or_else(|| provider_id.default_base_url())
    }

    pub fn is_provider_configured(&self, provider_id: ProviderId) -> bool {
        self.provider_api_key(provider_id).is_some()
    }
}

fn parse_value<T: std::str::FromStr>(name: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue { name, value: raw.to_string() })
}
