//! Shared application state.

use std::sync::Arc;

use anyhow::Context;
use tracing::info;
use weather_core::{CacheGateway, Config, FailoverOrchestrator, build_providers, open_store};

#[derive(Debug, Clone)]
pub struct AppState {
    pub cache: CacheGateway,
    pub orchestrator: Arc<FailoverOrchestrator>,
    /// Serve without the cache when the store misbehaves.
    pub cache_fail_open: bool,
}

impl AppState {
    pub fn new(cache: CacheGateway, orchestrator: FailoverOrchestrator) -> Self {
        Self { cache, orchestrator: Arc::new(orchestrator), cache_fail_open: false }
    }

    pub fn with_cache_fail_open(mut self, fail_open: bool) -> Self {
        self.cache_fail_open = fail_open;
        self
    }

    /// Validate `config` and wire up providers, orchestrator and cache.
    ///
    /// Fails when an API key is missing or the cache store can't be reached.
    pub async fn from_config(config: &Config) -> anyhow::Result<Self> {
        let priority = config.validate().context("Invalid configuration")?;
        let providers = build_providers(config, &priority)?;

        info!(
            priority = ?priority.ids(),
            mode = ?config.failover_mode,
            timeout_secs = config.service_timeout_seconds,
            "providers configured"
        );

        let orchestrator = FailoverOrchestrator::new(providers, config.service_timeout())
            .with_mode(config.failover_mode);

        let store = open_store(&config.cache_store_url, config.cache_store_secret.as_deref())
            .await
            .context("Failed to connect to cache store")?;
        let cache = CacheGateway::new(store, config.cache_ttl());

        Ok(Self::new(cache, orchestrator).with_cache_fail_open(config.cache_fail_open))
    }
}
