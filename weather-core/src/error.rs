use std::time::Duration;

use thiserror::Error;

use crate::provider::ProviderId;

/// Status code used when no upstream gave us anything more specific.
pub const SERVICE_UNAVAILABLE: u16 = 503;

/// Detail used when every provider was skipped without a reportable failure.
pub const ALL_PROVIDERS_UNAVAILABLE: &str = "Weather services currently unavailable";

/// Errors raised by a provider adapter that are not upstream-reported failures.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("{provider} did not respond within {timeout:?}")]
    Timeout { provider: ProviderId, timeout: Duration },

    #[error("{provider} request failed: {source}")]
    Transport {
        provider: ProviderId,
        #[source]
        source: reqwest::Error,
    },
}

/// Errors surfaced by the failover orchestrator.
#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("service unavailable ({status_code}): {detail}")]
    ServiceUnavailable { status_code: u16, detail: String },
}

/// Key-value store errors.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache store error: {0}")]
    Store(#[from] redis::RedisError),

    #[error("failed to serialize cache entry: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Startup configuration errors. Any of these stops the process.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing API key for provider '{0}' (set {1})")]
    MissingApiKey(ProviderId, &'static str),

    #[error("invalid value for {name}: '{value}'")]
    InvalidValue { name: &'static str, value: String },

    #[error("{0} must be greater than zero")]
    NonPositive(&'static str),
}
