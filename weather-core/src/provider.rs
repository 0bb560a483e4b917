use crate::{
    Config,
    error::{ConfigError, ProviderError},
    model::{ProviderFailure, ProviderResult},
    provider::{openweather::OpenWeatherProvider, weatherstack::WeatherstackProvider},
};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use std::{convert::TryFrom, fmt::Debug, sync::Arc, time::Duration};
use tracing::{debug, warn};

pub mod openweather;
pub mod weatherstack;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderId {
    WeatherStack,
    OpenWeather,
}

impl ProviderId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::WeatherStack => "weatherstack",
            ProviderId::OpenWeather => "openweather",
        }
    }

    /// Every known provider, in default priority order.
    pub const fn all() -> &'static [ProviderId] {
        &[ProviderId::WeatherStack, ProviderId::OpenWeather]
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            ProviderId::WeatherStack => "http://api.weatherstack.com/current",
            ProviderId::OpenWeather => "https://api.openweathermap.org/data/2.5/weather",
        }
    }

    /// Environment variable holding this provider's API key.
    pub fn api_key_env(&self) -> &'static str {
        match self {
            ProviderId::WeatherStack => "WEATHERSTACK_API_KEY",
            ProviderId::OpenWeather => "OPENWEATHER_API_KEY",
        }
    }

    /// Environment variable overriding this provider's base URL.
    pub fn base_url_env(&self) -> &'static str {
        match self {
            ProviderId::WeatherStack => "WEATHERSTACK_BASE_URL",
            ProviderId::OpenWeather => "OPENWEATHER_BASE_URL",
        }
    }
}

impl std::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ProviderId {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let lower = value.trim().to_lowercase();

        match lower.as_str() {
            "weatherstack" => Ok(ProviderId::WeatherStack),
            "openweather" => Ok(ProviderId::OpenWeather),
            _ => Err(anyhow::anyhow!(
                "Unknown provider '{value}'. Supported providers: weatherstack, openweather."
            )),
        }
    }
}

/// Ordered list of providers to try, resolved once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderPriority(Vec<ProviderId>);

impl ProviderPriority {
    /// Parse a comma separated list such as `"WeatherStack, OpenWeather"`.
    ///
    /// Unknown and repeated names are logged and skipped. An empty result
    /// falls back to [`ProviderId::all`].
    pub fn parse(raw: &str) -> Self {
        let mut ids = Vec::new();

        for entry in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            match ProviderId::try_from(entry) {
                Ok(id) if ids.contains(&id) => {
                    warn!(provider = %id, "duplicate entry in provider priority, ignoring");
                }
                Ok(id) => ids.push(id),
                Err(err) => warn!(entry, "{err}"),
            }
        }

        if ids.is_empty() {
            warn!(raw, "no valid providers in priority list, using default order");
            return Self::default();
        }

        Self(ids)
    }

    pub fn ids(&self) -> &[ProviderId] {
        &self.0
    }
}

impl Default for ProviderPriority {
    fn default() -> Self {
        Self(ProviderId::all().to_vec())
    }
}

/// One upstream weather source.
#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    fn id(&self) -> ProviderId;

    /// Fetch current conditions for `city`, giving up after `timeout`.
    async fn fetch(&self, city: &str, timeout: Duration) -> Result<ProviderResult, ProviderError>;
}

/// Construct the adapters for `priority`, in order.
pub fn build_providers(
    config: &Config,
    priority: &ProviderPriority,
) -> Result<Vec<Arc<dyn WeatherProvider>>, ConfigError> {
    let http = Client::new();

    priority
        .ids()
        .iter()
        .map(|&id| {
            let api_key = config
                .provider_api_key(id)
                .ok_or(ConfigError::MissingApiKey(id, id.api_key_env()))?
                .to_owned();
            let base_url = config.provider_base_url(id).to_owned();

            let provider: Arc<dyn WeatherProvider> = match id {
                ProviderId::WeatherStack => {
                    Arc::new(WeatherstackProvider::new(base_url, api_key, http.clone()))
                }
                ProviderId::OpenWeather => {
                    Arc::new(OpenWeatherProvider::new(base_url, api_key, http.clone()))
                }
            };
            Ok::<_, ConfigError>(provider)
        })
        .collect()
}

/// Send `request` and read the body as JSON under a single deadline.
///
/// Returns `Ok(None)` when the body is not valid JSON. The HTTP status is
/// not checked here: both upstreams describe their errors in the body.
pub(crate) async fn fetch_json(
    provider: ProviderId,
    request: RequestBuilder,
    timeout: Duration,
) -> Result<Option<serde_json::Value>, ProviderError> {
    let call = async {
        let res = request.send().await?;
        let status = res.status();
        let body = res.bytes().await?;
        Ok::<_, reqwest::Error>((status, body))
    };

    let (status, body) = tokio::time::timeout(timeout, call)
        .await
        .map_err(|_| ProviderError::Timeout { provider, timeout })?
        .map_err(|source| ProviderError::Transport { provider, source })?;

    debug!(%provider, %status, bytes = body.len(), "upstream responded");

    Ok(serde_json::from_slice(&body).ok())
}

/// Failure used when a body matches neither the success nor the error schema.
pub(crate) fn unexpected_response(provider: ProviderId) -> ProviderFailure {
    ProviderFailure::new(502, provider.as_str(), format!("Unexpected response from {provider}"))
}
