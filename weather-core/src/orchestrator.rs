//! Provider failover.
//!
//! Providers are tried in priority order and the first success wins. Upstream
//! failures are remembered so the last one can be reported if nothing
//! succeeds; timeouts are logged and skipped without being recorded.

use std::{sync::Arc, time::Duration};

use futures::stream::{FuturesUnordered, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::{
    error::{ALL_PROVIDERS_UNAVAILABLE, ProviderError, SERVICE_UNAVAILABLE, WeatherError},
    model::{ProviderFailure, ProviderResult, UnifiedWeatherResponse},
    provider::WeatherProvider,
};

/// How providers are consulted on a cache miss.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailoverMode {
    /// One provider at a time, in priority order.
    #[default]
    Sequential,
    /// All providers at once; the first success wins.
    Race,
}

impl TryFrom<&str> for FailoverMode {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_lowercase().as_str() {
            "sequential" => Ok(FailoverMode::Sequential),
            "race" => Ok(FailoverMode::Race),
            _ => Err(anyhow::anyhow!(
                "Unknown failover mode '{value}'. Expected sequential or race."
            )),
        }
    }
}

/// What a single provider call amounted to.
enum Attempt {
    Success(UnifiedWeatherResponse),
    Failed(ProviderFailure),
    Skipped,
}

#[derive(Debug, Clone)]
pub struct FailoverOrchestrator {
    providers: Vec<Arc<dyn WeatherProvider>>,
    timeout: Duration,
    mode: FailoverMode,
}

impl FailoverOrchestrator {
    pub fn new(providers: Vec<Arc<dyn WeatherProvider>>, timeout: Duration) -> Self {
        Self { providers, timeout, mode: FailoverMode::Sequential }
    }

    pub fn with_mode(mut self, mode: FailoverMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn mode(&self) -> FailoverMode {
        self.mode
    }

    /// Current conditions for `city` from the first provider that succeeds.
    ///
    /// When every provider fails, the error carries the status and detail of
    /// the last recorded failure, or a generic 503 if all of them timed out.
    #[instrument(skip(self), fields(mode = ?self.mode))]
    pub async fn get_weather(&self, city: &str) -> Result<UnifiedWeatherResponse, WeatherError> {
        let outcome = match self.mode {
            FailoverMode::Sequential => self.run_sequential(city).await,
            FailoverMode::Race => self.run_race(city).await,
        };

        outcome.map_err(|last_failure| match last_failure {
            Some(failure) => WeatherError::ServiceUnavailable {
                status_code: failure.status_code,
                detail: failure.detail,
            },
            None => {
                warn!(city, "no provider reported a failure, all were skipped");
                WeatherError::ServiceUnavailable {
                    status_code: SERVICE_UNAVAILABLE,
                    detail: ALL_PROVIDERS_UNAVAILABLE.to_string(),
                }
            }
        })
    }

    async fn run_sequential(
        &self,
        city: &str,
    ) -> Result<UnifiedWeatherResponse, Option<ProviderFailure>> {
        let mut last_failure = None;

        for provider in &self.providers {
            match attempt(provider.as_ref(), city, self.timeout).await {
                Attempt::Success(resp) => return Ok(resp),
                Attempt::Failed(failure) => last_failure = Some(failure),
                Attempt::Skipped => {}
            }
        }

        Err(last_failure)
    }

    async fn run_race(&self, city: &str) -> Result<UnifiedWeatherResponse, Option<ProviderFailure>> {
        let mut pending: FuturesUnordered<_> = self
            .providers
            .iter()
            .enumerate()
            .map(|(rank, provider)| async move {
                (rank, attempt(provider.as_ref(), city, self.timeout).await)
            })
            .collect();

        // Keep the failure of the lowest-priority provider, matching what
        // sequential mode would have reported.
        let mut reported: Option<(usize, ProviderFailure)> = None;

        while let Some((rank, outcome)) = pending.next().await {
            match outcome {
                // Returning drops `pending`, abandoning calls still in flight.
                Attempt::Success(resp) => return Ok(resp),
                Attempt::Failed(failure) => {
                    if reported.as_ref().is_none_or(|(r, _)| rank > *r) {
                        reported = Some((rank, failure));
                    }
                }
                Attempt::Skipped => {}
            }
        }

        Err(reported.map(|(_, failure)| failure))
    }
}

async fn attempt(provider: &dyn WeatherProvider, city: &str, timeout: Duration) -> Attempt {
    let id = provider.id();

    match provider.fetch(city, timeout).await {
        Ok(ProviderResult::Success { wind_speed, temperature_degrees }) => {
            info!(provider = %id, "provider returned weather");
            Attempt::Success(UnifiedWeatherResponse::live(wind_speed, temperature_degrees))
        }
        Ok(ProviderResult::Failure(failure)) => {
            warn!(
                provider = %failure.provider_name,
                status_code = failure.status_code,
                detail = %failure.detail,
                "provider failed"
            );
            Attempt::Failed(failure)
        }
        Err(err @ ProviderError::Timeout { .. }) => {
            warn!(provider = %id, "{err}; trying next provider");
            Attempt::Skipped
        }
        Err(err @ ProviderError::Transport { .. }) => {
            warn!(provider = %id, "{err}");
            Attempt::Failed(ProviderFailure::new(
                SERVICE_UNAVAILABLE,
                id.as_str(),
                format!("{id} unreachable"),
            ))
        }
    }
}
