use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use crate::{
    error::{ProviderError, SERVICE_UNAVAILABLE},
    model::{ProviderFailure, ProviderResult},
    provider::{ProviderId, fetch_json, unexpected_response},
};

use super::WeatherProvider;

/// Weatherstack has no meaningful error codes, so every failure is reported
/// with the same status and message.
const FAILURE_DETAIL: &str = "Weather service currently unavailable";

#[derive(Debug, Clone)]
pub struct WeatherstackProvider {
    base_url: String,
    api_key: String,
    http: Client,
}

impl WeatherstackProvider {
    pub fn new(base_url: String, api_key: String, http: Client) -> Self {
        Self { base_url, api_key, http }
    }
}

#[derive(Debug, Deserialize)]
struct WsCurrent {
    temperature: f64,
    wind_speed: f64,
}

#[derive(Debug, Deserialize)]
struct WsResponse {
    current: WsCurrent,
}

#[derive(Debug, Deserialize)]
struct WsError {
    code: i64,
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    info: String,
}

#[derive(Debug, Deserialize)]
struct WsFailure {
    error: WsError,
}

/// Map a Weatherstack body onto the normalized result.
fn parse_body(body: Value) -> ProviderResult {
    if let Ok(parsed) = serde_json::from_value::<WsResponse>(body.clone()) {
        return ProviderResult::Success {
            wind_speed: parsed.current.wind_speed,
            temperature_degrees: parsed.current.temperature,
        };
    }

    match serde_json::from_value::<WsFailure>(body) {
        Ok(failure) => {
            warn!(
                provider = "weatherstack",
                code = failure.error.code,
                kind = failure.error.kind.as_deref().unwrap_or("unknown"),
                info = %failure.error.info,
                "upstream reported an error"
            );
            ProviderResult::Failure(ProviderFailure::new(
                SERVICE_UNAVAILABLE,
                ProviderId::WeatherStack.as_str(),
                FAILURE_DETAIL,
            ))
        }
        Err(_) => ProviderResult::Failure(unexpected_response(ProviderId::WeatherStack)),
    }
}

#[async_trait]
impl WeatherProvider for WeatherstackProvider {
    fn id(&self) -> ProviderId {
        ProviderId::WeatherStack
    }

    async fn fetch(&self, city: &str, timeout: Duration) -> Result<ProviderResult, ProviderError> {
        let request = self.http.get(&self.base_url).query(&[
            ("access_key", self.api_key.as_str()),
            ("query", city),
            ("units", "m"),
        ]);

        let body = fetch_json(self.id(), request, timeout).await?;

        Ok(match body {
            Some(body) => parse_body(body),
            None => ProviderResult::Failure(unexpected_response(self.id())),
        })
    }
}
