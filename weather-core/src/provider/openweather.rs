use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;

use crate::{
    error::{ProviderError, SERVICE_UNAVAILABLE},
    model::{ProviderFailure, ProviderResult},
    provider::{ProviderId, fetch_json, unexpected_response},
};

use super::WeatherProvider;

#[derive(Debug, Clone)]
pub struct OpenWeatherProvider {
    base_url: String,
    api_key: String,
    http: Client,
}

impl OpenWeatherProvider {
    pub fn new(base_url: String, api_key: String, http: Client) -> Self {
        Self { base_url, api_key, http }
    }
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: f64,
}

#[derive(Debug, Deserialize)]
struct OwWind {
    speed: f64,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    main: OwMain,
    wind: OwWind,
}

/// OpenWeather sends `cod` as a string on errors and as a number elsewhere.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OwCode {
    Number(i64),
    Text(String),
}

impl OwCode {
    fn status_code(&self) -> u16 {
        let parsed = match self {
            OwCode::Number(n) => u16::try_from(*n).ok(),
            OwCode::Text(s) => s.trim().parse().ok(),
        };
        parsed.unwrap_or(SERVICE_UNAVAILABLE)
    }
}

#[derive(Debug, Deserialize)]
struct OwFailure {
    cod: OwCode,
    message: String,
}

/// Map an OpenWeather body onto the normalized result.
fn parse_body(body: Value) -> ProviderResult {
    if let Ok(parsed) = serde_json::from_value::<OwCurrentResponse>(body.clone()) {
        return ProviderResult::Success {
            wind_speed: parsed.wind.speed,
            temperature_degrees: parsed.main.temp,
        };
    }

    match serde_json::from_value::<OwFailure>(body) {
        Ok(failure) => ProviderResult::Failure(ProviderFailure::new(
            failure.cod.status_code(),
            ProviderId::OpenWeather.as_str(),
            failure.message,
        )),
        Err(_) => ProviderResult::Failure(unexpected_response(ProviderId::OpenWeather)),
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherProvider {
    fn id(&self) -> ProviderId {
        ProviderId::OpenWeather
    }

    async fn fetch(&self, city: &str, timeout: Duration) -> Result<ProviderResult, ProviderError> {
        let request = self.http.get(&self.base_url).query(&[
            ("q", city),
            ("appid", self.api_key.as_str()),
            ("units", "metric"),
        ]);

        let body = fetch_json(self.id(), request, timeout).await?;

        Ok(match body {
            Some(body) => parse_body(body),
            None => ProviderResult::Failure(unexpected_response(self.id())),
        })
    }
}
