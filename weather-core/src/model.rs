use serde::{Deserialize, Serialize};

/// Normalized outcome of a single provider call that produced a usable body.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderResult {
    Success {
        wind_speed: f64,
        temperature_degrees: f64,
    },
    Failure(ProviderFailure),
}

/// Failure reported by an upstream, already mapped to an HTTP-ish status code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderFailure {
    pub status_code: u16,
    pub provider_name: String,
    pub detail: String,
}

impl ProviderFailure {
    pub fn new(status_code: u16, provider_name: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            status_code,
            provider_name: provider_name.into(),
            detail: detail.into(),
        }
    }
}

/// Canonical response returned to clients.
///
/// `cached` is true exactly when `cached_time` is set; use the constructors
/// rather than building the struct by hand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnifiedWeatherResponse {
    pub wind_speed: f64,
    pub temperature_degrees: f64,
    pub cached: bool,
    pub cached_time: Option<String>,
}

impl UnifiedWeatherResponse {
    /// Response built from a live provider call.
    pub fn live(wind_speed: f64, temperature_degrees: f64) -> Self {
        Self {
            wind_speed,
            temperature_degrees,
            cached: false,
            cached_time: None,
        }
    }
}

impl From<CacheEntry> for UnifiedWeatherResponse {
    fn from(entry: CacheEntry) -> Self {
        Self {
            wind_speed: entry.wind_speed,
            temperature_degrees: entry.temperature_degrees,
            cached: true,
            cached_time: Some(entry.cached_time),
        }
    }
}

/// Record persisted in the key-value store. Reading one back always yields a
/// cached response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub wind_speed: f64,
    pub temperature_degrees: f64,
    pub cached_time: String,
}
