//! Request handlers.

use axum::{
    Json,
    extract::{Query, State, rejection::QueryRejection},
};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{info, instrument, warn};
use weather_core::{UnifiedWeatherResponse, cache_key};

use crate::{error::ApiError, state::AppState};

#[derive(Debug, Deserialize)]
pub struct WeatherQuery {
    pub city: Option<String>,
}

/// `GET /v1/weather?city=...`
///
/// Serves from the cache when possible, otherwise asks the providers and
/// caches what they return.
#[instrument(skip(state))]
pub async fn get_weather(
    State(state): State<AppState>,
    query: Result<Query<WeatherQuery>, QueryRejection>,
) -> Result<Json<UnifiedWeatherResponse>, ApiError> {
    let Query(query) = query.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
    let city = query
        .city
        .ok_or_else(|| ApiError::BadRequest("Missing required query parameter 'city'".into()))?;
    let key = cache_key(&city);

    match state.cache.get(&key).await {
        Ok(Some(entry)) => return Ok(Json(entry.into())),
        Ok(None) => {}
        Err(err) if state.cache_fail_open => {
            warn!(key = %key, error = %err, "cache read failed, fetching live");
        }
        Err(err) => return Err(err.into()),
    }

    let live = state.orchestrator.get_weather(&city).await?;

    if let Err(err) = state.cache.put(&key, &live).await {
        if !state.cache_fail_open {
            return Err(err.into());
        }
        warn!(key = %key, error = %err, "cache write failed, returning live response");
    }

    info!(city = %city, "served live weather");
    Ok(Json(live))
}

/// `GET /health`
pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
