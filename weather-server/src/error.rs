//! HTTP error mapping.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use weather_core::{CacheError, WeatherError};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Upstream unavailable ({status}): {detail}")]
    Upstream { status: StatusCode, detail: String },

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub detail: String,
}

/// Status to answer with for an upstream-reported code.
///
/// Anything that isn't a 4xx/5xx HTTP status becomes a 503.
pub fn passthrough_status(code: u16) -> StatusCode {
    StatusCode::from_u16(code)
        .ok()
        .filter(|s| s.is_client_error() || s.is_server_error())
        .unwrap_or(StatusCode::SERVICE_UNAVAILABLE)
}

impl From<WeatherError> for ApiError {
    fn from(err: WeatherError) -> Self {
        match err {
            WeatherError::ServiceUnavailable { status_code, detail } => {
                Self::Upstream { status: passthrough_status(status_code), detail }
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::Upstream { status, detail } => (status, detail),
            Self::Cache(err) => {
                tracing::error!(error = %err, "cache store failure");
                (StatusCode::INTERNAL_SERVER_ERROR, "Cache unavailable".to_string())
            }
        };

        (status, Json(ErrorResponse { detail })).into_response()
    }
}
