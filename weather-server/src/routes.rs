//! Route definitions

use axum::{Router, routing::get};

use crate::{handlers, state::AppState};

/// Create the main router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/v1/weather", get(handlers::get_weather))
        .with_state(state)
}
