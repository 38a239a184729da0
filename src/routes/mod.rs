pub mod health;
pub mod timings;

use crate::config::Config;
use axum::{
    routing::{get, post},
    Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Successful response envelope shared by all endpoints.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// Builds the application router with CORS and request tracing.
pub fn build_router(config: Config) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/health", get(health::health_check))
        .route("/api/timings", post(timings::normalize_timings))
        .route("/api/har/timings", post(timings::har_timings))
        .with_state(Arc::new(config))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
