//! Route definitions for the gateway API.

use axum::{
    routing::{any, get},
    Router,
};

use crate::{handlers, middleware, state::AppState};

/// Create the main API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::pong))
        // Health endpoints
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/live", get(handlers::liveness_check))
        // Metrics endpoint
        .route("/metrics", get(handlers::metrics_endpoint))
        // OpenAI-compatible endpoints
        .merge(openai_routes())
        // Generative-language pass-through
        .route("/v1beta/models", any(handlers::gemini))
        .route("/v1beta/models/*rest", any(handlers::gemini))
        // Admin endpoints
        .merge(admin_routes())
        // Everything else goes to the vendor named in x-vendor
        .fallback(handlers::fallback_proxy)
        .layer(axum::middleware::from_fn(middleware::logging_middleware))
        .layer(axum::middleware::from_fn(middleware::request_id_middleware))
        .with_state(state)
}

/// OpenAI-compatible API routes
fn openai_routes() -> Router<AppState> {
    Router::new()
        .route("/v1/models", get(handlers::list_models).fallback(handlers::fallback_proxy))
        .route("/v1/chat/completions", any(handlers::chat_completions))
        .route("/v1/responses", any(handlers::responses))
        .route("/v1/responses/:id", any(handlers::response_by_id))
}

/// Admin/management routes
fn admin_routes() -> Router<AppState> {
    Router::new().route("/admin/vendors", get(handlers::list_vendors))
}
