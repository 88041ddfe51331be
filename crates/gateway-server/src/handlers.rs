//! HTTP request handlers for the gateway API.

use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, request::Parts, Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use gateway_core::{ChatCompletionPeek, ResponsesPeek};
use gateway_providers::{Vendor, VendorProxy};
use gateway_routing::{list_models as catalog_list_models, ModelListing, RouteDecision};
use gateway_telemetry::outcome;
use serde::Serialize;
use serde_json::json;
use std::time::{Instant, SystemTime, UNIX_EPOCH};
use tracing::{debug, info, instrument};

use crate::{error::ApiError, extractors::VendorHeader, state::AppState};

/// Root endpoint: current unix time
pub async fn pong() -> Json<serde_json::Value> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();
    Json(json!({ "time": now }))
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status
    pub status: &'static str,
    /// Version
    pub version: &'static str,
    /// Number of configured vendors
    pub vendors: usize,
}

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        vendors: state.manager.vendor_names().len(),
    })
}

/// Liveness check endpoint
pub async fn liveness_check() -> impl IntoResponse {
    (StatusCode::OK, "alive")
}

/// Readiness check endpoint; the default vendor always backs routing
pub async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    debug!(default_vendor = %state.manager.default_vendor().name(), "Readiness probe");
    (StatusCode::OK, "ready")
}

/// Metrics endpoint (Prometheus format)
pub async fn metrics_endpoint(State(state): State<AppState>) -> Result<Response, ApiError> {
    for vendor in state.manager.vendors().chain(std::iter::once(state.manager.default_vendor())) {
        let stats = vendor.key_stats();
        state.metrics.set_vendor_keys(vendor.name(), stats.configured, stats.valid);
    }

    let text = state
        .metrics
        .gather()
        .map_err(|e| ApiError::internal(e.to_string()))?;
    Ok(([(header::CONTENT_TYPE, "text/plain; version=0.0.4")], text).into_response())
}

/// Per-vendor status for the admin endpoint
#[derive(Debug, Serialize)]
pub struct VendorStatus {
    /// Vendor name
    pub name: String,
    /// Upstream host
    pub host: String,
    /// Key-check dialect
    pub dialect: &'static str,
    /// Whether the vendor is left out of model listings
    pub hide_models: bool,
    /// Configured default model
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,
    /// Number of configured keys (primary plus pool)
    pub configured_keys: usize,
    /// Number of keys that passed the last check
    pub valid_keys: usize,
    /// Whether this is the synthesized default vendor
    pub default: bool,
}

impl VendorStatus {
    fn new(vendor: &Vendor, default: bool) -> Self {
        let stats = vendor.key_stats();
        Self {
            name: vendor.name().to_string(),
            host: vendor.host().to_string(),
            dialect: vendor.dialect().as_str(),
            hide_models: vendor.should_hide_models(),
            default_model: vendor.default_model().map(ToString::to_string),
            configured_keys: stats.configured,
            valid_keys: stats.valid,
            default,
        }
    }
}

/// List vendors and their key health
pub async fn list_vendors(State(state): State<AppState>) -> Json<Vec<VendorStatus>> {
    let mut vendors: Vec<_> = state
        .manager
        .vendors()
        .map(|vendor| VendorStatus::new(vendor, false))
        .collect();
    vendors.push(VendorStatus::new(state.manager.default_vendor(), true));
    Json(vendors)
}

/// List models (OpenAI compatible), optionally for the vendor named in `x-vendor`
#[instrument(skip(state))]
pub async fn list_models(State(state): State<AppState>, vendor: VendorHeader) -> Response {
    let scope = vendor.as_deref().unwrap_or("all").to_string();
    let listing = catalog_list_models(&state.manager, vendor.as_deref(), state.config.health.listing_timeout).await;

    match listing {
        ModelListing::Listed(models) => {
            state.metrics.record_model_listing(&scope, outcome::LISTED);
            Json(models).into_response()
        }
        ModelListing::Fallback => {
            state.metrics.record_model_listing(&scope, outcome::FALLBACK);
            Json(state.fallback.as_ref()).into_response()
        }
    }
}

/// Chat completions: route by `x-vendor`, else by the requested model
pub async fn chat_completions(
    State(state): State<AppState>,
    vendor: VendorHeader,
    request: Request,
) -> Result<Response, ApiError> {
    let (parts, body) = request.into_parts();
    let body = read_body(&state, body).await?;

    let peek = ChatCompletionPeek::from_slice(&body).map_err(|e| ApiError::bad_request(e.to_string()))?;
    let decision = state.manager.route(vendor.as_deref(), Some(&peek.model));

    info!(
        model = %peek.model,
        vendor = %decision.vendor,
        reason = ?decision.reason,
        message_count = peek.messages.len(),
        context_size = peek.context_size(),
        "Chat completion request"
    );

    Ok(forward(&state, &decision.proxy, parts, body).await)
}

/// Responses API: POST routes like chat completions, other methods by `x-vendor`
pub async fn responses(
    State(state): State<AppState>,
    vendor: VendorHeader,
    request: Request,
) -> Result<Response, ApiError> {
    let (parts, body) = request.into_parts();
    let body = read_body(&state, body).await?;

    let decision = if parts.method == Method::POST {
        let peek = ResponsesPeek::from_slice(&body).map_err(|e| ApiError::bad_request(e.to_string()))?;
        let decision = state.manager.route(vendor.as_deref(), Some(&peek.model));
        let (input_count, context_size) = peek.input_stats();
        info!(
            model = %peek.model,
            vendor = %decision.vendor,
            reason = ?decision.reason,
            input_count,
            context_size,
            "Responses request"
        );
        decision
    } else {
        route_by_header(&state, &vendor)
    };

    Ok(forward(&state, &decision.proxy, parts, body).await)
}

/// Retrieve, cancel or delete a stored response: route by `x-vendor`
pub async fn response_by_id(
    State(state): State<AppState>,
    vendor: VendorHeader,
    request: Request,
) -> Result<Response, ApiError> {
    proxy_by_header(state, vendor, request).await
}

/// Any other path: route by `x-vendor`
pub async fn fallback_proxy(
    State(state): State<AppState>,
    vendor: VendorHeader,
    request: Request,
) -> Result<Response, ApiError> {
    proxy_by_header(state, vendor, request).await
}

/// Generative-language pass-through; the client's credentials are forwarded as-is
pub async fn gemini(State(state): State<AppState>, request: Request) -> Result<Response, ApiError> {
    let (parts, body) = request.into_parts();
    let body = read_body(&state, body).await?;
    debug!(path = %parts.uri.path(), "Generative-language pass-through");
    let proxy = state.passthrough.clone();
    Ok(forward(&state, &proxy, parts, body).await)
}

async fn proxy_by_header(state: AppState, vendor: VendorHeader, request: Request) -> Result<Response, ApiError> {
    let (parts, body) = request.into_parts();
    let body = read_body(&state, body).await?;
    let decision = route_by_header(&state, &vendor);
    debug!(vendor = %decision.vendor, path = %parts.uri.path(), "Routing by vendor header");
    Ok(forward(&state, &decision.proxy, parts, body).await)
}

fn route_by_header(state: &AppState, vendor: &VendorHeader) -> RouteDecision {
    state.manager.route(vendor.as_deref(), None)
}

async fn read_body(state: &AppState, body: Body) -> Result<Bytes, ApiError> {
    let limit = state.config.server.max_body_bytes;
    axum::body::to_bytes(body, limit).await.map_err(|e| {
        let too_large = std::error::Error::source(&e)
            .is_some_and(|source| source.is::<http_body_util::LengthLimitError>());
        if too_large {
            ApiError::payload_too_large(format!("Request body exceeds {limit} bytes"))
        } else {
            ApiError::bad_request(format!("Failed to read request body: {e}"))
        }
    })
}

async fn forward(state: &AppState, proxy: &VendorProxy, parts: Parts, body: Bytes) -> Response {
    let start = Instant::now();
    let response = proxy.forward(parts, body).await;
    state
        .metrics
        .record_proxy_request(proxy.vendor(), response.status().as_u16(), start.elapsed());
    response
}
