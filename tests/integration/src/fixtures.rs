//! Test fixtures: configurations, states and request bodies

use gateway_config::{GatewayConfig, ModelRuleConfig, VendorConfig};
use gateway_core::ApiKey;
use gateway_providers::FixedKeyValidator;
use gateway_routing::VendorManager;
use gateway_server::AppState;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

/// Host that refuses connections
pub const UNREACHABLE_HOST: &str = "http://127.0.0.1:1";

/// Key of the synthesized default vendor
pub const DEFAULT_KEY: &str = "sk-default-0123456789";

/// Configuration with the given vendors and rules; the default endpoint is unreachable
pub fn config_with(vendors: Vec<VendorConfig>, models: Vec<ModelRuleConfig>) -> GatewayConfig {
    let mut config = GatewayConfig {
        vendors,
        models,
        ..GatewayConfig::default()
    };
    config.default_endpoint.host = UNREACHABLE_HOST.to_string();
    config.default_endpoint.key = ApiKey::from(DEFAULT_KEY);
    config.health.validation_timeout = Duration::from_secs(2);
    config.health.listing_timeout = Duration::from_secs(2);
    config
}

/// Point the default endpoint at `host`
pub fn with_default_endpoint(mut config: GatewayConfig, host: String) -> GatewayConfig {
    config.default_endpoint.host = host;
    config
}

/// Registry that trusts every key, without background loops
pub async fn trusting_manager(config: GatewayConfig) -> Arc<VendorManager> {
    VendorManager::builder(config)
        .validator(Arc::new(FixedKeyValidator::accept_all()))
        .background_tasks(false)
        .seed(7)
        .build()
        .await
        .unwrap()
}

/// Registry that probes keys over HTTP, without background loops
pub async fn probing_manager(config: GatewayConfig) -> Arc<VendorManager> {
    VendorManager::builder(config)
        .background_tasks(false)
        .seed(7)
        .build()
        .await
        .unwrap()
}

/// Application state around a registry
pub fn app_state(config: GatewayConfig, manager: Arc<VendorManager>) -> AppState {
    AppState::builder().config(config).manager(manager).build().unwrap()
}

/// OpenAI chat completion request
pub fn chat_request(model: &str, content: &str) -> Value {
    json!({
        "model": model,
        "messages": [{"role": "user", "content": content}],
    })
}
