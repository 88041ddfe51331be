//! Shared application state.

use gateway_config::GatewayConfig;
use gateway_core::{GatewayError, ModelsResponse};
use gateway_providers::{parse_host, proxy_client, VendorProxy};
use gateway_routing::VendorManager;
use gateway_telemetry::Metrics;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;

use crate::fallback::static_models;

/// Vendor name used for the generative-language pass-through proxy
pub const PASSTHROUGH_VENDOR: &str = "gemini";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// State shared by every handler
#[derive(Debug, Clone)]
pub struct AppState {
    /// Loaded configuration
    pub config: Arc<GatewayConfig>,
    /// Vendor registry
    pub manager: Arc<VendorManager>,
    /// Pass-through proxy for `/v1beta/models`
    pub passthrough: VendorProxy,
    /// Prometheus metrics
    pub metrics: Metrics,
    /// Static model list served when no vendor answers
    pub fallback: Arc<ModelsResponse>,
}

impl AppState {
    /// Start building application state
    pub fn builder() -> AppStateBuilder {
        AppStateBuilder::default()
    }
}

/// Builder for [`AppState`]
#[derive(Debug, Default)]
pub struct AppStateBuilder {
    config: Option<GatewayConfig>,
    manager: Option<Arc<VendorManager>>,
    metrics: Option<Metrics>,
    client: Option<Client>,
}

impl AppStateBuilder {
    /// Set the configuration
    #[must_use]
    pub fn config(mut self, config: GatewayConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the vendor registry
    #[must_use]
    pub fn manager(mut self, manager: Arc<VendorManager>) -> Self {
        self.manager = Some(manager);
        self
    }

    /// Use an existing metrics instance
    #[must_use]
    pub fn metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// HTTP client for the pass-through proxy
    #[must_use]
    pub fn client(mut self, client: Client) -> Self {
        self.client = Some(client);
        self
    }

    /// Build the state
    pub fn build(self) -> Result<AppState, GatewayError> {
        let config = self.config.unwrap_or_default();
        let manager = self
            .manager
            .ok_or_else(|| GatewayError::configuration("application state requires a vendor manager"))?;
        let metrics = match self.metrics {
            Some(metrics) => metrics,
            None => Metrics::new().map_err(|e| GatewayError::internal(e.to_string()))?,
        };
        let client = match self.client {
            Some(client) => client,
            None => proxy_client(CONNECT_TIMEOUT, config.server.upstream_idle_timeout)?,
        };

        let target = parse_host(PASSTHROUGH_VENDOR, &config.passthrough.gemini_host)?;
        let passthrough = VendorProxy::new(PASSTHROUGH_VENDOR, target, None, None, client);
        let fallback = Arc::new(static_models(&config));

        Ok(AppState {
            config: Arc::new(config),
            manager,
            passthrough,
            metrics,
            fallback,
        })
    }
}
