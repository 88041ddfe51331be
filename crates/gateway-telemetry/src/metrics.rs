//! Prometheus metrics.

use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGaugeVec, Opts, Registry, TextEncoder};
use std::time::Duration;

/// Outcome label values for model listings
pub mod outcome {
    /// Models were returned by at least one vendor
    pub const LISTED: &str = "listed";
    /// The static fallback list was served
    pub const FALLBACK: &str = "fallback";
}

/// Gateway metrics, registered in a private registry
#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    proxy_requests: IntCounterVec,
    proxy_duration: HistogramVec,
    model_listings: IntCounterVec,
    vendor_keys: IntGaugeVec,
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics").finish_non_exhaustive()
    }
}

impl Metrics {
    /// Create and register every metric
    ///
    /// # Errors
    /// Returns error if a metric cannot be registered
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        let proxy_requests = IntCounterVec::new(
            Opts::new("gateway_proxy_requests_total", "Requests forwarded to vendors"),
            &["vendor", "status"],
        )?;
        let proxy_duration = HistogramVec::new(
            HistogramOpts::new(
                "gateway_proxy_request_duration_seconds",
                "Time until the vendor's response headers arrived",
            )
            .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]),
            &["vendor"],
        )?;
        let model_listings = IntCounterVec::new(
            Opts::new("gateway_model_listings_total", "Model listing requests"),
            &["scope", "outcome"],
        )?;
        let vendor_keys = IntGaugeVec::new(
            Opts::new("gateway_vendor_keys", "Vendor keys by validation state"),
            &["vendor", "state"],
        )?;

        registry.register(Box::new(proxy_requests.clone()))?;
        registry.register(Box::new(proxy_duration.clone()))?;
        registry.register(Box::new(model_listings.clone()))?;
        registry.register(Box::new(vendor_keys.clone()))?;

        Ok(Self {
            registry,
            proxy_requests,
            proxy_duration,
            model_listings,
            vendor_keys,
        })
    }

    /// Record a forwarded request
    pub fn record_proxy_request(&self, vendor: &str, status: u16, elapsed: Duration) {
        let status = status.to_string();
        self.proxy_requests
            .with_label_values(&[vendor, status.as_str()])
            .inc();
        self.proxy_duration
            .with_label_values(&[vendor])
            .observe(elapsed.as_secs_f64());
    }

    /// Record a model listing; `scope` is a vendor name or "all"
    pub fn record_model_listing(&self, scope: &str, outcome: &str) {
        self.model_listings.with_label_values(&[scope, outcome]).inc();
    }

    /// Set a vendor's key gauges
    pub fn set_vendor_keys(&self, vendor: &str, configured: usize, valid: usize) {
        self.vendor_keys
            .with_label_values(&[vendor, "configured"])
            .set(configured as i64);
        self.vendor_keys
            .with_label_values(&[vendor, "valid"])
            .set(valid as i64);
    }

    /// Render every metric in the Prometheus text format
    ///
    /// # Errors
    /// Returns error if encoding fails
    pub fn gather(&self) -> Result<String, MetricsError> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| MetricsError::Encode(e.to_string()))
    }
}

/// Metrics error
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    /// Registration or encoding failed inside prometheus
    #[error("Prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),
    /// Output was not UTF-8
    #[error("Failed to encode metrics: {0}")]
    Encode(String),
}
