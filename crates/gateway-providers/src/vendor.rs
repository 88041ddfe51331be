//! A single backend vendor: credential pool, model cache and refresh loop.

use crate::proxy::VendorProxy;
use crate::validator::{KeyValidator, MODELS_PATH};
use futures::future::join_all;
use gateway_config::{HealthSettings, VendorConfig};
use gateway_core::{ApiKey, GatewayError, ModelsResponse, ShutdownToken, VendorDialect};
use parking_lot::{Mutex, RwLock};
use rand::rngs::StdRng;
use rand::Rng;
use reqwest::Client;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};
use url::Url;

/// Shared random source for key selection
pub type SharedRng = Arc<Mutex<StdRng>>;

/// Something that hands out a credential for an outbound request
pub trait KeySource: Send + Sync {
    /// Vendor name, for logging
    fn vendor_name(&self) -> &str;

    /// Credential to attach to the next request
    fn select_key(&self) -> ApiKey;
}

/// Timings for a vendor instance
#[derive(Debug, Clone)]
pub struct VendorOptions {
    /// Period of the background key re-validation
    pub key_refresh_interval: Duration,
    /// Lifetime of a cached model list
    pub model_cache_ttl: Duration,
    /// Ceiling for the model-list fetch
    pub request_timeout: Duration,
}

impl Default for VendorOptions {
    fn default() -> Self {
        Self::from(&HealthSettings::default())
    }
}

impl From<&HealthSettings> for VendorOptions {
    fn from(settings: &HealthSettings) -> Self {
        Self {
            key_refresh_interval: settings.key_refresh_interval,
            model_cache_ttl: settings.model_cache_ttl,
            request_timeout: settings.listing_timeout,
        }
    }
}

/// Outcome of one validation cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyRefreshReport {
    /// Keys probed
    pub checked: usize,
    /// Keys that passed
    pub valid: usize,
    /// Keys whose probe errored
    pub errors: usize,
}

/// Snapshot of a vendor's credential state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyStats {
    /// Distinct non-empty keys configured
    pub configured: usize,
    /// Keys in the current valid set
    pub valid: usize,
}

struct CachedModels {
    models: Arc<ModelsResponse>,
    expires_at: Instant,
}

/// A configured backend vendor
pub struct Vendor {
    config: VendorConfig,
    dialect: VendorDialect,
    target: Url,
    base_url: String,
    candidates: Vec<ApiKey>,
    valid_keys: RwLock<Vec<ApiKey>>,
    models_cache: RwLock<Option<CachedModels>>,
    validator: Arc<dyn KeyValidator>,
    client: Client,
    rng: SharedRng,
    options: VendorOptions,
}

impl std::fmt::Debug for Vendor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Vendor")
            .field("name", &self.config.name)
            .field("host", &self.config.host)
            .field("dialect", &self.dialect)
            .finish_non_exhaustive()
    }
}

impl Vendor {
    /// Create a vendor and validate its keys once before returning
    ///
    /// # Errors
    /// Returns a configuration error when the host is not an absolute http(s) URL
    pub async fn connect(
        config: VendorConfig,
        options: VendorOptions,
        validator: Arc<dyn KeyValidator>,
        client: Client,
        rng: SharedRng,
    ) -> Result<Self, GatewayError> {
        let target = parse_host(&config.name, &config.host)?;
        let dialect = config.resolved_dialect();

        info!(vendor = %config.name, host = %config.host, dialect = %dialect, "Creating vendor instance");

        let vendor = Self {
            base_url: config.host.trim_end_matches('/').to_string(),
            candidates: config.candidate_keys(),
            dialect,
            target,
            valid_keys: RwLock::new(Vec::new()),
            models_cache: RwLock::new(None),
            validator,
            client,
            rng,
            options,
            config,
        };

        vendor.refresh_valid_keys().await;
        Ok(vendor)
    }

    /// Vendor name
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Configured host
    pub fn host(&self) -> &str {
        &self.config.host
    }

    /// Vendor descriptor
    pub fn config(&self) -> &VendorConfig {
        &self.config
    }

    /// Effective dialect
    pub fn dialect(&self) -> VendorDialect {
        self.dialect
    }

    /// Whether this vendor is excluded from model listings
    pub fn should_hide_models(&self) -> bool {
        self.config.hide_models
    }

    /// Model served when the client names none
    pub fn default_model(&self) -> Option<&str> {
        self.config.default_model.as_deref()
    }

    /// Re-validate every configured key and swap in the new valid set
    pub async fn refresh_valid_keys(&self) -> KeyRefreshReport {
        let Some(probe) = self.dialect.key_probe() else {
            debug!(vendor = %self.name(), dialect = %self.dialect, "Dialect has no key probe; primary key is used as-is");
            return KeyRefreshReport::default();
        };

        info!(vendor = %self.name(), dialect = %self.dialect, keys = self.candidates.len(), "Refreshing valid keys");

        let probes = self.candidates.iter().map(|key| async move {
            let outcome = self.validator.validate(probe, &self.base_url, key).await;
            (key, outcome)
        });

        let mut report = KeyRefreshReport {
            checked: self.candidates.len(),
            ..KeyRefreshReport::default()
        };
        let mut valid = Vec::with_capacity(self.candidates.len());

        for (key, outcome) in join_all(probes).await {
            match outcome {
                Ok(true) => {
                    debug!(vendor = %self.name(), key = %key.masked(), "Valid API key found");
                    valid.push(key.clone());
                }
                Ok(false) => {
                    warn!(vendor = %self.name(), key = %key.masked(), "Invalid API key detected");
                }
                Err(e) => {
                    report.errors += 1;
                    error!(vendor = %self.name(), key = %key.masked(), error = %e, "Error checking API key");
                }
            }
        }

        report.valid = valid.len();
        *self.valid_keys.write() = valid;

        info!(
            vendor = %self.name(),
            valid_keys = report.valid,
            total_keys = report.checked,
            "Completed refreshing valid keys"
        );
        report
    }

    /// Credential for the next outbound request.
    ///
    /// Without a key pool the primary key is always used. With a pool, a
    /// random member of the valid set is chosen; if nothing is currently
    /// valid the primary key is used anyway.
    pub fn get_key(&self) -> ApiKey {
        if !self.config.has_key_pool() || !self.dialect.rotates_key_pool() {
            return self.config.key.clone();
        }

        let valid = self.valid_keys.read();
        if valid.is_empty() {
            warn!(vendor = %self.name(), key = %self.config.key.masked(), "No valid keys available, using primary key");
            return self.config.key.clone();
        }

        let index = self.rng.lock().gen_range(0..valid.len());
        let key = valid[index].clone();
        debug!(vendor = %self.name(), key = %key.masked(), valid_key_count = valid.len(), "Selected valid key");
        key
    }

    /// Current credential counts
    pub fn key_stats(&self) -> KeyStats {
        KeyStats {
            configured: self.candidates.len(),
            valid: self.valid_keys.read().len(),
        }
    }

    /// The vendor's model list, served from cache while fresh
    pub async fn models(&self) -> Result<Arc<ModelsResponse>, GatewayError> {
        if let Some(models) = self.cached_models() {
            return Ok(models);
        }

        let models = Arc::new(self.fetch_models().await?);
        let expires_at = Instant::now() + self.options.model_cache_ttl;
        *self.models_cache.write() = Some(CachedModels {
            models: Arc::clone(&models),
            expires_at,
        });

        debug!(vendor = %self.name(), ttl = ?self.options.model_cache_ttl, "Cached models list");
        Ok(models)
    }

    fn cached_models(&self) -> Option<Arc<ModelsResponse>> {
        let cache = self.models_cache.read();
        let entry = cache.as_ref()?;
        let now = Instant::now();
        if now >= entry.expires_at {
            return None;
        }

        debug!(
            vendor = %self.name(),
            model_count = entry.models.len(),
            expires_in = ?entry.expires_at.saturating_duration_since(now),
            "Retrieved models list from cache"
        );
        Some(Arc::clone(&entry.models))
    }

    async fn fetch_models(&self) -> Result<ModelsResponse, GatewayError> {
        let url = format!("{}{MODELS_PATH}", self.base_url);
        let key = self.get_key();
        info!(vendor = %self.name(), url = %url, dialect = %self.dialect, "Fetching models list");

        let response = self
            .client
            .get(&url)
            .bearer_auth(key.expose())
            .timeout(self.options.request_timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GatewayError::timeout("models request", self.options.request_timeout)
                } else {
                    GatewayError::vendor(self.name(), format!("models request failed: {e}"), None)
                }
            })?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| GatewayError::vendor(self.name(), format!("failed to read models response: {e}"), None))?;

        if status != reqwest::StatusCode::OK {
            debug!(vendor = %self.name(), status = %status, response = %String::from_utf8_lossy(&body), "Models request failed");
            return Err(GatewayError::vendor(
                self.name(),
                format!("models request failed with status {status}"),
                Some(status.as_u16()),
            ));
        }

        let mut models: ModelsResponse = serde_json::from_slice(&body)
            .map_err(|e| GatewayError::vendor(self.name(), format!("failed to parse models response: {e}"), None))?;

        if self.dialect.filters_free_models() {
            let original = models.len();
            models.retain_free();
            info!(vendor = %self.name(), original_count = original, filtered_count = models.len(), "Filtered models to zero-priced entries");
        }

        info!(vendor = %self.name(), model_count = models.len(), "Fetched models list");
        Ok(models)
    }

    /// Start the periodic key re-validation loop.
    ///
    /// The first cycle runs one interval after the call; construction
    /// already validated once.
    pub fn spawn_key_refresh(self: &Arc<Self>, mut token: ShutdownToken) -> JoinHandle<()> {
        let vendor = Arc::clone(self);
        let period = self.options.key_refresh_interval;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!(vendor = %vendor.name(), interval = ?period, "Started periodic key check");

            loop {
                tokio::select! {
                    () = token.cancelled() => break,
                    _ = ticker.tick() => {
                        vendor.refresh_valid_keys().await;
                    }
                }
            }

            debug!(vendor = %vendor.name(), "Periodic key check stopped");
        })
    }

    /// Build the reverse proxy that forwards to this vendor
    pub fn reverse_proxy(self: &Arc<Self>, client: Client) -> Result<VendorProxy, GatewayError> {
        let keys: Arc<dyn KeySource> = Arc::clone(self) as Arc<dyn KeySource>;
        let proxy = VendorProxy::new(
            self.name(),
            self.target.clone(),
            self.config.path.clone(),
            Some(keys),
            client,
        );
        info!(vendor = %self.name(), target_host = %self.target.host_str().unwrap_or_default(), "Reverse proxy created");
        Ok(proxy)
    }
}

impl KeySource for Vendor {
    fn vendor_name(&self) -> &str {
        self.name()
    }

    fn select_key(&self) -> ApiKey {
        self.get_key()
    }
}

/// Parse a vendor host into an absolute http(s) URL
pub fn parse_host(vendor: &str, host: &str) -> Result<Url, GatewayError> {
    let url = Url::parse(host)
        .map_err(|e| GatewayError::configuration(format!("vendor {vendor}: failed to parse host {host:?}: {e}")))?;

    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(GatewayError::configuration(format!(
            "vendor {vendor}: host {host:?} is not an absolute http(s) URL"
        )));
    }

    Ok(url)
}
