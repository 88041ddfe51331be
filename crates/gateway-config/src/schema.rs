//! Configuration schema.

use crate::error::ConfigError;
use gateway_core::{ApiKey, VendorDialect};
use serde::Deserialize;
use std::time::Duration;
use validator::{Validate, ValidationError};

/// Name given to the synthesized default vendor
pub const DEFAULT_VENDOR_NAME: &str = "default";

/// Root gateway configuration
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct GatewayConfig {
    /// HTTP listener
    #[serde(default)]
    #[validate(nested)]
    pub server: ServerConfig,

    /// Log output
    #[serde(default)]
    pub logging: LoggingSettings,

    /// Backend vendors, in configuration order
    #[serde(default, alias = "VENDORS")]
    #[validate(nested)]
    pub vendors: Vec<VendorConfig>,

    /// Model routing rules, evaluated in configuration order
    #[serde(default, alias = "MODELS")]
    #[validate(nested)]
    pub models: Vec<ModelRuleConfig>,

    /// Vendor used when no header or rule selects one
    #[serde(default, alias = "DEFAULT_VENDOR")]
    pub default_vendor: String,

    /// Endpoint backing the synthesized default vendor
    #[serde(default)]
    pub default_endpoint: DefaultEndpointConfig,

    /// Key validation and model cache timings
    #[serde(default)]
    #[validate(nested)]
    pub health: HealthSettings,

    /// Static pass-through targets
    #[serde(default)]
    pub passthrough: PassthroughConfig,
}

impl GatewayConfig {
    /// Descriptor of the terminal fallback vendor
    #[must_use]
    pub fn default_vendor_descriptor(&self) -> VendorConfig {
        VendorConfig::new(
            DEFAULT_VENDOR_NAME,
            self.default_endpoint.host.clone(),
            self.default_endpoint.key.clone(),
        )
    }

    /// Find a configured vendor by name
    #[must_use]
    pub fn vendor(&self, name: &str) -> Option<&VendorConfig> {
        self.vendors.iter().find(|v| v.name == name)
    }

    /// Fill empty keys from the environment variables named by `key_env`
    pub fn resolve_secrets<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        for vendor in &mut self.vendors {
            if vendor.key.is_empty() {
                if let Some(value) = vendor.key_env.as_deref().and_then(&lookup) {
                    vendor.key = ApiKey::new(value);
                }
            }
        }

        if self.default_endpoint.key.is_empty() {
            if let Some(value) = lookup(&self.default_endpoint.key_env) {
                self.default_endpoint.key = ApiKey::new(value);
            }
        }
    }
}

/// HTTP listener configuration
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ServerConfig {
    /// Bind address
    #[serde(default = "default_host")]
    pub host: String,

    /// Bind port
    #[serde(default = "default_port")]
    #[validate(range(min = 1))]
    pub port: u16,

    /// Largest request body the front door will buffer
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,

    /// Longest an upstream may stay silent before the proxy gives up with a 502
    #[serde(with = "humantime_serde", default = "default_upstream_idle_timeout")]
    #[validate(custom(function = "non_zero_duration"))]
    pub upstream_idle_timeout: Duration,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_max_body_bytes() -> usize {
    32 * 1024 * 1024
}

fn default_upstream_idle_timeout() -> Duration {
    Duration::from_secs(5 * 60)
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_body_bytes: default_max_body_bytes(),
            upstream_idle_timeout: default_upstream_idle_timeout(),
        }
    }
}

/// Log output settings
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    /// Default filter level; `RUST_LOG` takes precedence
    #[serde(default = "default_log_level")]
    pub level: String,

    /// "pretty" or "json"
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

/// A backend vendor
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct VendorConfig {
    /// Unique vendor name
    #[validate(length(min = 1))]
    pub name: String,

    /// Base URL, e.g. `https://api.openai.com`
    #[validate(length(min = 1))]
    pub host: String,

    /// Path prefix; overrides any path carried by `host`
    #[serde(default)]
    pub path: Option<String>,

    /// Primary key
    #[serde(default)]
    pub key: ApiKey,

    /// Environment variable holding the primary key when `key` is empty
    #[serde(default)]
    pub key_env: Option<String>,

    /// Additional keys rotated alongside the primary key
    #[serde(default)]
    pub keys: Vec<ApiKey>,

    /// Exclude this vendor from model listings
    #[serde(default, alias = "hideModels")]
    pub hide_models: bool,

    /// Model served when a client does not name one
    #[serde(default, alias = "defaultModel")]
    pub default_model: Option<String>,

    /// Explicit dialect; detected from `host` when absent
    #[serde(default)]
    pub dialect: Option<VendorDialect>,
}

impl VendorConfig {
    /// Create a vendor descriptor
    #[must_use]
    pub fn new(name: impl Into<String>, host: impl Into<String>, key: impl Into<ApiKey>) -> Self {
        Self {
            name: name.into(),
            host: host.into(),
            path: None,
            key: key.into(),
            key_env: None,
            keys: Vec::new(),
            hide_models: false,
            default_model: None,
            dialect: None,
        }
    }

    /// Set the additional key pool
    #[must_use]
    pub fn with_keys<I, K>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<ApiKey>,
    {
        self.keys = keys.into_iter().map(Into::into).collect();
        self
    }

    /// Set the path prefix
    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Hide this vendor's models from listings
    #[must_use]
    pub fn with_hide_models(mut self, hide: bool) -> Self {
        self.hide_models = hide;
        self
    }

    /// Set the default model
    #[must_use]
    pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = Some(model.into());
        self
    }

    /// Force a dialect
    #[must_use]
    pub fn with_dialect(mut self, dialect: VendorDialect) -> Self {
        self.dialect = Some(dialect);
        self
    }

    /// Effective dialect
    #[must_use]
    pub fn resolved_dialect(&self) -> VendorDialect {
        VendorDialect::resolve(self.dialect, &self.host)
    }

    /// Whether an additional key pool is configured
    #[must_use]
    pub fn has_key_pool(&self) -> bool {
        !self.keys.is_empty()
    }

    /// Primary key followed by pool keys, skipping empty entries and duplicates
    #[must_use]
    pub fn candidate_keys(&self) -> Vec<ApiKey> {
        let mut keys: Vec<ApiKey> = Vec::with_capacity(self.keys.len() + 1);
        for key in std::iter::once(&self.key).chain(self.keys.iter()) {
            if !key.is_empty() && !keys.contains(key) {
                keys.push(key.clone());
            }
        }
        keys
    }
}

/// A model routing rule
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ModelRuleConfig {
    /// Model name; also listed in the static fallback model list
    #[validate(length(min = 1))]
    pub name: String,

    /// Regular expression over requested model names
    #[serde(default, alias = "regex")]
    pub pattern: Option<String>,

    /// Vendor serving matching models
    #[validate(length(min = 1))]
    pub vendor: String,
}

impl ModelRuleConfig {
    /// Create a rule
    #[must_use]
    pub fn new(name: impl Into<String>, pattern: impl Into<String>, vendor: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pattern: Some(pattern.into()),
            vendor: vendor.into(),
        }
    }

    /// Create a rule matching exactly one model name
    #[must_use]
    pub fn exact(name: impl Into<String>, vendor: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pattern: None,
            vendor: vendor.into(),
        }
    }

    /// Pattern source; rules without a pattern match their name exactly
    #[must_use]
    pub fn pattern_source(&self) -> String {
        match &self.pattern {
            Some(pattern) if !pattern.is_empty() => pattern.clone(),
            _ => format!("^{}$", regex::escape(&self.name)),
        }
    }
}

/// Endpoint behind the synthesized default vendor
#[derive(Debug, Clone, Deserialize)]
pub struct DefaultEndpointConfig {
    /// Base URL
    #[serde(default = "default_endpoint_host")]
    pub host: String,

    /// Key; read from `key_env` when empty
    #[serde(default)]
    pub key: ApiKey,

    /// Environment variable holding the key
    #[serde(default = "default_endpoint_key_env")]
    pub key_env: String,
}

fn default_endpoint_host() -> String {
    "https://api.openai.com".to_string()
}

fn default_endpoint_key_env() -> String {
    "OPENAI_KEY".to_string()
}

impl Default for DefaultEndpointConfig {
    fn default() -> Self {
        Self {
            host: default_endpoint_host(),
            key: ApiKey::default(),
            key_env: default_endpoint_key_env(),
        }
    }
}

/// Key validation and model cache timings
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct HealthSettings {
    /// Probe keys at all; when false every configured key is trusted
    #[serde(default = "default_true")]
    pub validate_keys: bool,

    /// Ceiling for a single key probe
    #[serde(with = "humantime_serde", default = "default_ten_seconds")]
    #[validate(custom(function = "non_zero_duration"))]
    pub validation_timeout: Duration,

    /// Per-vendor key re-validation period
    #[serde(with = "humantime_serde", default = "default_key_refresh_interval")]
    #[validate(custom(function = "non_zero_duration"))]
    pub key_refresh_interval: Duration,

    /// Registry-wide key re-validation period
    #[serde(with = "humantime_serde", default = "default_manager_refresh_interval")]
    #[validate(custom(function = "non_zero_duration"))]
    pub manager_refresh_interval: Duration,

    /// Lifetime of a cached model list
    #[serde(with = "humantime_serde", default = "default_model_cache_ttl")]
    pub model_cache_ttl: Duration,

    /// Ceiling for serving `/v1/models`
    #[serde(with = "humantime_serde", default = "default_ten_seconds")]
    #[validate(custom(function = "non_zero_duration"))]
    pub listing_timeout: Duration,
}

fn non_zero_duration(value: &Duration) -> Result<(), ValidationError> {
    if value.is_zero() {
        return Err(ValidationError::new("zero_duration").with_message("must be greater than zero".into()));
    }
    Ok(())
}

fn default_true() -> bool {
    true
}

fn default_ten_seconds() -> Duration {
    Duration::from_secs(10)
}

fn default_key_refresh_interval() -> Duration {
    Duration::from_secs(15 * 60)
}

fn default_manager_refresh_interval() -> Duration {
    Duration::from_secs(10 * 60)
}

fn default_model_cache_ttl() -> Duration {
    Duration::from_secs(60 * 60)
}

impl HealthSettings {
    /// Reject timings the refresh loops and probes cannot run with
    pub fn check(&self) -> Result<(), ConfigError> {
        self.validate().map_err(ConfigError::from)
    }
}

impl Default for HealthSettings {
    fn default() -> Self {
        Self {
            validate_keys: default_true(),
            validation_timeout: default_ten_seconds(),
            key_refresh_interval: default_key_refresh_interval(),
            manager_refresh_interval: default_manager_refresh_interval(),
            model_cache_ttl: default_model_cache_ttl(),
            listing_timeout: default_ten_seconds(),
        }
    }
}

/// Static pass-through targets
#[derive(Debug, Clone, Deserialize)]
pub struct PassthroughConfig {
    /// Generative-language API host for `/v1beta/models`
    #[serde(default = "default_gemini_host")]
    pub gemini_host: String,
}

fn default_gemini_host() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

impl Default for PassthroughConfig {
    fn default() -> Self {
        Self {
            gemini_host: default_gemini_host(),
        }
    }
}
