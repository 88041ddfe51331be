//! Configuration file loading.
//!
//! The path comes from `CONFIG_PATH` (default `/app/config`). Files ending
//! in `.toml` are parsed as TOML; everything else is parsed as YAML.
//! A handful of environment variables override file values after parsing.

use crate::error::ConfigError;
use crate::schema::GatewayConfig;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use validator::Validate;

/// Environment variable naming the configuration file
pub const CONFIG_PATH_ENV: &str = "CONFIG_PATH";

/// Configuration file used when `CONFIG_PATH` is unset
pub const DEFAULT_CONFIG_PATH: &str = "/app/config";

/// On-disk configuration format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// YAML document
    Yaml,
    /// TOML document
    Toml,
}

impl ConfigFormat {
    /// Pick the format from a file extension
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => Self::Toml,
            _ => Self::Yaml,
        }
    }
}

/// Load configuration from `CONFIG_PATH` or the default location
pub async fn load_config() -> Result<GatewayConfig, ConfigError> {
    let path = std::env::var(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));
    load_config_from(path).await
}

/// Load configuration from an explicit path, applying process environment overrides
pub async fn load_config_from(path: impl AsRef<Path>) -> Result<GatewayConfig, ConfigError> {
    let path = path.as_ref();
    debug!(path = %path.display(), "Loading configuration");

    let contents = match tokio::fs::read_to_string(path).await {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        Err(source) => {
            return Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    let mut config = parse_config(&contents, ConfigFormat::from_path(path))?;
    finalize(&mut config, |name| std::env::var(name).ok())?;

    info!(
        path = %path.display(),
        vendors = config.vendors.len(),
        rules = config.models.len(),
        default_vendor = %config.default_vendor,
        "Configuration loaded"
    );

    Ok(config)
}

/// Parse a configuration document without touching the environment
pub fn parse_config(contents: &str, format: ConfigFormat) -> Result<GatewayConfig, ConfigError> {
    let config: GatewayConfig = match format {
        ConfigFormat::Yaml => {
            if contents.trim().is_empty() {
                GatewayConfig::default()
            } else {
                serde_yaml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))?
            }
        }
        ConfigFormat::Toml => toml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))?,
    };

    config.validate()?;
    Ok(config)
}

/// Apply environment overrides and secret resolution, then validate
pub fn finalize<F>(config: &mut GatewayConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    apply_env_overrides(config, &lookup)?;
    config.resolve_secrets(&lookup);
    config.validate()?;
    Ok(())
}

fn apply_env_overrides<F>(config: &mut GatewayConfig, lookup: &F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(host) = lookup("GATEWAY_HOST") {
        config.server.host = host;
    }
    if let Some(port) = lookup("GATEWAY_PORT") {
        config.server.port = port
            .parse()
            .map_err(|_| ConfigError::Validation(format!("GATEWAY_PORT is not a valid port: {port}")))?;
    }
    if let Some(vendor) = lookup("DEFAULT_VENDOR") {
        config.default_vendor = vendor;
    }
    if let Some(level) = lookup("LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Some(format) = lookup("LOG_FORMAT") {
        config.logging.format = format;
    }
    Ok(())
}

/// An entry that loads but will be skipped or cannot work as written
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigWarning {
    /// Vendor host is not an http(s) URL; the vendor is skipped
    UnusableHost {
        /// Vendor name
        vendor: String,
        /// Host as configured
        host: String,
    },
    /// Vendor has neither a primary key nor a key pool
    MissingKey {
        /// Vendor name
        vendor: String,
    },
    /// Routing rule targets a vendor that is not configured
    UnknownRuleVendor {
        /// Rule name
        model: String,
        /// Vendor the rule names
        vendor: String,
    },
    /// Default vendor name is not configured; the default endpoint serves instead
    UnknownDefaultVendor {
        /// Configured default vendor
        vendor: String,
    },
}

impl fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnusableHost { vendor, host } => {
                write!(f, "vendor {vendor}: host {host:?} is not an http(s) URL; vendor will be skipped")
            }
            Self::MissingKey { vendor } => write!(f, "vendor {vendor}: no API key configured"),
            Self::UnknownRuleVendor { model, vendor } => {
                write!(f, "rule {model}: names unknown vendor {vendor}")
            }
            Self::UnknownDefaultVendor { vendor } => write!(
                f,
                "default vendor {vendor} is not configured; the default endpoint will serve instead"
            ),
        }
    }
}

/// Entries worth reporting to the operator once logging is up
#[must_use]
pub fn config_warnings(config: &GatewayConfig) -> Vec<ConfigWarning> {
    let mut warnings = Vec::new();

    for vendor in &config.vendors {
        match url::Url::parse(&vendor.host) {
            Ok(url) if matches!(url.scheme(), "http" | "https") && url.host_str().is_some() => {}
            _ => warnings.push(ConfigWarning::UnusableHost {
                vendor: vendor.name.clone(),
                host: vendor.host.clone(),
            }),
        }
        if vendor.key.is_empty() && vendor.candidate_keys().is_empty() {
            warnings.push(ConfigWarning::MissingKey {
                vendor: vendor.name.clone(),
            });
        }
    }

    for rule in &config.models {
        if config.vendor(&rule.vendor).is_none() {
            warnings.push(ConfigWarning::UnknownRuleVendor {
                model: rule.name.clone(),
                vendor: rule.vendor.clone(),
            });
        }
    }

    if !config.default_vendor.is_empty() && config.vendor(&config.default_vendor).is_none() {
        warnings.push(ConfigWarning::UnknownDefaultVendor {
            vendor: config.default_vendor.clone(),
        });
    }

    warnings
}

/// Log every entry returned by [`config_warnings`]
pub fn report_config_warnings(config: &GatewayConfig) {
    for warning in config_warnings(config) {
        warn!(%warning, "Suspicious configuration entry");
    }
}
