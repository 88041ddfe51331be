//! # Gateway Config
//!
//! Configuration for the vendor gateway.
//!
//! The configuration is read once at startup from a YAML or TOML file and
//! then treated as immutable. It describes:
//! - The HTTP listener and logging
//! - Vendor descriptors (host, keys, dialect, listing visibility)
//! - Ordered model-to-vendor routing rules
//! - The default vendor and the synthesized default endpoint
//! - Key health-check and model cache timings

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod schema;

pub use error::ConfigError;
pub use loader::{
    config_warnings, finalize, load_config, load_config_from, parse_config, report_config_warnings,
    ConfigFormat, ConfigWarning, CONFIG_PATH_ENV, DEFAULT_CONFIG_PATH,
};
pub use schema::{
    DefaultEndpointConfig, GatewayConfig, HealthSettings, LoggingSettings, ModelRuleConfig,
    PassthroughConfig, ServerConfig, VendorConfig, DEFAULT_VENDOR_NAME,
};
