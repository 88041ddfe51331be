//! # Gateway Providers
//!
//! Backend vendors for the gateway.
//!
//! - [`Vendor`]: one configured backend with its credential pool, key
//!   re-validation loop and cached model list
//! - [`KeyValidator`]: per-dialect key probes (model listing, account balance)
//! - [`VendorProxy`]: reverse proxy that injects credentials and rewrites
//!   the target host and path

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod proxy;
pub mod validator;
pub mod vendor;

pub use proxy::{proxy_client, proxy_error_response, VendorProxy};
pub use validator::{
    FixedKeyValidator, HttpKeyValidator, KeyValidator, ValidationError, DEFAULT_VALIDATION_TIMEOUT,
};
pub use vendor::{
    parse_host, KeyRefreshReport, KeySource, KeyStats, SharedRng, Vendor, VendorOptions,
};
