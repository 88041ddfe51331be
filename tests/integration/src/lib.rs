//! Integration tests for the vendor gateway
//!
//! Each test starts real wiremock vendors and a gateway on an ephemeral
//! port, then drives it over HTTP:
//! - Model-based and header-based routing
//! - Key validation and rotation per vendor dialect
//! - Model listing, caching and fallback
//! - Configuration loading and lifecycle

pub mod fixtures;
pub mod helpers;
pub mod mock_providers;

// Re-export commonly used items
pub use fixtures::*;
pub use helpers::*;
pub use mock_providers::*;

#[cfg(test)]
mod config_tests;
#[cfg(test)]
mod key_tests;
#[cfg(test)]
mod lifecycle_tests;
#[cfg(test)]
mod routing_tests;
