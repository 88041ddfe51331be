//! # Gateway Server
//!
//! HTTP front door for the vendor gateway.
//!
//! This crate provides:
//! - Axum-based HTTP server with graceful shutdown
//! - OpenAI-compatible endpoints forwarded to the selected vendor
//! - Model listing with a static fallback
//! - Generative-language pass-through
//! - Health, metrics and admin endpoints

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod extractors;
pub mod fallback;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod shutdown;
pub mod state;

// Re-export main types
pub use error::ApiError;
pub use extractors::{ClientIp, RequestId, VendorHeader, VENDOR_HEADER};
pub use fallback::static_models;
pub use routes::create_router;
pub use server::{Server, ServerConfig};
pub use shutdown::shutdown_signal;
pub use state::{AppState, AppStateBuilder};
