//! # Gateway Telemetry
//!
//! Observability for the vendor gateway.
//!
//! This crate provides:
//! - Structured logging via `tracing-subscriber` (pretty or JSON)
//! - Prometheus metrics for forwarded requests, model listings and key health

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod logging;
pub mod metrics;

pub use logging::{init_logging, LogFormat, LoggingConfig, LoggingError};
pub use metrics::{outcome, Metrics, MetricsError};
