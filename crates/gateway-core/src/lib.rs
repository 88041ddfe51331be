//! # Gateway Core
//!
//! Core types, errors, and lifecycle primitives for the vendor gateway.
//!
//! This crate provides the foundational types used throughout the gateway:
//! - Error types and handling
//! - Vendor dialects and their key-probe capabilities
//! - OpenAI-compatible model listing types
//! - Lightweight request peeks used by the HTTP front door
//! - Cancellation tokens for background tasks

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod lifecycle;
pub mod provider;
pub mod request;
pub mod response;
pub mod types;

// Re-export commonly used types
pub use error::{GatewayError, GatewayResult};
pub use lifecycle::{shutdown_channel, ShutdownToken, ShutdownTrigger};
pub use provider::{KeyProbe, VendorDialect};
pub use request::{ChatCompletionPeek, MessageContent, PeekMessage, ResponsesPeek};
pub use response::{ModelObject, ModelPricing, ModelsResponse};
pub use types::ApiKey;
