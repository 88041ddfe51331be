//! Error types for the gateway.

use std::time::Duration;

/// Result alias used across the gateway crates
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Gateway error type
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// A configured entry (vendor host, rule pattern, ...) is unusable
    #[error("Configuration error: {message}")]
    Configuration {
        /// Error description
        message: String,
    },

    /// An upstream vendor call failed
    #[error("Vendor '{vendor}' error: {message}")]
    Vendor {
        /// Vendor name
        vendor: String,
        /// Error description
        message: String,
        /// Upstream HTTP status, when one was received
        status: Option<u16>,
    },

    /// An operation exceeded its deadline
    #[error("{operation} timed out after {timeout:?}")]
    Timeout {
        /// Operation that timed out
        operation: String,
        /// Deadline that was exceeded
        timeout: Duration,
    },

    /// The inbound request could not be understood
    #[error("Invalid request: {message}")]
    InvalidRequest {
        /// Error description
        message: String,
    },

    /// Unexpected internal failure
    #[error("Internal error: {message}")]
    Internal {
        /// Error description
        message: String,
    },
}

impl GatewayError {
    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a vendor error
    pub fn vendor(vendor: impl Into<String>, message: impl Into<String>, status: Option<u16>) -> Self {
        Self::Vendor {
            vendor: vendor.into(),
            message: message.into(),
            status,
        }
    }

    /// Create a timeout error
    pub fn timeout(operation: impl Into<String>, timeout: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            timeout,
        }
    }

    /// Create an invalid request error
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// HTTP status code to report for this error
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidRequest { .. } => 400,
            Self::Vendor { .. } => 502,
            Self::Timeout { .. } => 504,
            Self::Configuration { .. } | Self::Internal { .. } => 500,
        }
    }

    /// OpenAI-style error type string
    #[must_use]
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::InvalidRequest { .. } => "invalid_request_error",
            Self::Vendor { .. } => "upstream_error",
            Self::Timeout { .. } => "timeout_error",
            Self::Configuration { .. } | Self::Internal { .. } => "server_error",
        }
    }
}
