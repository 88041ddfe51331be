//! Custom Axum extractors for the gateway.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
};

use crate::error::ApiError;

/// Header naming the vendor a request should be sent to
pub const VENDOR_HEADER: &str = "x-vendor";

/// Header carrying the request id
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Header set by Cloudflare with the client address
pub const CF_CONNECTING_IP: &str = "cf-connecting-ip";

/// Explicit vendor selection from the `x-vendor` header; empty means none
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VendorHeader(pub Option<String>);

impl VendorHeader {
    /// The requested vendor, if any
    pub fn as_deref(&self) -> Option<&str> {
        self.0.as_deref()
    }

    /// Read the header from a header map
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let vendor = header_str(headers, VENDOR_HEADER)
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(ToString::to_string);
        Self(vendor)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for VendorHeader
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_headers(&parts.headers))
    }
}

/// Extract request ID from headers or generate one
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for RequestId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(id) = parts.extensions.get::<Self>() {
            return Ok(id.clone());
        }

        let id = header_str(&parts.headers, REQUEST_ID_HEADER)
            .filter(|v| !v.is_empty())
            .map_or_else(|| uuid::Uuid::new_v4().to_string(), ToString::to_string);

        Ok(Self(id))
    }
}

/// Client address as reported by the edge proxy
#[derive(Debug, Clone, Default)]
pub struct ClientIp(pub Option<String>);

impl ClientIp {
    /// `CF-Connecting-IP`, else the first `X-Forwarded-For` hop
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let ip = header_str(headers, CF_CONNECTING_IP)
            .or_else(|| {
                header_str(headers, "x-forwarded-for")
                    .and_then(|v| v.split(',').next())
            })
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(ToString::to_string);
        Self(ip)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_headers(&parts.headers))
    }
}

/// User agent of the caller, empty when absent
pub fn user_agent(headers: &HeaderMap) -> &str {
    header_str(headers, header::USER_AGENT.as_str()).unwrap_or_default()
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}
