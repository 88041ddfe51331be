//! Reverse proxy bound to a single upstream host.
//!
//! Requests are forwarded with their method, headers, query and body intact
//! apart from the rewrite steps below. Response bodies are streamed back
//! without buffering or decompression.

use crate::vendor::KeySource;
use axum::body::Body;
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use gateway_core::GatewayError;
use http::header::{self, HeaderMap, HeaderName, HeaderValue};
use http::request::Parts;
use http::{StatusCode, Uri};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};
use url::Url;

const CHAT_COMPLETIONS_SUFFIX: &str = "/chat/completions";

/// Headers that describe a single connection and must not be forwarded
static HOP_BY_HOP: [HeaderName; 8] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

/// Build the HTTP client shared by all proxies.
///
/// Redirects are returned to the caller and compressed bodies pass through
/// untouched. `idle_timeout` bounds each read from the upstream, so a stalled
/// vendor fails while a stream that keeps producing data runs to completion.
pub fn proxy_client(connect_timeout: Duration, idle_timeout: Duration) -> Result<Client, GatewayError> {
    Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .no_gzip()
        .connect_timeout(connect_timeout)
        .read_timeout(idle_timeout)
        .pool_max_idle_per_host(100)
        .build()
        .map_err(|e| GatewayError::internal(format!("Failed to create HTTP client: {e}")))
}

/// Cheaply clonable handle to a reverse proxy
#[derive(Clone)]
pub struct VendorProxy {
    inner: Arc<ProxyInner>,
}

struct ProxyInner {
    vendor: String,
    target: Url,
    path_prefix: Option<String>,
    keys: Option<Arc<dyn KeySource>>,
    client: Client,
}

impl std::fmt::Debug for VendorProxy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VendorProxy")
            .field("vendor", &self.inner.vendor)
            .field("target", &self.inner.target.as_str())
            .field("path_prefix", &self.inner.path_prefix)
            .field("injects_keys", &self.inner.keys.is_some())
            .finish()
    }
}

impl VendorProxy {
    /// Create a proxy.
    ///
    /// `keys` supplies credentials for requests that arrive without one;
    /// `None` forwards the client's Authorization header untouched.
    pub fn new(
        vendor: impl Into<String>,
        target: Url,
        path_prefix: Option<String>,
        keys: Option<Arc<dyn KeySource>>,
        client: Client,
    ) -> Self {
        let path_prefix = path_prefix
            .map(|p| p.trim().trim_end_matches('/').to_string())
            .filter(|p| !p.is_empty())
            .map(|p| if p.starts_with('/') { p } else { format!("/{p}") });

        Self {
            inner: Arc::new(ProxyInner {
                vendor: vendor.into(),
                target,
                path_prefix,
                keys,
                client,
            }),
        }
    }

    /// Vendor this proxy forwards to
    pub fn vendor(&self) -> &str {
        &self.inner.vendor
    }

    /// Upstream base URL
    pub fn target(&self) -> &Url {
        &self.inner.target
    }

    /// Whether two handles refer to the same proxy instance
    pub fn same_instance(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Upstream URL for an inbound request URI
    pub fn upstream_url(&self, uri: &Uri) -> Url {
        let request_path = uri.path();
        let path = match &self.inner.path_prefix {
            Some(prefix) if request_path.ends_with(CHAT_COMPLETIONS_SUFFIX) => {
                format!("{prefix}{CHAT_COMPLETIONS_SUFFIX}")
            }
            Some(prefix) => format!("{prefix}{request_path}"),
            None => {
                let base = self.inner.target.path().trim_end_matches('/');
                format!("{base}{request_path}")
            }
        };

        let mut url = self.inner.target.clone();
        url.set_path(&path);
        url.set_query(uri.query());
        url
    }

    /// Apply the credential and host rewrite to outbound headers
    pub fn rewrite_headers(&self, headers: &mut HeaderMap) {
        strip_hop_by_hop(headers);
        headers.remove(header::CONTENT_LENGTH);

        if let Some(keys) = &self.inner.keys {
            let needs_key = headers
                .get(header::AUTHORIZATION)
                .map_or(true, |value| value.as_bytes().windows(4).any(|w| w == b"null"));

            if needs_key {
                let key = keys.select_key();
                match HeaderValue::from_str(&key.bearer()) {
                    Ok(mut value) => {
                        value.set_sensitive(true);
                        headers.insert(header::AUTHORIZATION, value);
                        info!(vendor = %keys.vendor_name(), key = %key.masked(), "Using vendor API key for request");
                    }
                    Err(_) => {
                        error!(vendor = %keys.vendor_name(), key = %key.masked(), "Vendor key is not a valid header value");
                    }
                }
            } else {
                debug!(vendor = %self.inner.vendor, "Using provided authorization header");
            }
        }

        if let Some(authority) = authority(&self.inner.target) {
            if let Ok(value) = HeaderValue::from_str(&authority) {
                headers.insert(header::HOST, value);
            }
        }
    }

    /// Forward a buffered request and stream the upstream response back
    pub async fn forward(&self, parts: Parts, body: Bytes) -> Response {
        let url = self.upstream_url(&parts.uri);
        let mut headers = parts.headers;
        self.rewrite_headers(&mut headers);

        debug!(
            vendor = %self.inner.vendor,
            method = %parts.method,
            path = %parts.uri.path(),
            upstream = %url,
            "Forwarding request"
        );

        let result = self
            .inner
            .client
            .request(parts.method.clone(), url)
            .headers(headers)
            .body(body)
            .send()
            .await;

        match result {
            Ok(upstream) => {
                debug!(
                    vendor = %self.inner.vendor,
                    status = upstream.status().as_u16(),
                    content_length = ?upstream.content_length(),
                    "Proxy response received"
                );
                stream_response(upstream)
            }
            Err(e) => {
                error!(
                    vendor = %self.inner.vendor,
                    path = %parts.uri.path(),
                    method = %parts.method,
                    error = %e,
                    "Proxy error occurred"
                );
                proxy_error_response(&e.to_string())
            }
        }
    }
}

fn stream_response(upstream: reqwest::Response) -> Response {
    let status = upstream.status();
    let mut headers = upstream.headers().clone();
    strip_hop_by_hop(&mut headers);

    let mut response = Response::new(Body::from_stream(upstream.bytes_stream()));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}

/// 502 response returned when the upstream cannot be reached
pub fn proxy_error_response(detail: &str) -> Response {
    let body = serde_json::json!({
        "error": {
            "message": format!("Proxy error: {detail}"),
            "type": "proxy_error",
        }
    });
    (StatusCode::BAD_GATEWAY, axum::Json(body)).into_response()
}

fn strip_hop_by_hop(headers: &mut HeaderMap) {
    // Headers named in Connection are connection-scoped too
    let named: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();

    for name in named.iter().chain(HOP_BY_HOP.iter()) {
        headers.remove(name);
    }
}

fn authority(url: &Url) -> Option<String> {
    let host = url.host_str()?;
    Some(match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    })
}
