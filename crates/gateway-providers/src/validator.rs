//! API key validation.
//!
//! Each vendor dialect probes keys differently: the OpenAI-style dialect
//! lists models, the balance dialect reads the account's user info. A probe
//! answers `Ok(true)`/`Ok(false)` for a definite verdict and `Err` when the
//! verdict could not be established (network failure, malformed reply).

use async_trait::async_trait;
use gateway_core::{ApiKey, KeyProbe};
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashSet;
use std::time::Duration;
use tracing::debug;

/// Ceiling for a single probe
pub const DEFAULT_VALIDATION_TIMEOUT: Duration = Duration::from_secs(10);

/// Path of the model-listing probe, relative to the vendor host
pub const MODELS_PATH: &str = "/v1/models";

/// Path of the balance probe, relative to the vendor host
pub const BALANCE_PATH: &str = "/v1/user/info";

/// Why a key's validity could not be established
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    /// The probe request failed before a response arrived
    #[error("probe request failed: {0}")]
    Transport(String),

    /// The probe exceeded its time budget
    #[error("probe timed out after {0:?}")]
    Timeout(Duration),

    /// The response body was not the expected JSON envelope
    #[error("malformed probe response: {0}")]
    MalformedResponse(String),

    /// The account balance could not be parsed as a decimal
    #[error("unparsable account balance: {0:?}")]
    InvalidBalance(String),
}

/// Validates vendor credentials
#[async_trait]
pub trait KeyValidator: Send + Sync {
    /// Probe `key` against the vendor at `base_url`
    async fn validate(&self, probe: KeyProbe, base_url: &str, key: &ApiKey) -> Result<bool, ValidationError>;
}

/// Validator that probes the vendor over HTTP
#[derive(Debug, Clone)]
pub struct HttpKeyValidator {
    client: Client,
    timeout: Duration,
}

impl HttpKeyValidator {
    /// Create a validator with the given probe ceiling
    #[must_use]
    pub fn new(client: Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    fn endpoint(base_url: &str, path: &str) -> String {
        format!("{}{path}", base_url.trim_end_matches('/'))
    }

    async fn get(&self, url: &str, key: &ApiKey) -> Result<reqwest::Response, ValidationError> {
        self.client
            .get(url)
            .bearer_auth(key.expose())
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ValidationError::Timeout(self.timeout)
                } else {
                    ValidationError::Transport(e.to_string())
                }
            })
    }

    async fn check_listing(&self, base_url: &str, key: &ApiKey) -> Result<bool, ValidationError> {
        let url = Self::endpoint(base_url, MODELS_PATH);
        let response = self.get(&url, key).await?;
        let status = response.status();

        if status == reqwest::StatusCode::OK {
            return Ok(true);
        }

        let body = response.text().await.unwrap_or_default();
        debug!(url = %url, status = %status, body = %body, key = %key.masked(), "Key rejected by model listing");
        Ok(false)
    }

    async fn check_balance(&self, base_url: &str, key: &ApiKey) -> Result<bool, ValidationError> {
        let url = Self::endpoint(base_url, BALANCE_PATH);
        let response = self.get(&url, key).await?;
        let status = response.status();

        if status != reqwest::StatusCode::OK {
            debug!(url = %url, status = %status, key = %key.masked(), "Key rejected by balance endpoint");
            return Ok(false);
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| ValidationError::Transport(e.to_string()))?;
        let info: UserInfoEnvelope =
            serde_json::from_slice(&body).map_err(|e| ValidationError::MalformedResponse(e.to_string()))?;

        info.verdict()
    }
}

#[async_trait]
impl KeyValidator for HttpKeyValidator {
    async fn validate(&self, probe: KeyProbe, base_url: &str, key: &ApiKey) -> Result<bool, ValidationError> {
        // Hard ceiling on top of the per-request timeout; covers body reads
        let probe_future = async {
            match probe {
                KeyProbe::ListModels => self.check_listing(base_url, key).await,
                KeyProbe::Balance => self.check_balance(base_url, key).await,
            }
        };

        tokio::time::timeout(self.timeout, probe_future)
            .await
            .map_err(|_| ValidationError::Timeout(self.timeout))?
    }
}

#[derive(Debug, Deserialize)]
struct UserInfoEnvelope {
    #[serde(default)]
    status: bool,
    #[serde(default)]
    data: UserInfoData,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserInfoData {
    #[serde(default)]
    status: String,
    #[serde(default)]
    total_balance: String,
}

impl UserInfoEnvelope {
    fn verdict(&self) -> Result<bool, ValidationError> {
        if !self.status || self.data.status != "normal" {
            debug!(account_status = %self.data.status, "Account is not in normal status");
            return Ok(false);
        }

        let balance: f64 = self
            .data
            .total_balance
            .trim()
            .parse()
            .map_err(|_| ValidationError::InvalidBalance(self.data.total_balance.clone()))?;

        if balance <= 0.0 {
            debug!(balance = %self.data.total_balance, "Account has insufficient balance");
            return Ok(false);
        }

        Ok(true)
    }
}

/// Validator with a fixed verdict, used when probing is disabled
#[derive(Debug, Clone, Default)]
pub struct FixedKeyValidator {
    accepted: Option<HashSet<String>>,
}

impl FixedKeyValidator {
    /// Accept every key
    #[must_use]
    pub fn accept_all() -> Self {
        Self { accepted: None }
    }

    /// Accept only the listed keys
    #[must_use]
    pub fn accepting<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            accepted: Some(keys.into_iter().map(Into::into).collect()),
        }
    }
}

#[async_trait]
impl KeyValidator for FixedKeyValidator {
    async fn validate(&self, _probe: KeyProbe, _base_url: &str, key: &ApiKey) -> Result<bool, ValidationError> {
        Ok(self
            .accepted
            .as_ref()
            .map_or(true, |accepted| accepted.contains(key.expose())))
    }
}
