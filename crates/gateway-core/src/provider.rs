//! Vendor dialects.
//!
//! Backends speak slightly different variants of the OpenAI API. The dialect
//! decides how keys are probed, whether the key pool is rotated, and whether
//! model listings are filtered. It is derived from the vendor host unless the
//! configuration names one explicitly.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Host marker for the balance-checking dialect
pub const BALANCE_HOST_MARKER: &str = "siliconflow";

/// Host marker for the listing-only aggregator dialect
pub const LISTING_HOST_MARKER: &str = "openrouter";

/// API dialect of a vendor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VendorDialect {
    /// Generic OpenAI-style API; keys are probed with `GET /v1/models`
    ListModels,
    /// Keys are probed through an account balance endpoint
    CheckBalance,
    /// Pricing-aware aggregator; keys are never probed
    CheckByListing,
}

/// How a key is checked for liveness
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyProbe {
    /// `GET {host}/v1/models`, HTTP 200 means valid
    ListModels,
    /// `GET {host}/v1/user/info`, account must be normal with positive balance
    Balance,
}

impl VendorDialect {
    /// Classify a vendor by its host string
    #[must_use]
    pub fn detect(host: &str) -> Self {
        let host = host.to_ascii_lowercase();
        if host.contains(BALANCE_HOST_MARKER) {
            Self::CheckBalance
        } else if host.contains(LISTING_HOST_MARKER) {
            Self::CheckByListing
        } else {
            Self::ListModels
        }
    }

    /// Dialect to use: the explicit one when configured, otherwise detected
    #[must_use]
    pub fn resolve(explicit: Option<Self>, host: &str) -> Self {
        explicit.unwrap_or_else(|| Self::detect(host))
    }

    /// Liveness probe for keys, if the dialect has one
    #[must_use]
    pub fn key_probe(self) -> Option<KeyProbe> {
        match self {
            Self::ListModels => Some(KeyProbe::ListModels),
            Self::CheckBalance => Some(KeyProbe::Balance),
            Self::CheckByListing => None,
        }
    }

    /// Whether the additional key pool takes part in key selection
    #[must_use]
    pub fn rotates_key_pool(self) -> bool {
        self.key_probe().is_some()
    }

    /// Whether model listings keep only zero-priced models
    #[must_use]
    pub fn filters_free_models(self) -> bool {
        matches!(self, Self::CheckByListing)
    }

    /// Stable name used in logs and admin output
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ListModels => "list_models",
            Self::CheckBalance => "check_balance",
            Self::CheckByListing => "check_by_listing",
        }
    }
}

impl fmt::Display for VendorDialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
