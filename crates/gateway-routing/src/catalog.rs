//! Model catalog: single-vendor and aggregated model listings.

use crate::manager::VendorManager;
use futures::future::join_all;
use gateway_core::{GatewayError, ModelsResponse};
use std::collections::HashSet;
use std::time::Duration;
use tokio::time::{timeout_at, Instant};
use tracing::{info, warn};

/// Outcome of a model listing
#[derive(Debug, Clone, PartialEq)]
pub enum ModelListing {
    /// Models served by the vendor(s)
    Listed(ModelsResponse),
    /// No vendor could answer; the caller serves its static list
    Fallback,
}

impl ModelListing {
    /// Whether the static list should be served
    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback)
    }
}

/// List models for one vendor, or every visible vendor when `vendor` is empty.
///
/// The whole operation is bounded by `limit`.
pub async fn list_models(manager: &VendorManager, vendor: Option<&str>, limit: Duration) -> ModelListing {
    let deadline = Instant::now() + limit;
    match vendor.map(str::trim).filter(|v| !v.is_empty()) {
        Some(name) => list_vendor_models(manager, name, deadline).await,
        None => list_all_models(manager, deadline, limit).await,
    }
}

async fn list_vendor_models(manager: &VendorManager, name: &str, deadline: Instant) -> ModelListing {
    let vendor = manager.get_vendor(name);
    if vendor.should_hide_models() {
        info!(vendor = %name, "Vendor models are hidden");
        return ModelListing::Listed(ModelsResponse::empty());
    }

    match timeout_at(deadline, vendor.models()).await {
        Ok(Ok(models)) => ModelListing::Listed(models.as_ref().clone()),
        Ok(Err(e)) => {
            warn!(vendor = %name, error = %e, "Model listing failed; serving fallback list");
            ModelListing::Fallback
        }
        Err(_) => {
            warn!(vendor = %name, "Model listing timed out; serving fallback list");
            ModelListing::Fallback
        }
    }
}

async fn list_all_models(manager: &VendorManager, deadline: Instant, limit: Duration) -> ModelListing {
    let visible: Vec<_> = manager.vendors().filter(|v| !v.should_hide_models()).collect();

    let fetches = visible.iter().map(|vendor| async move {
        timeout_at(deadline, vendor.models())
            .await
            .unwrap_or_else(|_| Err(GatewayError::timeout("models request", limit)))
    });
    let results = join_all(fetches).await;

    let mut merged = Vec::new();
    let mut seen = HashSet::new();
    let mut succeeded = 0usize;

    // Results come back in configuration order, so the first vendor owns a shared id
    for (vendor, result) in visible.iter().zip(results) {
        match result {
            Ok(models) => {
                succeeded += 1;
                for model in &models.data {
                    if seen.insert(model.id.clone()) {
                        merged.push(model.clone());
                    }
                }
            }
            Err(e) => {
                warn!(vendor = %vendor.name(), error = %e, "Skipping vendor in aggregated model listing");
            }
        }
    }

    if succeeded == 0 && merged.is_empty() {
        warn!(vendors = visible.len(), "No vendor returned models; serving fallback list");
        return ModelListing::Fallback;
    }

    info!(vendors = succeeded, models = merged.len(), "Aggregated model listing");
    ModelListing::Listed(ModelsResponse::new(merged))
}
