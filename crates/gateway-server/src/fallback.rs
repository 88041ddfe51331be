//! Static model list served when no vendor can answer.

use gateway_config::GatewayConfig;
use gateway_core::{ModelObject, ModelsResponse};

/// Creation timestamp reported for every static entry
pub const STATIC_MODEL_CREATED: i64 = 1_686_935_002;

/// Owner reported for every static entry
pub const STATIC_MODEL_OWNER: &str = "organization-owner";

/// One entry per configured model rule, in configuration order
pub fn static_models(config: &GatewayConfig) -> ModelsResponse {
    let data = config
        .models
        .iter()
        .map(|rule| ModelObject::new(rule.name.clone(), STATIC_MODEL_OWNER).with_created(STATIC_MODEL_CREATED))
        .collect();
    ModelsResponse::new(data)
}
