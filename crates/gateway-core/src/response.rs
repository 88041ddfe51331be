//! Model listing types (OpenAI compatible).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Response of `GET /v1/models`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelsResponse {
    /// Always "list"
    #[serde(default = "list_object")]
    pub object: String,
    /// Model entries
    #[serde(default)]
    pub data: Vec<ModelObject>,
}

fn list_object() -> String {
    "list".to_string()
}

impl ModelsResponse {
    /// Create a listing from model entries
    #[must_use]
    pub fn new(data: Vec<ModelObject>) -> Self {
        Self {
            object: list_object(),
            data,
        }
    }

    /// Empty listing
    #[must_use]
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Number of models
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the listing has no models
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Keep only models whose prompt and completion prices are both zero
    pub fn retain_free(&mut self) {
        self.data.retain(ModelObject::is_free);
    }
}

/// A single model entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelObject {
    /// Model identifier
    pub id: String,
    /// Always "model"
    #[serde(default = "model_object")]
    pub object: String,
    /// Creation timestamp (unix seconds)
    #[serde(default)]
    pub created: i64,
    /// Owning organization
    #[serde(default)]
    pub owned_by: String,
    /// Display name (aggregator APIs)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Description (aggregator APIs)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Unit prices (aggregator APIs)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pricing: Option<ModelPricing>,
    /// Any other vendor-specific fields, passed through untouched
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn model_object() -> String {
    "model".to_string()
}

impl ModelObject {
    /// Create a model entry
    #[must_use]
    pub fn new(id: impl Into<String>, owned_by: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            object: model_object(),
            created: 0,
            owned_by: owned_by.into(),
            name: None,
            description: None,
            pricing: None,
            extra: Map::new(),
        }
    }

    /// Set the creation timestamp
    #[must_use]
    pub fn with_created(mut self, created: i64) -> Self {
        self.created = created;
        self
    }

    /// Set pricing
    #[must_use]
    pub fn with_pricing(mut self, pricing: ModelPricing) -> Self {
        self.pricing = Some(pricing);
        self
    }

    /// Whether both unit prices are present and exactly zero
    #[must_use]
    pub fn is_free(&self) -> bool {
        self.pricing.as_ref().is_some_and(ModelPricing::is_free)
    }
}

/// Unit prices as reported by pricing-aware aggregators.
///
/// Prices arrive either as JSON numbers or as decimal strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelPricing {
    /// Price per prompt token
    #[serde(default)]
    pub prompt: Value,
    /// Price per completion token
    #[serde(default)]
    pub completion: Value,
    /// Other price components
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ModelPricing {
    /// Create pricing from prompt and completion prices
    #[must_use]
    pub fn new(prompt: impl Into<Value>, completion: impl Into<Value>) -> Self {
        Self {
            prompt: prompt.into(),
            completion: completion.into(),
            extra: Map::new(),
        }
    }

    /// Parsed prompt price
    #[must_use]
    pub fn prompt_price(&self) -> Option<f64> {
        unit_price(&self.prompt)
    }

    /// Parsed completion price
    #[must_use]
    pub fn completion_price(&self) -> Option<f64> {
        unit_price(&self.completion)
    }

    /// Missing or unparsable prices count as non-zero.
    #[must_use]
    pub fn is_free(&self) -> bool {
        self.prompt_price() == Some(0.0) && self.completion_price() == Some(0.0)
    }
}

fn unit_price(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}
