//! Mock upstream vendors backed by wiremock

use serde_json::{json, Value};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

/// Models path every OpenAI-compatible vendor serves
pub const MODELS_PATH: &str = "/v1/models";

/// Balance path probed for balance-checking vendors
pub const BALANCE_PATH: &str = "/v1/user/info";

/// Chat completions path
pub const CHAT_PATH: &str = "/v1/chat/completions";

/// A wiremock server posing as one vendor
pub struct MockVendor {
    /// Vendor name, echoed in chat responses
    pub name: String,
    /// Underlying mock server
    pub server: MockServer,
}

impl MockVendor {
    /// Start a vendor with no routes mounted
    pub async fn start(name: &str) -> Self {
        Self {
            name: name.to_string(),
            server: MockServer::start().await,
        }
    }

    /// Base URL of the vendor
    pub fn uri(&self) -> String {
        self.server.uri()
    }

    /// Answer chat completions with `{"vendor": name, "authorization": ...}`
    pub async fn with_chat_echo(self) -> Self {
        let name = self.name.clone();
        Mock::given(method("POST"))
            .and(path(CHAT_PATH))
            .respond_with(move |request: &Request| {
                let authorization = request
                    .headers
                    .get("authorization")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default()
                    .to_string();
                ResponseTemplate::new(200).set_body_json(json!({
                    "id": "chatcmpl-test",
                    "object": "chat.completion",
                    "vendor": name,
                    "authorization": authorization,
                }))
            })
            .mount(&self.server)
            .await;
        self
    }

    /// Serve a model listing to any key
    pub async fn with_models(self, ids: &[&str]) -> Self {
        let data: Vec<Value> = ids.iter().map(|id| model_entry(id, &self.name)).collect();
        Mock::given(method("GET"))
            .and(path(MODELS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(models_body(data)))
            .mount(&self.server)
            .await;
        self
    }

    /// Serve a priced catalog: `(id, free)` pairs
    pub async fn with_priced_models(self, models: &[(&str, bool)]) -> Self {
        let data: Vec<Value> = models
            .iter()
            .map(|(id, free)| {
                let price = if *free { "0" } else { "0.000002" };
                let mut entry = model_entry(id, &self.name);
                entry["pricing"] = json!({"prompt": price, "completion": price});
                entry
            })
            .collect();
        Mock::given(method("GET"))
            .and(path(MODELS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(models_body(data)))
            .mount(&self.server)
            .await;
        self
    }

    /// Answer the model listing with 200 only for the given keys, 401 otherwise
    pub async fn with_models_for_keys(self, keys: &[&str], ids: &[&str]) -> Self {
        let data: Vec<Value> = ids.iter().map(|id| model_entry(id, &self.name)).collect();
        for key in keys {
            Mock::given(method("GET"))
                .and(path(MODELS_PATH))
                .and(header("authorization", format!("Bearer {key}").as_str()))
                .respond_with(ResponseTemplate::new(200).set_body_json(models_body(data.clone())))
                .with_priority(1)
                .mount(&self.server)
                .await;
        }
        Mock::given(method("GET"))
            .and(path(MODELS_PATH))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({"error": "invalid key"})))
            .mount(&self.server)
            .await;
        self
    }

    /// Answer the balance endpoint for `key` with the given account state
    pub async fn with_balance(self, key: &str, status: &str, balance: &str) -> Self {
        Mock::given(method("GET"))
            .and(path(BALANCE_PATH))
            .and(header("authorization", format!("Bearer {key}").as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "code": 20000,
                "status": true,
                "data": {"status": status, "totalBalance": balance},
            })))
            .mount(&self.server)
            .await;
        self
    }

    /// Number of requests received on `request_path`
    pub async fn requests_to(&self, request_path: &str) -> usize {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|r| r.url.path() == request_path)
            .count()
    }

    /// Authorization headers received on `request_path`, in arrival order
    pub async fn authorizations(&self, request_path: &str) -> Vec<String> {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|r| r.url.path() == request_path)
            .filter_map(|r| r.headers.get("authorization"))
            .filter_map(|v| v.to_str().ok())
            .map(ToString::to_string)
            .collect()
    }
}

fn model_entry(id: &str, owner: &str) -> Value {
    json!({"id": id, "object": "model", "created": 1_700_000_000, "owned_by": owner})
}

fn models_body(data: Vec<Value>) -> Value {
    json!({"object": "list", "data": data})
}
