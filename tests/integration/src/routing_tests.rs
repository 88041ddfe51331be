//! Routing integration tests
//!
//! Model rules, the `x-vendor` override and the default vendor.

use crate::fixtures::*;
use crate::helpers::*;
use crate::mock_providers::*;
use gateway_config::{ModelRuleConfig, VendorConfig};
use pretty_assertions::assert_eq;

const KEY_A: &str = "sk-vendor-a-0123456789";
const KEY_B: &str = "sk-vendor-b-0123456789";

struct Vendors {
    a: MockVendor,
    b: MockVendor,
    d: MockVendor,
    server: TestServer,
}

async fn start_vendors(rules: Vec<ModelRuleConfig>) -> Vendors {
    let a = MockVendor::start("A").await.with_chat_echo().await;
    let b = MockVendor::start("B").await.with_chat_echo().await;
    let d = MockVendor::start("D").await.with_chat_echo().await;

    let config = with_default_endpoint(
        config_with(
            vec![VendorConfig::new("A", a.uri(), KEY_A), VendorConfig::new("B", b.uri(), KEY_B)],
            rules,
        ),
        d.uri(),
    );
    let manager = trusting_manager(config.clone()).await;
    let server = TestServer::start(app_state(config, manager)).await;
    Vendors { a, b, d, server }
}

fn prefix_rules() -> Vec<ModelRuleConfig> {
    vec![
        ModelRuleConfig::new("a-models", "^a-", "A"),
        ModelRuleConfig::new("b-models", "^b-", "B"),
    ]
}

async fn served_by(server: &TestServer, model: &str) -> String {
    let response = server.post_json(CHAT_PATH, &chat_request(model, "hi")).await;
    assert_status(&response, 200);
    response_json(response).await["vendor"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_model_rules_and_default() {
    let v = start_vendors(prefix_rules()).await;

    assert_eq!(served_by(&v.server, "a-1").await, "A");
    assert_eq!(served_by(&v.server, "b-2").await, "B");
    assert_eq!(served_by(&v.server, "z-9").await, "D");

    assert_eq!(v.a.requests_to(CHAT_PATH).await, 1);
    assert_eq!(v.b.requests_to(CHAT_PATH).await, 1);
    assert_eq!(v.d.requests_to(CHAT_PATH).await, 1);
}

#[tokio::test]
async fn test_vendor_header_wins_over_model() {
    let v = start_vendors(prefix_rules()).await;

    let response = v
        .server
        .post_json_with_headers(CHAT_PATH, &chat_request("a-1", "hi"), &[("x-vendor", "B")])
        .await;
    assert_eq!(response_json(response).await["vendor"], "B");
    assert_eq!(v.a.requests_to(CHAT_PATH).await, 0);
}

#[tokio::test]
async fn test_empty_vendor_header_falls_through() {
    let v = start_vendors(prefix_rules()).await;

    let response = v
        .server
        .post_json_with_headers(CHAT_PATH, &chat_request("a-1", "hi"), &[("x-vendor", "")])
        .await;
    assert_eq!(response_json(response).await["vendor"], "A");
}

#[tokio::test]
async fn test_first_matching_rule_wins() {
    let v = start_vendors(vec![
        ModelRuleConfig::new("gpt-on-b", "^gpt-4o", "B"),
        ModelRuleConfig::new("gpt-on-a", "^gpt-", "A"),
    ])
    .await;

    for _ in 0..5 {
        assert_eq!(served_by(&v.server, "gpt-4o-mini").await, "B");
    }
    assert_eq!(served_by(&v.server, "gpt-3.5-turbo").await, "A");
}

#[tokio::test]
async fn test_exact_rule_matches_name_only() {
    let v = start_vendors(vec![ModelRuleConfig::exact("deepseek-chat", "B")]).await;

    assert_eq!(served_by(&v.server, "deepseek-chat").await, "B");
    assert_eq!(served_by(&v.server, "deepseek-chat-v2").await, "D");
}

#[tokio::test]
async fn test_invalid_rule_is_skipped() {
    let v = start_vendors(vec![
        ModelRuleConfig::new("broken", "([unclosed", "A"),
        ModelRuleConfig::new("b-models", "^b-", "B"),
    ])
    .await;

    assert_eq!(v.server.state.manager.rules().len(), 1);
    assert_eq!(served_by(&v.server, "b-1").await, "B");
    assert_eq!(served_by(&v.server, "([unclosed").await, "D");
}

#[tokio::test]
async fn test_rule_for_unknown_vendor_uses_default() {
    let v = start_vendors(vec![ModelRuleConfig::new("ghost", "^ghost-", "nonexistent")]).await;

    assert_eq!(served_by(&v.server, "ghost-1").await, "D");
}

#[tokio::test]
async fn test_default_vendor_setting_redirects_unmatched_models() {
    let a = MockVendor::start("A").await.with_chat_echo().await;
    let b = MockVendor::start("B").await.with_chat_echo().await;
    let mut config = config_with(
        vec![VendorConfig::new("A", a.uri(), KEY_A), VendorConfig::new("B", b.uri(), KEY_B)],
        vec![ModelRuleConfig::new("a-models", "^a-", "A")],
    );
    config.default_vendor = "B".to_string();
    let manager = trusting_manager(config.clone()).await;
    let server = TestServer::start(app_state(config, manager)).await;

    assert_eq!(served_by(&server, "unknown-model").await, "B");
    assert_eq!(served_by(&server, "a-1").await, "A");
}

#[tokio::test]
async fn test_vendor_path_prefix() {
    let prefixed = MockVendor::start("P").await;
    wiremock::Mock::given(wiremock::matchers::method("POST"))
        .and(wiremock::matchers::path("/openai/v2/chat/completions"))
        .respond_with(wiremock::ResponseTemplate::new(200).set_body_json(serde_json::json!({"vendor": "P"})))
        .expect(1)
        .mount(&prefixed.server)
        .await;

    let config = config_with(
        vec![VendorConfig::new("P", prefixed.uri(), KEY_A).with_path("/openai/v2")],
        vec![ModelRuleConfig::new("p-models", "^p-", "P")],
    );
    let manager = trusting_manager(config.clone()).await;
    let server = TestServer::start(app_state(config, manager)).await;

    assert_eq!(served_by(&server, "p-1").await, "P");
}

#[tokio::test]
async fn test_unreachable_vendor_returns_proxy_error() {
    let config = config_with(Vec::new(), Vec::new());
    let manager = trusting_manager(config.clone()).await;
    let server = TestServer::start(app_state(config, manager)).await;

    let response = server.post_json(CHAT_PATH, &chat_request("gpt-4o", "hi")).await;
    assert_status(&response, 502);
    let body = response_json(response).await;
    assert_eq!(body["error"]["type"], "proxy_error");

    // Still serving
    assert_status(&server.get("/health").await, 200);
}
