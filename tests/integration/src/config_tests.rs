//! Configuration file integration tests

use crate::fixtures::*;
use crate::helpers::*;
use crate::mock_providers::*;
use gateway_config::load_config_from;
use gateway_routing::VendorManager;
use pretty_assertions::assert_eq;
use std::io::Write;

fn write_config(contents: &str, suffix: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

async fn served_by(server: &TestServer, model: &str) -> String {
    let response = server.post_json(CHAT_PATH, &chat_request(model, "hi")).await;
    response_json(response).await["vendor"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_yaml_file_drives_routing() {
    let alpha = MockVendor::start("alpha").await.with_chat_echo().await;
    let beta = MockVendor::start("beta").await.with_chat_echo().await;
    let fallback = MockVendor::start("fallback").await.with_chat_echo().await;

    let yaml = format!(
        r"
VENDORS:
  - name: alpha
    host: {alpha}
    key: sk-alpha-0123456789
  - name: beta
    host: {beta}
    key: sk-beta-0123456789
    hideModels: true
  - name: broken
    host: not a url
    key: sk-broken-0123456789
MODELS:
  - name: gpt-4o
    vendor: alpha
  - name: deepseek
    regex: ^deepseek-
    vendor: beta
default_endpoint:
  host: {fallback}
  key: sk-fallback-0123456789
health:
  validate_keys: false
",
        alpha = alpha.uri(),
        beta = beta.uri(),
        fallback = fallback.uri(),
    );
    let file = write_config(&yaml, ".yaml");

    let config = load_config_from(file.path()).await.unwrap();
    let manager = VendorManager::builder(config.clone())
        .background_tasks(false)
        .build()
        .await
        .unwrap();
    assert_eq!(manager.vendor_names(), ["alpha".to_string(), "beta".to_string()]);

    let server = TestServer::start(app_state(config, manager)).await;
    assert_eq!(served_by(&server, "gpt-4o").await, "alpha");
    assert_eq!(served_by(&server, "deepseek-chat").await, "beta");
    assert_eq!(served_by(&server, "gpt-4o-mini").await, "fallback");
}

#[tokio::test]
async fn test_toml_file_is_accepted() {
    let alpha = MockVendor::start("alpha").await.with_chat_echo().await;
    let toml = format!(
        r#"
default_vendor = "alpha"

[health]
validate_keys = false
key_refresh_interval = "5m"

[[vendors]]
name = "alpha"
host = "{alpha}"
key = "sk-alpha-0123456789"
"#,
        alpha = alpha.uri(),
    );
    let file = write_config(&toml, ".toml");

    let config = load_config_from(file.path()).await.unwrap();
    assert_eq!(config.health.key_refresh_interval.as_secs(), 300);

    let manager = trusting_manager(config.clone()).await;
    let server = TestServer::start(app_state(config, manager)).await;
    let response = server.post_json(CHAT_PATH, &chat_request("anything", "hi")).await;
    assert_eq!(response_json(response).await["vendor"], "alpha");
}

#[tokio::test]
async fn test_missing_file_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let result = load_config_from(dir.path().join("absent.yaml")).await;
    assert!(matches!(result, Err(gateway_config::ConfigError::NotFound(_))));
}
