//! Key validation and rotation integration tests
//!
//! Keys are probed over HTTP against the mock vendors, exactly as in
//! production.

use crate::fixtures::*;
use crate::helpers::*;
use crate::mock_providers::*;
use gateway_config::{ModelRuleConfig, VendorConfig};
use gateway_core::VendorDialect;
use pretty_assertions::assert_eq;
use std::collections::HashSet;

const PRIMARY: &str = "sk-primary-0123456789";
const POOL_1: &str = "sk-pool-one-0123456789";
const POOL_2: &str = "sk-pool-two-0123456789";
const REVOKED: &str = "sk-revoked-0123456789";

fn bearer(key: &str) -> String {
    format!("Bearer {key}")
}

fn rule() -> Vec<ModelRuleConfig> {
    vec![ModelRuleConfig::new("r-models", "^r-", "R")]
}

async fn send_chats(server: &TestServer, count: usize) {
    for i in 0..count {
        let response = server
            .post_json(CHAT_PATH, &chat_request("r-1", &format!("message {i}")))
            .await;
        assert_status(&response, 200);
    }
}

#[tokio::test]
async fn test_pool_rotates_across_valid_keys_only() {
    let vendor = MockVendor::start("R")
        .await
        .with_models_for_keys(&[PRIMARY, POOL_1, POOL_2], &["r-1"])
        .await
        .with_chat_echo()
        .await;
    let config = config_with(
        vec![VendorConfig::new("R", vendor.uri(), PRIMARY).with_keys([POOL_1, POOL_2, REVOKED])],
        rule(),
    );
    let manager = probing_manager(config.clone()).await;

    let stats = manager.get_vendor("R").key_stats();
    assert_eq!((stats.configured, stats.valid), (4, 3));

    let server = TestServer::start(app_state(config, manager)).await;
    send_chats(&server, 30).await;

    let used: HashSet<String> = vendor.authorizations(CHAT_PATH).await.into_iter().collect();
    let allowed: HashSet<String> = [PRIMARY, POOL_1, POOL_2].iter().map(|k| bearer(k)).collect();
    assert!(used.is_subset(&allowed), "revoked key was used: {used:?}");
    assert!(used.len() > 1, "keys did not rotate: {used:?}");
}

#[tokio::test]
async fn test_all_keys_rejected_falls_back_to_primary() {
    let vendor = MockVendor::start("R")
        .await
        .with_models_for_keys(&[], &[])
        .await
        .with_chat_echo()
        .await;
    let config = config_with(
        vec![VendorConfig::new("R", vendor.uri(), PRIMARY).with_keys([POOL_1, POOL_2])],
        rule(),
    );
    let manager = probing_manager(config.clone()).await;
    assert_eq!(manager.get_vendor("R").key_stats().valid, 0);

    let server = TestServer::start(app_state(config, manager)).await;
    send_chats(&server, 5).await;

    let used = vendor.authorizations(CHAT_PATH).await;
    assert_eq!(used, vec![bearer(PRIMARY); 5]);
}

#[tokio::test]
async fn test_single_key_vendor_always_uses_it() {
    let vendor = MockVendor::start("R").await.with_models(&["r-1"]).await.with_chat_echo().await;
    let config = config_with(vec![VendorConfig::new("R", vendor.uri(), PRIMARY)], rule());
    let manager = probing_manager(config.clone()).await;
    let server = TestServer::start(app_state(config, manager)).await;

    send_chats(&server, 3).await;
    assert_eq!(vendor.authorizations(CHAT_PATH).await, vec![bearer(PRIMARY); 3]);
}

#[tokio::test]
async fn test_balance_dialect_requires_positive_balance() {
    let vendor = MockVendor::start("R")
        .await
        .with_balance(PRIMARY, "normal", "12.50")
        .await
        .with_balance(POOL_1, "normal", "0")
        .await
        .with_balance(POOL_2, "frozen", "30")
        .await
        .with_chat_echo()
        .await;
    let config = config_with(
        vec![VendorConfig::new("R", vendor.uri(), PRIMARY)
            .with_keys([POOL_1, POOL_2, REVOKED])
            .with_dialect(VendorDialect::CheckBalance)],
        rule(),
    );
    let manager = probing_manager(config.clone()).await;

    let stats = manager.get_vendor("R").key_stats();
    assert_eq!((stats.configured, stats.valid), (4, 1));
    assert_eq!(vendor.requests_to(BALANCE_PATH).await, 4);
    assert_eq!(vendor.requests_to(MODELS_PATH).await, 0);

    let server = TestServer::start(app_state(config, manager)).await;
    send_chats(&server, 10).await;
    assert_eq!(vendor.authorizations(CHAT_PATH).await, vec![bearer(PRIMARY); 10]);
}

#[tokio::test]
async fn test_listing_only_dialect_skips_probes_and_uses_primary() {
    let vendor = MockVendor::start("R")
        .await
        .with_priced_models(&[("free-model", true), ("paid-model", false), ("other-free", true)])
        .await
        .with_chat_echo()
        .await;
    let config = config_with(
        vec![VendorConfig::new("R", vendor.uri(), PRIMARY)
            .with_keys([POOL_1, POOL_2])
            .with_dialect(VendorDialect::CheckByListing)],
        rule(),
    );
    let manager = probing_manager(config.clone()).await;
    assert_eq!(vendor.requests_to(MODELS_PATH).await, 0);
    assert_eq!(vendor.requests_to(BALANCE_PATH).await, 0);

    let server = TestServer::start(app_state(config, manager)).await;
    send_chats(&server, 10).await;
    assert_eq!(vendor.authorizations(CHAT_PATH).await, vec![bearer(PRIMARY); 10]);

    let listing = response_json(server.get_from_vendor(MODELS_PATH, "R").await).await;
    assert_eq!(model_ids(&listing), vec!["free-model", "other-free"]);
}

#[tokio::test]
async fn test_keys_are_never_exposed_by_admin_endpoint() {
    let vendor = MockVendor::start("R").await.with_models(&["r-1"]).await;
    let config = config_with(
        vec![VendorConfig::new("R", vendor.uri(), PRIMARY).with_keys([POOL_1])],
        rule(),
    );
    let manager = probing_manager(config.clone()).await;
    let server = TestServer::start(app_state(config, manager)).await;

    let text = server.get("/admin/vendors").await.text().await.unwrap();
    for key in [PRIMARY, POOL_1, DEFAULT_KEY] {
        assert!(!text.contains(key));
    }
}
