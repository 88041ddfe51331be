//! Background key refresh and shutdown integration tests

use crate::fixtures::*;
use crate::helpers::*;
use crate::mock_providers::*;
use gateway_config::VendorConfig;
use gateway_routing::VendorManager;
use pretty_assertions::assert_eq;
use std::time::Duration;

const PRIMARY: &str = "sk-primary-0123456789";
const POOL: &str = "sk-pool-0123456789";

#[tokio::test]
async fn test_refresh_picks_up_recovered_key() {
    let vendor = MockVendor::start("R").await.with_models_for_keys(&[PRIMARY], &[]).await;
    let config = config_with(
        vec![VendorConfig::new("R", vendor.uri(), PRIMARY).with_keys([POOL])],
        Vec::new(),
    );
    let manager = probing_manager(config).await;
    assert_eq!(manager.get_vendor("R").key_stats().valid, 1);

    vendor.server.reset().await;
    let vendor = vendor.with_models_for_keys(&[PRIMARY, POOL], &[]).await;

    manager.refresh_all_keys().await;
    assert_eq!(manager.get_vendor("R").key_stats().valid, 2);

    vendor.server.reset().await;
    let _vendor = vendor.with_models_for_keys(&[], &[]).await;

    manager.refresh_all_keys().await;
    assert_eq!(manager.get_vendor("R").key_stats().valid, 0);
}

#[tokio::test]
async fn test_periodic_refresh_runs_until_shutdown() {
    let vendor = MockVendor::start("R").await.with_models(&[]).await;
    let mut config = config_with(vec![VendorConfig::new("R", vendor.uri(), PRIMARY)], Vec::new());
    config.health.key_refresh_interval = Duration::from_millis(100);
    config.health.manager_refresh_interval = Duration::from_secs(3600);

    let manager = VendorManager::builder(config.clone()).seed(7).build().await.unwrap();
    let server = TestServer::start(app_state(config, manager)).await;

    tokio::time::sleep(Duration::from_millis(450)).await;
    let while_running = vendor.requests_to(MODELS_PATH).await;
    // One probe at startup, one from the immediate manager tick, then one per interval
    assert!(while_running >= 4, "only {while_running} probes");

    server.shutdown().await;
    let after_shutdown = vendor.requests_to(MODELS_PATH).await;

    tokio::time::sleep(Duration::from_millis(350)).await;
    assert_eq!(vendor.requests_to(MODELS_PATH).await, after_shutdown);
}

#[tokio::test]
async fn test_shutdown_is_idempotent() {
    let config = config_with(Vec::new(), Vec::new());
    let manager = VendorManager::builder(config).build().await.unwrap();

    manager.shutdown().await;
    manager.shutdown().await;
}
