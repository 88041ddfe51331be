//! Vendor registry.
//!
//! [`VendorManager`] owns every configured vendor, its reverse proxy and the
//! compiled routing rules. The maps are built once and never mutated, so
//! lookups take no lock. A synthesized default vendor backs every lookup
//! that does not resolve to a configured vendor.

use crate::rules::{CompiledRule, RuleSet};
use futures::future::join_all;
use gateway_config::{GatewayConfig, VendorConfig};
use gateway_core::{shutdown_channel, GatewayError, ShutdownTrigger};
use gateway_providers::{
    proxy_client, FixedKeyValidator, HttpKeyValidator, KeyValidator, SharedRng, Vendor, VendorOptions, VendorProxy,
};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::SeedableRng;
use reqwest::Client;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Why a request was sent to a vendor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteReason {
    /// The client named the vendor explicitly
    Override,
    /// A model rule matched
    Rule {
        /// Name of the matching rule
        rule: String,
    },
    /// Nothing matched; the default vendor serves
    Default,
}

/// Result of routing one request
#[derive(Debug, Clone)]
pub struct RouteDecision {
    /// Requested vendor name (may be unconfigured; the default instance then serves)
    pub vendor: String,
    /// Proxy that will forward the request
    pub proxy: VendorProxy,
    /// How the vendor was chosen
    pub reason: RouteReason,
}

/// A vendor paired with its proxy
#[derive(Debug, Clone)]
pub struct VendorEntry {
    /// Vendor instance
    pub vendor: Arc<Vendor>,
    /// Proxy bound to the vendor
    pub proxy: VendorProxy,
}

impl VendorEntry {
    fn new(vendor: Arc<Vendor>, proxy_client: Client) -> Result<Self, GatewayError> {
        let proxy = vendor.reverse_proxy(proxy_client)?;
        Ok(Self { vendor, proxy })
    }
}

/// Registry of configured vendors
pub struct VendorManager {
    entries: HashMap<String, VendorEntry>,
    order: Vec<String>,
    rules: RuleSet,
    default_vendor_name: String,
    default_entry: VendorEntry,
    shutdown: ShutdownTrigger,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl std::fmt::Debug for VendorManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VendorManager")
            .field("vendors", &self.order)
            .field("rules", &self.rules.len())
            .field("default_vendor", &self.default_vendor_name)
            .finish_non_exhaustive()
    }
}

impl VendorManager {
    /// Start building a registry from configuration
    pub fn builder(config: GatewayConfig) -> VendorManagerBuilder {
        VendorManagerBuilder::new(config)
    }

    /// Vendor for `name`.
    ///
    /// An empty name means the configured default vendor; an unknown name
    /// resolves to the synthesized default instance.
    pub fn get_vendor(&self, name: &str) -> Arc<Vendor> {
        Arc::clone(&self.resolve(name).vendor)
    }

    /// Proxy for `name`, with the same resolution as [`Self::get_vendor`]
    pub fn get_proxy_for_vendor(&self, name: &str) -> VendorProxy {
        self.resolve(name).proxy.clone()
    }

    /// Vendor name serving `model`: first matching rule, else the default vendor name
    pub fn vendor_for_model(&self, model: &str) -> &str {
        self.rules
            .first_match(model)
            .map_or(self.default_vendor_name.as_str(), |rule| rule.vendor.as_str())
    }

    /// Proxy serving `model`
    pub fn proxy_for_model(&self, model: &str) -> VendorProxy {
        self.get_proxy_for_vendor(self.vendor_for_model(model))
    }

    /// Route a request: an explicit vendor wins, then the model rules, then the default
    pub fn route(&self, override_vendor: Option<&str>, model: Option<&str>) -> RouteDecision {
        if let Some(vendor) = override_vendor.map(str::trim).filter(|v| !v.is_empty()) {
            return RouteDecision {
                vendor: vendor.to_string(),
                proxy: self.get_proxy_for_vendor(vendor),
                reason: RouteReason::Override,
            };
        }

        let rule = model.and_then(|m| self.rules.first_match(m));
        match rule {
            Some(CompiledRule { name, vendor, .. }) => RouteDecision {
                vendor: vendor.clone(),
                proxy: self.get_proxy_for_vendor(vendor),
                reason: RouteReason::Rule { rule: name.clone() },
            },
            None => RouteDecision {
                vendor: self.default_vendor_name.clone(),
                proxy: self.get_proxy_for_vendor(&self.default_vendor_name),
                reason: RouteReason::Default,
            },
        }
    }

    /// Configured vendors in configuration order, excluding the synthesized default
    pub fn vendors(&self) -> impl Iterator<Item = &Arc<Vendor>> {
        self.order
            .iter()
            .filter_map(|name| self.entries.get(name))
            .map(|entry| &entry.vendor)
    }

    /// Configured vendor names in configuration order
    pub fn vendor_names(&self) -> &[String] {
        &self.order
    }

    /// Whether `name` is a configured vendor
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Configured default vendor name
    pub fn default_vendor_name(&self) -> &str {
        &self.default_vendor_name
    }

    /// The synthesized default vendor
    pub fn default_vendor(&self) -> &Arc<Vendor> {
        &self.default_entry.vendor
    }

    /// Compiled routing rules
    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Re-validate the keys of every vendor, including the default, once each
    pub async fn refresh_all_keys(&self) {
        refresh_vendors(&self.snapshot()).await;
    }

    /// Stop every background task and wait for them to finish
    pub async fn shutdown(&self) {
        self.shutdown.trigger();
        let tasks = std::mem::take(&mut *self.tasks.lock());
        let count = tasks.len();
        for task in tasks {
            if let Err(e) = task.await {
                warn!(error = %e, "Background task ended abnormally");
            }
        }
        info!(tasks = count, "Vendor manager stopped");
    }

    fn resolve(&self, name: &str) -> &VendorEntry {
        let name = if name.is_empty() { self.default_vendor_name.as_str() } else { name };
        self.entries.get(name).unwrap_or(&self.default_entry)
    }

    fn snapshot(&self) -> Vec<Arc<Vendor>> {
        let mut vendors: Vec<Arc<Vendor>> = Vec::with_capacity(self.entries.len() + 1);
        for vendor in self.vendors().chain(std::iter::once(&self.default_entry.vendor)) {
            if !vendors.iter().any(|seen| Arc::ptr_eq(seen, vendor)) {
                vendors.push(Arc::clone(vendor));
            }
        }
        vendors
    }

    fn spawn_background_tasks(self: &Arc<Self>, manager_interval: Duration) {
        let mut tasks = self.tasks.lock();

        for vendor in self.snapshot() {
            tasks.push(vendor.spawn_key_refresh(self.shutdown.token()));
        }

        let vendors = self.snapshot();
        let mut token = self.shutdown.token();
        tasks.push(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(manager_interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            info!(interval = ?manager_interval, vendors = vendors.len(), "Started periodic key refresh for all vendors");

            loop {
                tokio::select! {
                    () = token.cancelled() => break,
                    _ = ticker.tick() => refresh_vendors(&vendors).await,
                }
            }

            debug!("Periodic key refresh for all vendors stopped");
        }));
    }
}

async fn refresh_vendors(vendors: &[Arc<Vendor>]) {
    info!(vendors = vendors.len(), "Refreshing keys for all vendors");
    join_all(vendors.iter().map(|vendor| vendor.refresh_valid_keys())).await;
}

/// Builder for [`VendorManager`]
pub struct VendorManagerBuilder {
    config: GatewayConfig,
    validator: Option<Arc<dyn KeyValidator>>,
    rng: Option<SharedRng>,
    client: Option<Client>,
    proxy_client: Option<Client>,
    background_tasks: bool,
}

impl VendorManagerBuilder {
    fn new(config: GatewayConfig) -> Self {
        Self {
            config,
            validator: None,
            rng: None,
            client: None,
            proxy_client: None,
            background_tasks: true,
        }
    }

    /// Use a custom key validator
    #[must_use]
    pub fn validator(mut self, validator: Arc<dyn KeyValidator>) -> Self {
        self.validator = Some(validator);
        self
    }

    /// Seed key selection deterministically
    #[must_use]
    pub fn seed(mut self, seed: u64) -> Self {
        self.rng = Some(Arc::new(Mutex::new(StdRng::seed_from_u64(seed))));
        self
    }

    /// Client for key probes and model listing
    #[must_use]
    pub fn client(mut self, client: Client) -> Self {
        self.client = Some(client);
        self
    }

    /// Client for forwarded requests
    #[must_use]
    pub fn proxy_client(mut self, client: Client) -> Self {
        self.proxy_client = Some(client);
        self
    }

    /// Whether to start the key refresh loops
    #[must_use]
    pub fn background_tasks(mut self, enabled: bool) -> Self {
        self.background_tasks = enabled;
        self
    }

    /// Construct every vendor, validate keys and start the refresh loops.
    ///
    /// Vendors with a malformed host and rules with a malformed pattern are
    /// skipped. Failing to construct the default vendor is an error.
    pub async fn build(self) -> Result<Arc<VendorManager>, GatewayError> {
        let config = self.config;
        let health = &config.health;
        health
            .check()
            .map_err(|e| GatewayError::configuration(format!("Invalid health settings: {e}")))?;

        let client = match self.client {
            Some(client) => client,
            None => Client::builder()
                .pool_max_idle_per_host(100)
                .build()
                .map_err(|e| GatewayError::internal(format!("Failed to create HTTP client: {e}")))?,
        };
        let proxy_client = match self.proxy_client {
            Some(client) => client,
            None => proxy_client(health.validation_timeout, config.server.upstream_idle_timeout)?,
        };
        let validator: Arc<dyn KeyValidator> = match self.validator {
            Some(validator) => validator,
            None if health.validate_keys => Arc::new(HttpKeyValidator::new(client.clone(), health.validation_timeout)),
            None => {
                info!("Key validation disabled; every configured key is trusted");
                Arc::new(FixedKeyValidator::accept_all())
            }
        };
        let rng = self.rng.unwrap_or_else(|| Arc::new(Mutex::new(StdRng::from_entropy())));
        let options = VendorOptions::from(health);

        info!(vendors = config.vendors.len(), rules = config.models.len(), "Initializing vendor manager");

        let mut unique = Vec::with_capacity(config.vendors.len());
        for vendor in &config.vendors {
            if unique.iter().any(|seen: &&VendorConfig| seen.name == vendor.name) {
                warn!(vendor = %vendor.name, "Duplicate vendor name; keeping the first definition");
                continue;
            }
            unique.push(vendor);
        }

        let connects = unique.iter().map(|vendor_config| {
            Vendor::connect(
                (*vendor_config).clone(),
                options.clone(),
                Arc::clone(&validator),
                client.clone(),
                Arc::clone(&rng),
            )
        });
        let results = join_all(connects).await;

        let mut entries = HashMap::with_capacity(unique.len());
        let mut order = Vec::with_capacity(unique.len());
        for (vendor_config, result) in unique.iter().zip(results) {
            let entry = result.and_then(|vendor| VendorEntry::new(Arc::new(vendor), proxy_client.clone()));
            match entry {
                Ok(entry) => {
                    info!(vendor = %vendor_config.name, "Vendor initialized");
                    order.push(vendor_config.name.clone());
                    entries.insert(vendor_config.name.clone(), entry);
                }
                Err(e) => {
                    error!(vendor = %vendor_config.name, host = %vendor_config.host, error = %e, "Skipping vendor");
                }
            }
        }

        let (rules, rule_errors) = RuleSet::compile(&config.models);
        for e in &rule_errors {
            error!(error = %e, "Skipping model rule");
        }

        let default_vendor = Vendor::connect(
            config.default_vendor_descriptor(),
            options,
            validator,
            client,
            rng,
        )
        .await
        .map_err(|e| GatewayError::configuration(format!("Failed to create default vendor: {e}")))?;
        let default_entry = VendorEntry::new(Arc::new(default_vendor), proxy_client)?;

        let manager = Arc::new(VendorManager {
            entries,
            order,
            rules,
            default_vendor_name: config.default_vendor.clone(),
            default_entry,
            shutdown: shutdown_channel().0,
            tasks: Mutex::new(Vec::new()),
        });

        if self.background_tasks {
            manager.spawn_background_tasks(health.manager_refresh_interval);
        }

        info!(
            vendors = manager.order.len(),
            rules = manager.rules.len(),
            default_vendor = %manager.default_vendor_name,
            "Vendor manager initialized"
        );

        Ok(manager)
    }
}
