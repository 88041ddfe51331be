//! # Gateway Routing
//!
//! Vendor registry and model routing for the gateway.
//!
//! This crate provides:
//! - [`VendorManager`]: the registry of vendors and their proxies, built once
//!   at startup, with background key re-validation
//! - [`RuleSet`]: ordered regex rules mapping model names to vendors
//! - [`list_models`]: single-vendor and aggregated model listings

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod catalog;
pub mod manager;
pub mod rules;

pub use catalog::{list_models, ModelListing};
pub use manager::{RouteDecision, RouteReason, VendorEntry, VendorManager, VendorManagerBuilder};
pub use rules::{CompiledRule, RuleError, RuleSet};
