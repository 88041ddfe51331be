//! Model routing rules.
//!
//! Rules are kept in configuration order and the first matching rule wins,
//! so overlapping patterns resolve the same way on every run.

use gateway_config::ModelRuleConfig;
use regex::Regex;

/// A rule whose pattern failed to compile
#[derive(Debug, thiserror::Error)]
#[error("model rule {name:?}: invalid pattern {pattern:?}: {source}")]
pub struct RuleError {
    /// Rule name
    pub name: String,
    /// Pattern source
    pub pattern: String,
    /// Compilation error
    #[source]
    pub source: regex::Error,
}

/// A compiled model rule
#[derive(Debug, Clone)]
pub struct CompiledRule {
    /// Rule name
    pub name: String,
    /// Compiled pattern
    pub regex: Regex,
    /// Target vendor
    pub vendor: String,
}

impl CompiledRule {
    /// Whether this rule matches a model name
    pub fn matches(&self, model: &str) -> bool {
        self.regex.is_match(model)
    }
}

/// Ordered set of compiled rules
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<CompiledRule>,
}

impl RuleSet {
    /// Compile rules in order, returning the ones that failed separately
    pub fn compile(configs: &[ModelRuleConfig]) -> (Self, Vec<RuleError>) {
        let mut rules = Vec::with_capacity(configs.len());
        let mut errors = Vec::new();

        for config in configs {
            let pattern = config.pattern_source();
            match Regex::new(&pattern) {
                Ok(regex) => rules.push(CompiledRule {
                    name: config.name.clone(),
                    regex,
                    vendor: config.vendor.clone(),
                }),
                Err(source) => errors.push(RuleError {
                    name: config.name.clone(),
                    pattern,
                    source,
                }),
            }
        }

        (Self { rules }, errors)
    }

    /// First rule matching `model`
    pub fn first_match(&self, model: &str) -> Option<&CompiledRule> {
        self.rules.iter().find(|rule| rule.matches(model))
    }

    /// Rules in evaluation order
    pub fn iter(&self) -> impl Iterator<Item = &CompiledRule> {
        self.rules.iter()
    }

    /// Number of compiled rules
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether no rule compiled
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
