use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use super::traits::{ParseHandler, RequestHook};
use super::types::{FetchContext, OutgoingRequest};

/// Rule name used when a request doesn't name one
pub const DEFAULT_RULE: &str = "default";

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("rule not found: {0}")]
    NotFound(String),
}

/// Rule names are case-insensitive
pub fn normalize_rule_name(name: &str) -> String {
    if name.is_empty() {
        DEFAULT_RULE.to_string()
    } else {
        name.to_lowercase()
    }
}

/// How requests bound to one name are fetched and parsed
#[derive(Clone, Default)]
pub struct Rule {
    name: String,
    timeout: Option<Duration>,
    before_request: Option<Arc<dyn RequestHook>>,
    parser: Option<Arc<dyn ParseHandler>>,
}

impl Rule {
    /// A rule without a parse callback; every successful fetch completes its request
    pub fn new() -> Self {
        Self::default()
    }

    /// A rule driven by a parse closure
    pub fn parse<F>(parse: F) -> Self
    where
        F: Fn(&FetchContext<'_>) -> bool + Send + Sync + 'static,
    {
        Self::new().with_parser(parse)
    }

    pub fn with_parser(mut self, parser: impl ParseHandler + 'static) -> Self {
        self.parser = Some(Arc::new(parser));
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn before_request<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut OutgoingRequest) + Send + Sync + 'static,
    {
        self.before_request = Some(Arc::new(hook));
        self
    }

    pub fn with_hook(mut self, hook: impl RequestHook + 'static) -> Self {
        self.before_request = Some(Arc::new(hook));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Zero counts as unset
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout.filter(|t| !t.is_zero())
    }

    pub fn hook(&self) -> Option<&Arc<dyn RequestHook>> {
        self.before_request.as_ref()
    }

    pub fn parser(&self) -> Option<&Arc<dyn ParseHandler>> {
        self.parser.as_ref()
    }

    /// Stand-in used when a request names an unregistered rule
    pub(crate) fn fallback(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("name", &self.name)
            .field("timeout", &self.timeout)
            .field("before_request", &self.before_request.is_some())
            .field("parser", &self.parser.is_some())
            .finish()
    }
}

/// Registry mapping rule names to rules
#[derive(Clone, Default, Debug)]
pub struct RuleRegistry {
    rules: BTreeMap<String, Arc<Rule>>,
}

impl RuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `rule` under `name` (lowercased), replacing any previous rule
    pub fn register(&mut self, name: &str, mut rule: Rule) -> Option<Arc<Rule>> {
        let name = normalize_rule_name(name);
        rule.name = name.clone();
        self.rules.insert(name, Arc::new(rule))
    }

    pub fn get(&self, name: &str) -> Result<Arc<Rule>, RegistryError> {
        self.rules
            .get(&normalize_rule_name(name))
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))
    }

    pub fn has_rule(&self, name: &str) -> bool {
        self.rules.contains_key(&normalize_rule_name(name))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.rules.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
