//! Per-filter sanitizer aggregate

use std::collections::BTreeMap;

use serde_json::Value;

use crate::errors::FilterResult;

use super::registry::SanitizerRegistry;
use super::spec::{SanitizePipeline, SanitizerSpec};

/// Field → sanitizer spec, plus the registry references resolve against
#[derive(Debug, Clone, Default)]
pub struct Sanitizers {
    specs: BTreeMap<String, SanitizerSpec>,
    registry: SanitizerRegistry,
}

impl Sanitizers {
    pub fn new(registry: SanitizerRegistry) -> Self {
        Self {
            specs: BTreeMap::new(),
            registry,
        }
    }

    pub fn has(&self, field: &str) -> bool {
        self.specs.contains_key(field)
    }

    pub fn get(&self, field: &str) -> Option<&SanitizerSpec> {
        self.specs.get(field)
    }

    pub fn set(mut self, field: impl Into<String>, spec: SanitizerSpec) -> Self {
        self.specs.insert(field.into(), spec);
        self
    }

    pub fn merge(mut self, other: &Sanitizers) -> Self {
        self.specs
            .extend(other.specs.iter().map(|(k, v)| (k.clone(), v.clone())));
        self
    }

    pub fn all(&self) -> impl Iterator<Item = (&str, &SanitizerSpec)> {
        self.specs.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn registry(&self) -> &SanitizerRegistry {
        &self.registry
    }

    /// Sanitize `value` for `field`; passthrough when no spec is configured
    pub fn handle(&self, field: &str, value: Value) -> FilterResult<Value> {
        match self.specs.get(field) {
            Some(spec) => SanitizePipeline::new(&self.registry).handle(value, spec),
            None => Ok(value),
        }
    }
}
