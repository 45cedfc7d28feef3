//! Sanitizer specs and the dispatching pipeline

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::dissector::json_type_name;
use crate::errors::{FilterError, FilterResult};

use super::registry::SanitizerRegistry;

/// A value transformation applied before Clause construction
pub trait Sanitizer {
    fn sanitize(&self, value: Value) -> FilterResult<Value>;
}

type SanitizeFn = dyn Fn(Value) -> Value + Send + Sync;

/// Declarative description of a sanitizer
#[derive(Clone)]
pub enum SanitizerSpec {
    /// Named sanitizer, instantiated from the registry on use
    Reference(String),
    /// Plain function
    Function(Arc<SanitizeFn>),
    /// Left-to-right fold, each stage feeding the next
    Chain(Vec<SanitizerSpec>),
    /// Ready-made sanitizer object
    Object(Arc<dyn Sanitizer + Send + Sync>),
}

impl fmt::Debug for SanitizerSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SanitizerSpec::Reference(name) => f.debug_tuple("Reference").field(name).finish(),
            SanitizerSpec::Function(_) => f.write_str("Function(..)"),
            SanitizerSpec::Chain(specs) => f.debug_tuple("Chain").field(specs).finish(),
            SanitizerSpec::Object(_) => f.write_str("Object(..)"),
        }
    }
}

impl SanitizerSpec {
    pub fn reference(name: impl Into<String>) -> Self {
        SanitizerSpec::Reference(name.into())
    }

    pub fn function(f: impl Fn(Value) -> Value + Send + Sync + 'static) -> Self {
        SanitizerSpec::Function(Arc::new(f))
    }

    pub fn chain(specs: impl IntoIterator<Item = SanitizerSpec>) -> Self {
        SanitizerSpec::Chain(specs.into_iter().collect())
    }

    pub fn object(sanitizer: impl Sanitizer + Send + Sync + 'static) -> Self {
        SanitizerSpec::Object(Arc::new(sanitizer))
    }

    /// Read a spec from configuration JSON.
    ///
    /// Text is a reference, an array is a chain; anything else is a
    /// configuration error.
    pub fn from_value(value: &Value) -> FilterResult<Self> {
        match value {
            Value::String(name) => Ok(SanitizerSpec::Reference(name.clone())),
            Value::Array(items) => items
                .iter()
                .map(SanitizerSpec::from_value)
                .collect::<FilterResult<Vec<_>>>()
                .map(SanitizerSpec::Chain),
            other => Err(FilterError::configuration(format!(
                "sanitizer spec must be a name or a list, got {}",
                json_type_name(other)
            ))),
        }
    }

    /// Every reference resolves against `registry`
    pub fn check(&self, registry: &SanitizerRegistry) -> FilterResult<()> {
        match self {
            SanitizerSpec::Reference(name) if !registry.has(name) => Err(
                FilterError::configuration(format!("unknown sanitizer '{}'", name)),
            ),
            SanitizerSpec::Chain(specs) => specs.iter().try_for_each(|s| s.check(registry)),
            _ => Ok(()),
        }
    }
}

/// Dispatches on spec shape
#[derive(Clone, Copy)]
pub struct SanitizePipeline<'a> {
    registry: &'a SanitizerRegistry,
}

impl<'a> SanitizePipeline<'a> {
    pub fn new(registry: &'a SanitizerRegistry) -> Self {
        Self { registry }
    }

    pub fn handle(&self, value: Value, spec: &SanitizerSpec) -> FilterResult<Value> {
        match spec {
            SanitizerSpec::Reference(name) => self.registry.instantiate(name)?.sanitize(value),
            SanitizerSpec::Function(f) => Ok(f(value)),
            SanitizerSpec::Chain(specs) => specs
                .iter()
                .try_fold(value, |acc, stage| self.handle(acc, stage)),
            SanitizerSpec::Object(sanitizer) => sanitizer.sanitize(value),
        }
    }
}
