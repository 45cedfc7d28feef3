//! Directive handlers and the per-handler directive pipeline

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use tracing::trace;

use crate::errors::{FilterError, FilterResult};

use super::context::AttributeContext;
use super::directive::{Directive, DEFAULT_VALUE, REQUIRED};

/// Default message for a failed `Required` directive
pub const REQUIRED_MESSAGE: &str = "The {field} filter is required.";

/// Behaviour behind one directive kind
pub trait AttributeHandler: Send + Sync {
    fn handle(&self, directive: &Directive, ctx: &mut AttributeContext<'_>) -> FilterResult<()>;
}

/// Replaces an empty payload value
pub struct DefaultValueHandler;

impl AttributeHandler for DefaultValueHandler {
    fn handle(&self, directive: &Directive, ctx: &mut AttributeContext<'_>) -> FilterResult<()> {
        let Directive::DefaultValue(value) = directive else {
            return Err(mismatch(directive, DEFAULT_VALUE));
        };
        if ctx.payload().is_empty() {
            ctx.replace_value(value.clone());
        }
        Ok(())
    }
}

/// Aborts the run when the payload is empty or null
pub struct RequiredHandler;

impl AttributeHandler for RequiredHandler {
    fn handle(&self, directive: &Directive, ctx: &mut AttributeContext<'_>) -> FilterResult<()> {
        let Directive::Required(message) = directive else {
            return Err(mismatch(directive, REQUIRED));
        };
        if ctx.payload().is_empty() || ctx.payload().is_null() {
            let template = message.as_deref().unwrap_or(REQUIRED_MESSAGE);
            return Err(FilterError::validation_failed(
                ctx.name(),
                template.replace("{field}", ctx.name()),
            ));
        }
        Ok(())
    }
}

fn mismatch(directive: &Directive, expected: &str) -> FilterError {
    FilterError::configuration(format!(
        "handler for '{}' received a '{}' directive",
        expected,
        directive.kind()
    ))
}

/// Directive kind → handler. Extensible at runtime.
#[derive(Clone, Default)]
pub struct AttributeRegistry {
    handlers: BTreeMap<String, Arc<dyn AttributeHandler>>,
}

impl fmt::Debug for AttributeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.handlers.keys()).finish()
    }
}

impl AttributeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with `default_value` and `required`
    pub fn with_builtins() -> Self {
        Self::new()
            .register(DEFAULT_VALUE, DefaultValueHandler)
            .register(REQUIRED, RequiredHandler)
    }

    pub fn register(
        mut self,
        kind: impl Into<String>,
        handler: impl AttributeHandler + 'static,
    ) -> Self {
        self.handlers.insert(kind.into(), Arc::new(handler));
        self
    }

    pub fn has(&self, kind: &str) -> bool {
        self.handlers.contains_key(kind)
    }

    pub fn get(&self, kind: &str) -> FilterResult<&Arc<dyn AttributeHandler>> {
        self.handlers.get(kind).ok_or_else(|| {
            FilterError::configuration(format!("no attribute handler for directive '{}'", kind))
        })
    }
}

/// Directives declared per field handler, run through the registry
#[derive(Debug, Clone, Default)]
pub struct AttributePipeline {
    registry: AttributeRegistry,
    declarations: BTreeMap<String, Vec<Directive>>,
}

impl AttributePipeline {
    pub fn new(registry: AttributeRegistry) -> Self {
        Self {
            registry,
            declarations: BTreeMap::new(),
        }
    }

    pub fn registry(&self) -> &AttributeRegistry {
        &self.registry
    }

    /// Declare directives for a handler, appending in order
    pub fn declare(
        mut self,
        handler: impl Into<String>,
        directives: impl IntoIterator<Item = Directive>,
    ) -> Self {
        self.declarations
            .entry(handler.into())
            .or_default()
            .extend(directives);
        self
    }

    pub fn merge(mut self, other: &AttributePipeline) -> Self {
        for (handler, directives) in &other.declarations {
            self.declarations
                .entry(handler.clone())
                .or_default()
                .extend(directives.iter().cloned());
        }
        for (kind, handler) in &other.registry.handlers {
            self.registry.handlers.insert(kind.clone(), Arc::clone(handler));
        }
        self
    }

    pub fn directives(&self, handler: &str) -> &[Directive] {
        self.declarations
            .get(handler)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn has_directives(&self, handler: &str) -> bool {
        !self.directives(handler).is_empty()
    }

    /// Every declared directive kind resolves to a handler
    pub fn check(&self) -> FilterResult<()> {
        self.declarations
            .values()
            .flatten()
            .try_for_each(|directive| self.registry.get(directive.kind()).map(|_| ()))
    }

    /// Run the directives declared on `handler` in declaration order.
    ///
    /// The first failure stops the remaining directives.
    pub fn process(&self, ctx: &mut AttributeContext<'_>, handler: &str) -> FilterResult<()> {
        for directive in self.directives(handler) {
            trace!(handler, kind = directive.kind(), "running directive");
            self.registry.get(directive.kind())?.handle(directive, ctx)?;
        }
        Ok(())
    }
}
