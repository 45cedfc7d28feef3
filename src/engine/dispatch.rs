//! Per-field handler dispatch
//!
//! Each field runs the shared steps, then the handler registered for it
//! applies its own predicate to the target and reports the clause it
//! applied. Fields without a handler get the default clause.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::attribute::Directive;
use crate::clause::{Clause, CommitLog};
use crate::config::FilterConfig;
use crate::errors::{FilterError, FilterResult};
use crate::mapping::RelationPath;
use crate::payload::Payload;
use crate::policy::{Failure, Skip};
use crate::target::QueryTarget;

use super::resolver::{FieldPolicy, Resolver};
use super::Engine;

/// Applies one field's predicate to the target.
///
/// Returns the clause it applied, or `None` to skip the field.
pub trait FieldHandler: Send + Sync {
    fn apply(
        &self,
        payload: &Payload,
        target: &mut dyn QueryTarget,
    ) -> FilterResult<Option<Clause>>;
}

impl<F> FieldHandler for F
where
    F: Fn(&Payload, &mut dyn QueryTarget) -> FilterResult<Option<Clause>> + Send + Sync,
{
    fn apply(
        &self,
        payload: &Payload,
        target: &mut dyn QueryTarget,
    ) -> FilterResult<Option<Clause>> {
        self(payload, target)
    }
}

/// Field name → handler, plus directives declared alongside handlers
#[derive(Clone, Default)]
pub struct HandlerMap {
    handlers: BTreeMap<String, Arc<dyn FieldHandler>>,
    directives: BTreeMap<String, Vec<Directive>>,
}

impl fmt::Debug for HandlerMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerMap")
            .field("handlers", &self.handlers.keys().collect::<Vec<_>>())
            .field("directives", &self.directives)
            .finish()
    }
}

impl HandlerMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        mut self,
        field: impl Into<String>,
        handler: impl FieldHandler + 'static,
    ) -> Self {
        self.handlers.insert(field.into(), Arc::new(handler));
        self
    }

    /// Directives run for `field` before its handler
    pub fn declare(
        mut self,
        field: impl Into<String>,
        directives: impl IntoIterator<Item = Directive>,
    ) -> Self {
        self.directives
            .entry(field.into())
            .or_default()
            .extend(directives);
        self
    }

    pub fn has(&self, field: &str) -> bool {
        self.handlers.contains_key(field)
    }

    pub fn get(&self, field: &str) -> Option<&Arc<dyn FieldHandler>> {
        self.handlers.get(field)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

/// Engine that routes each field to its registered handler
#[derive(Debug)]
pub struct DispatchEngine {
    resolver: Resolver,
    handlers: HandlerMap,
    commits: CommitLog,
}

impl DispatchEngine {
    pub const NAME: &'static str = "dispatch";

    /// Every handler must target a filterable field, and every declared
    /// directive kind must be registered.
    pub fn new(config: Arc<FilterConfig>, handlers: HandlerMap) -> FilterResult<Self> {
        for name in handlers.names() {
            let mapped = config.field_map().map(name);
            let path = RelationPath::parse(&mapped);
            let filterable = if path.is_local() {
                config.allowed_fields().has(&mapped)
            } else {
                path.is_allowed(config.relations())
            };
            if !filterable {
                return Err(FilterError::configuration(format!(
                    "handler registered for '{}' but '{}' is not filterable",
                    name, mapped
                )));
            }
        }

        let attributes = handlers
            .directives
            .iter()
            .fold(config.attributes().clone(), |acc, (field, directives)| {
                acc.declare(field.clone(), directives.iter().cloned())
            });
        attributes.check()?;

        Ok(Self {
            resolver: Resolver::new(config).with_attributes(attributes),
            handlers,
            commits: CommitLog::new(),
        })
    }
}

impl Engine for DispatchEngine {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn is_strict(&self) -> bool {
        self.resolver.is_strict()
    }

    fn apply(&mut self, input: &Value, target: &mut dyn QueryTarget) -> FilterResult<()> {
        let fields = super::flat_object(input)?;

        for (name, entry) in fields {
            let resolution = self
                .resolver
                .prepare(name, entry, target, &FieldPolicy::default());
            let Some(prepared) = self.resolver.settle(resolution)? else {
                continue;
            };

            let Some(handler) = self.handlers.get(name) else {
                let clause = prepared.attach_default(target);
                self.commits.record(clause.path(), clause);
                continue;
            };

            match handler.apply(prepared.payload(), target) {
                Ok(Some(clause)) => self.commits.record(clause.path(), clause),
                Ok(None) => self
                    .resolver
                    .fail(Failure::Skip(Skip::new(name.clone(), "handler produced no clause")))?,
                Err(err) => self.resolver.fail(Failure::Error(err))?,
            }
        }
        Ok(())
    }

    fn commits(&self) -> &CommitLog {
        &self.commits
    }
}
