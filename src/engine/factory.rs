//! Engine selection

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::config::FilterConfig;
use crate::errors::{FilterError, FilterResult};

use super::dispatch::{DispatchEngine, HandlerMap};
use super::expression::ExpressionEngine;
use super::ruleset::RulesetEngine;
use super::tree::TreeEngine;
use super::Engine;

/// Short names resolvable without registration
pub const BUILTIN_ENGINES: [&str; 4] = [
    TreeEngine::NAME,
    RulesetEngine::NAME,
    ExpressionEngine::NAME,
    DispatchEngine::NAME,
];

/// What engine constructors receive
#[derive(Debug, Clone)]
pub struct EngineArgs {
    pub config: Arc<FilterConfig>,
    pub handlers: HandlerMap,
}

impl EngineArgs {
    pub fn new(config: Arc<FilterConfig>) -> Self {
        Self {
            config,
            handlers: HandlerMap::new(),
        }
    }

    pub fn with_handlers(mut self, handlers: HandlerMap) -> Self {
        self.handlers = handlers;
        self
    }
}

/// How to obtain an engine
pub enum EngineSpec {
    /// Ready-made engine, used as is
    Instance(Box<dyn Engine>),
    /// Constructor registered on the factory under this id
    Custom(String),
    /// Built-in short name
    Named(String),
}

impl fmt::Debug for EngineSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineSpec::Instance(engine) => write!(f, "Instance({})", engine.name()),
            EngineSpec::Custom(id) => f.debug_tuple("Custom").field(id).finish(),
            EngineSpec::Named(name) => f.debug_tuple("Named").field(name).finish(),
        }
    }
}

impl EngineSpec {
    pub fn instance(engine: impl Engine + 'static) -> Self {
        EngineSpec::Instance(Box::new(engine))
    }

    pub fn custom(id: impl Into<String>) -> Self {
        EngineSpec::Custom(id.into())
    }

    pub fn named(name: impl Into<String>) -> Self {
        EngineSpec::Named(name.into())
    }
}

type Constructor = dyn Fn(EngineArgs) -> FilterResult<Box<dyn Engine>> + Send + Sync;

/// Builds engines from specs
#[derive(Clone, Default)]
pub struct EngineFactory {
    constructors: BTreeMap<String, Arc<Constructor>>,
}

impl fmt::Debug for EngineFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.constructors.keys()).finish()
    }
}

impl EngineFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(mut self, id: impl Into<String>, constructor: F) -> Self
    where
        F: Fn(EngineArgs) -> FilterResult<Box<dyn Engine>> + Send + Sync + 'static,
    {
        self.constructors.insert(id.into(), Arc::new(constructor));
        self
    }

    pub fn has(&self, id: &str) -> bool {
        self.constructors.contains_key(id)
    }

    pub fn make(&self, spec: EngineSpec, args: EngineArgs) -> FilterResult<Box<dyn Engine>> {
        match spec {
            EngineSpec::Instance(engine) => Ok(engine),
            EngineSpec::Custom(id) => {
                let constructor = self.constructors.get(&id).ok_or_else(|| {
                    FilterError::configuration(format!("no engine registered under '{}'", id))
                })?;
                constructor(args)
            }
            EngineSpec::Named(name) => Self::builtin(&name, args),
        }
    }

    fn builtin(name: &str, args: EngineArgs) -> FilterResult<Box<dyn Engine>> {
        let EngineArgs { config, handlers } = args;
        match name {
            TreeEngine::NAME => Ok(Box::new(TreeEngine::new(config))),
            RulesetEngine::NAME => Ok(Box::new(RulesetEngine::new(config))),
            ExpressionEngine::NAME => Ok(Box::new(ExpressionEngine::new(config))),
            DispatchEngine::NAME => Ok(Box::new(DispatchEngine::new(config, handlers)?)),
            other => Err(FilterError::configuration(format!(
                "unknown engine '{}'; expected one of {}",
                other,
                BUILTIN_ENGINES.join(", ")
            ))),
        }
    }
}
