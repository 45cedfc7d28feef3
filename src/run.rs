//! Run orchestration
//!
//! One `FilterRun` per caller request: gates are checked once, a fresh
//! engine is built, the criteria are applied and a report comes back.
//! Configuration is shared between runs; engines and commit logs are not.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::{info, info_span, warn};
use uuid::Uuid;

use crate::clause::Clause;
use crate::config::FilterConfig;
use crate::engine::{EngineArgs, EngineFactory, EngineSpec, HandlerMap};
use crate::errors::{FilterError, FilterResult};
use crate::target::QueryTarget;

/// Decides whether the caller may filter at all
pub trait AuthorizationGate {
    fn authorize(&self) -> bool;
}

impl<F> AuthorizationGate for F
where
    F: Fn() -> bool,
{
    fn authorize(&self) -> bool {
        self()
    }
}

/// Request-level validation, checked before any field resolves
pub trait ValidationGate {
    fn validate(&self) -> FilterResult<()>;
}

impl<F> ValidationGate for F
where
    F: Fn() -> FilterResult<()>,
{
    fn validate(&self) -> FilterResult<()> {
        self()
    }
}

/// Outcome of a completed run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub engine: String,
    pub started_at: DateTime<Utc>,
    pub clauses: Vec<Clause>,
}

/// A single filter request
pub struct FilterRun {
    config: Arc<FilterConfig>,
    factory: EngineFactory,
    handlers: HandlerMap,
    authorization: Option<Box<dyn AuthorizationGate>>,
    validation: Option<Box<dyn ValidationGate>>,
}

impl FilterRun {
    pub fn new(config: Arc<FilterConfig>) -> Self {
        Self {
            config,
            factory: EngineFactory::new(),
            handlers: HandlerMap::new(),
            authorization: None,
            validation: None,
        }
    }

    pub fn with_factory(mut self, factory: EngineFactory) -> Self {
        self.factory = factory;
        self
    }

    /// Field handlers for the dispatch engine
    pub fn with_handlers(mut self, handlers: HandlerMap) -> Self {
        self.handlers = handlers;
        self
    }

    pub fn authorize_with(mut self, gate: impl AuthorizationGate + 'static) -> Self {
        self.authorization = Some(Box::new(gate));
        self
    }

    pub fn validate_with(mut self, gate: impl ValidationGate + 'static) -> Self {
        self.validation = Some(Box::new(gate));
        self
    }

    /// Apply `input` to `target` with the engine `spec` describes.
    ///
    /// On abort the target keeps whatever was attached before the failing
    /// field and the error is returned. Callers that need the partial
    /// commit log drive the engine from `EngineFactory::make` themselves.
    pub fn execute(
        self,
        spec: EngineSpec,
        input: &Value,
        target: &mut dyn QueryTarget,
    ) -> FilterResult<RunReport> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let timer = Instant::now();

        let args = EngineArgs::new(Arc::clone(&self.config)).with_handlers(self.handlers);
        let mut engine = self.factory.make(spec, args)?;

        let span = info_span!("filter_run", run_id = %run_id, engine = engine.name());
        let _enter = span.enter();

        if let Some(gate) = &self.authorization {
            if !gate.authorize() {
                warn!("authorization gate rejected run");
                return Err(FilterError::Unauthorized);
            }
        }
        if let Some(gate) = &self.validation {
            gate.validate()?;
        }

        if let Err(err) = engine.apply(input, target) {
            warn!(
                code = err.code(),
                committed = engine.commits().len(),
                "filter run aborted"
            );
            return Err(err);
        }

        let clauses = engine.commits().to_vec();
        info!(
            clauses = clauses.len(),
            strict = engine.is_strict(),
            elapsed_us = timer.elapsed().as_micros() as u64,
            "filter run complete"
        );

        Ok(RunReport {
            run_id,
            engine: engine.name().to_string(),
            started_at,
            clauses,
        })
    }
}
