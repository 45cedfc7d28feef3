//! Clause-building engines
//!
//! Every engine turns caller criteria into clauses on a query target
//! through the same shared steps (`Resolver`) and the same skip-vs-abort
//! policy. They differ in input shape and in how a resolved field becomes
//! a clause:
//!
//! - `tree`: nested AND/OR groups
//! - `ruleset`: declarative per-field rule table
//! - `expression`: text expression parsed into the tree model
//! - `dispatch`: per-field handlers
//!
//! Engines hold per-run state (the commit log) and are created fresh for
//! every run.

mod dispatch;
mod expression;
mod factory;
mod resolver;
mod ruleset;
mod tree;

pub use dispatch::{DispatchEngine, FieldHandler, HandlerMap};
pub use expression::{parse_expression, ExpressionEngine};
pub use factory::{EngineArgs, EngineFactory, EngineSpec, BUILTIN_ENGINES};
pub use resolver::{FieldPolicy, Prepared, Resolver};
pub use ruleset::{Rule, RuleConfig, RuleSet, RulesetEngine};
pub use tree::{Node, TreeEngine};

use serde_json::{Map, Value};

use crate::clause::CommitLog;
use crate::dissector::json_type_name;
use crate::errors::{FilterError, FilterResult};
use crate::target::QueryTarget;

/// Contract shared by all engines
pub trait Engine {
    /// Short name, as used in configuration
    fn name(&self) -> &str;

    fn is_strict(&self) -> bool;

    /// Resolve `input` and attach the resulting clauses to `target`.
    ///
    /// An `Err` aborts the run; fields already committed stay committed.
    fn apply(&mut self, input: &Value, target: &mut dyn QueryTarget) -> FilterResult<()>;

    /// Clauses applied so far, in application order
    fn commits(&self) -> &CommitLog;
}

/// Criteria for flat engines: an object of `name → entry`
fn flat_object(input: &Value) -> FilterResult<&Map<String, Value>> {
    match input {
        Value::Object(map) => Ok(map),
        other => Err(FilterError::data_shape(
            "$criteria",
            format!("criteria must be an object, got {}", json_type_name(other)),
        )),
    }
}
