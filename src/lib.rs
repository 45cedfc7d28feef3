//! sifter - declarative, policy-driven query filtering
//!
//! Resolves loosely structured caller criteria into typed clauses on a
//! query target. Field, operator and relation names pass allow-lists,
//! values pass sanitizers and per-field directives, and one of four
//! engines decides how resolved fields become clauses. A single policy
//! decides whether a failing field is skipped or aborts the run.

pub mod attribute;
pub mod clause;
pub mod cli;
pub mod config;
pub mod dissector;
pub mod engine;
pub mod errors;
pub mod mapping;
pub mod payload;
pub mod policy;
pub mod run;
pub mod sanitize;
pub mod target;

pub use clause::{Clause, CommitLog};
pub use config::{FilterConfig, RunConfig};
pub use engine::{Engine, EngineArgs, EngineFactory, EngineSpec};
pub use errors::{ErrorClass, FilterError, FilterResult};
pub use run::{AuthorizationGate, FilterRun, RunReport, ValidationGate};
