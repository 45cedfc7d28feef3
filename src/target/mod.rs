//! Query targets
//!
//! The store-facing side of a run. Engines only ever see the
//! `QueryTarget` trait; `QueryBuilder` and `MemoryStore` are the
//! in-memory implementation used by the CLI and tests.

mod builder;
mod condition;
mod store;

pub use builder::QueryBuilder;
pub use condition::{Boolean, Condition, QueryTarget};
pub use store::{MemoryStore, QueryExecuted, QueryListener};
