//! Field, operator and relation mapping
//!
//! Translates caller-facing names into internal ones and enforces the
//! allow-lists. Each collection is a narrow typed map exposing
//! `has/get/set/merge/all`; `set` and `merge` consume the map, so a
//! built configuration cannot change mid-run.

mod fields;
mod operators;
mod relation;

pub use fields::{AllowList, FieldMap};
pub use operators::{Operator, OperatorAllowList, OperatorMapper};
pub use relation::{RelationAllowList, RelationPath, RelationResolver, RelationScope};
