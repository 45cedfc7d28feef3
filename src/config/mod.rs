//! Configuration
//!
//! `RunConfig` is the on-disk JSON form; `FilterConfig` is the validated
//! runtime snapshot engines read from.

mod filter;
mod run;

pub use filter::{FilterConfig, FilterConfigBuilder};
pub use run::RunConfig;
