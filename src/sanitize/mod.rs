//! Sanitization pipeline
//!
//! Values are transformed before they become part of a Clause. A spec is
//! a named reference, a function, an ordered chain, or a sanitizer
//! object; chains fold left to right.

mod fields;
mod registry;
mod spec;

pub use fields::Sanitizers;
pub use registry::SanitizerRegistry;
pub use spec::{SanitizePipeline, Sanitizer, SanitizerSpec};
