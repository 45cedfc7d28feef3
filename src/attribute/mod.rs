//! Attribute pipeline
//!
//! Declarative per-handler pre-processing. Directives declared for a
//! field handler run in declaration order, all before that field's own
//! resolution; a failing directive stops the field from resolving.

mod context;
mod directive;
mod registry;

pub use context::AttributeContext;
pub use directive::Directive;
pub use registry::{
    AttributeHandler, AttributePipeline, AttributeRegistry, DefaultValueHandler, RequiredHandler,
    REQUIRED_MESSAGE,
};
