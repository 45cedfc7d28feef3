//! Mutable state scoped to one field-handler invocation

use std::collections::BTreeMap;

use serde_json::Value;

use crate::payload::Payload;
use crate::target::QueryTarget;

/// Shared by every directive that runs for one field.
///
/// Later directives see what earlier ones did through this context.
pub struct AttributeContext<'a> {
    name: String,
    target: &'a mut dyn QueryTarget,
    payload: Payload,
    state: BTreeMap<String, Value>,
}

impl<'a> AttributeContext<'a> {
    pub fn new(name: impl Into<String>, target: &'a mut dyn QueryTarget, payload: Payload) -> Self {
        Self {
            name: name.into(),
            target,
            payload,
            state: BTreeMap::new(),
        }
    }

    /// Name of the field handler the directives are declared on
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn target(&mut self) -> &mut dyn QueryTarget {
        &mut *self.target
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Replace the payload value before the field is resolved
    pub fn replace_value(&mut self, value: Value) {
        self.payload.replace_value(value);
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.state.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.state.insert(key.into(), value);
    }

    pub fn into_payload(self) -> Payload {
        self.payload
    }
}
