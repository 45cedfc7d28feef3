//! Criteria entry tokenizer
//!
//! Splits one raw criteria entry into `(operator, value)`. No operator
//! canonicalization happens here; the operator comes back exactly as
//! the caller wrote it.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{FilterError, FilterResult};

/// Delimiter between operator and value in text entries
pub const OPERATOR_DELIMITER: char = ':';

/// Sub-key names used when an entry is a record instead of text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClauseKeys {
    #[serde(default = "default_field_key")]
    pub field: String,

    #[serde(default = "default_operator_key")]
    pub operator: String,

    #[serde(default = "default_value_key")]
    pub value: String,
}

fn default_field_key() -> String {
    "field".to_string()
}

fn default_operator_key() -> String {
    "operator".to_string()
}

fn default_value_key() -> String {
    "value".to_string()
}

impl Default for ClauseKeys {
    fn default() -> Self {
        Self {
            field: default_field_key(),
            operator: default_operator_key(),
            value: default_value_key(),
        }
    }
}

/// Tokenizes raw criteria entries
#[derive(Debug, Clone, Default)]
pub struct Dissector {
    keys: ClauseKeys,
}

impl Dissector {
    pub fn new(keys: ClauseKeys) -> Self {
        Self { keys }
    }

    pub fn keys(&self) -> &ClauseKeys {
        &self.keys
    }

    /// Parse one entry into `(operator, value)`.
    ///
    /// - record with both operator and value sub-keys → used verbatim
    /// - text with `:` → split on the first `:`
    /// - anything else, arrays and key-less records included → `(default, entry)`
    ///
    /// A record carrying only one of the two sub-keys is rejected.
    pub fn parse(&self, entry: &Value, default_operator: &str) -> FilterResult<(String, Value)> {
        match entry {
            Value::Object(map) => {
                let operator = map.get(&self.keys.operator);
                let value = map.get(&self.keys.value);
                match (operator, value) {
                    (Some(Value::String(op)), Some(value)) => Ok((op.clone(), value.clone())),
                    (Some(other), Some(_)) => Err(FilterError::data_shape(
                        self.field_hint(map),
                        format!("operator must be text, got {}", json_type_name(other)),
                    )),
                    (None, None) => Ok((default_operator.to_string(), entry.clone())),
                    _ => Err(FilterError::data_shape(
                        self.field_hint(map),
                        format!(
                            "record must carry both '{}' and '{}'",
                            self.keys.operator, self.keys.value
                        ),
                    )),
                }
            }
            Value::String(text) => match text.split_once(OPERATOR_DELIMITER) {
                Some((op, value)) => Ok((op.to_string(), Value::String(value.to_string()))),
                None => Ok((default_operator.to_string(), entry.clone())),
            },
            _ => Ok((default_operator.to_string(), entry.clone())),
        }
    }

    fn field_hint(&self, map: &serde_json::Map<String, Value>) -> String {
        map.get(&self.keys.field)
            .and_then(Value::as_str)
            .unwrap_or("$entry")
            .to_string()
    }
}

/// JSON type name for error messages
pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
