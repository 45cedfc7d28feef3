//! Payload: one resolved criteria entry before it becomes a Clause
//!
//! Built after sanitization, so it carries both the sanitized value and
//! the original value the caller sent.

use serde_json::Value;

use crate::mapping::Operator;

/// Value container with typed predicate helpers
#[derive(Debug, Clone, PartialEq)]
pub struct Payload {
    field: String,
    operator: Operator,
    value: Value,
    value_before_sanitize: Value,
}

impl Payload {
    pub fn new(
        field: impl Into<String>,
        operator: Operator,
        value: Value,
        value_before_sanitize: Value,
    ) -> Self {
        Self {
            field: field.into(),
            operator,
            value,
            value_before_sanitize,
        }
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn operator(&self) -> Operator {
        self.operator
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn value_before_sanitize(&self) -> &Value {
        &self.value_before_sanitize
    }

    pub fn into_value(self) -> Value {
        self.value
    }

    /// The one sanctioned mutation, used by pre-processing directives
    pub(crate) fn replace_value(&mut self, value: Value) {
        self.value = value;
    }

    /// Null, blank text, or an empty array/object
    pub fn is_empty(&self) -> bool {
        match &self.value {
            Value::Null => true,
            Value::String(s) => s.trim().is_empty(),
            Value::Array(items) => items.is_empty(),
            Value::Object(map) => map.is_empty(),
            Value::Bool(_) | Value::Number(_) => false,
        }
    }

    pub fn is_null(&self) -> bool {
        self.value.is_null()
    }

    /// Booleans, plus the textual forms callers send in query strings
    pub fn is_boolean(&self) -> bool {
        self.as_bool().is_some()
    }

    pub fn is_numeric(&self) -> bool {
        self.as_f64().is_some()
    }

    /// Text that parses as a JSON object or array
    pub fn is_json(&self) -> bool {
        match &self.value {
            Value::String(s) => matches!(
                serde_json::from_str::<Value>(s),
                Ok(Value::Object(_)) | Ok(Value::Array(_))
            ),
            _ => false,
        }
    }

    pub fn is_array(&self) -> bool {
        self.value.is_array()
    }

    pub fn as_bool(&self) -> Option<bool> {
        match &self.value {
            Value::Bool(b) => Some(*b),
            Value::Number(n) => match n.as_i64() {
                Some(0) => Some(false),
                Some(1) => Some(true),
                _ => None,
            },
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => Some(true),
                "false" | "0" | "no" | "off" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match &self.value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match &self.value {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse::<i64>().ok(),
            _ => None,
        }
    }

    /// Decodes JSON text; other values are returned as-is
    pub fn to_json(&self) -> Value {
        match &self.value {
            Value::String(s) => serde_json::from_str(s).unwrap_or_else(|_| self.value.clone()),
            other => other.clone(),
        }
    }

    /// List form of the value, used by `IN` / `NOT IN`.
    ///
    /// Arrays pass through, JSON array text is decoded, other text is
    /// split on commas, and any other scalar becomes a one-element list.
    pub fn to_list(&self) -> Vec<Value> {
        match &self.value {
            Value::Array(items) => items.clone(),
            Value::Null => Vec::new(),
            Value::String(s) => {
                if let Ok(Value::Array(items)) = serde_json::from_str::<Value>(s) {
                    return items;
                }
                s.split(',')
                    .map(str::trim)
                    .filter(|part| !part.is_empty())
                    .map(|part| Value::String(part.to_string()))
                    .collect()
            }
            other => vec![other.clone()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(value: Value) -> Payload {
        Payload::new("status", Operator::Eq, value.clone(), value)
    }

    #[test]
    fn test_empty() {
        assert!(payload(json!(null)).is_empty());
        assert!(payload(json!("   ")).is_empty());
        assert!(payload(json!([])).is_empty());
        assert!(payload(json!({})).is_empty());
        assert!(!payload(json!(0)).is_empty());
        assert!(!payload(json!(false)).is_empty());
        assert!(!payload(json!("x")).is_empty());
    }

    #[test]
    fn test_typed_predicates() {
        assert!(payload(json!("yes")).is_boolean());
        assert_eq!(payload(json!("off")).as_bool(), Some(false));
        assert!(payload(json!("12.5")).is_numeric());
        assert!(!payload(json!("12a")).is_numeric());
        assert_eq!(payload(json!(" 42 ")).as_i64(), Some(42));
        assert!(payload(json!("{\"a\":1}")).is_json());
        assert!(!payload(json!("plain")).is_json());
        assert!(payload(json!([1])).is_array());
    }

    #[test]
    fn test_to_json() {
        assert_eq!(payload(json!("{\"a\":1}")).to_json(), json!({"a": 1}));
        assert_eq!(payload(json!("[1, 2]")).to_json(), json!([1, 2]));
        assert_eq!(payload(json!("plain")).to_json(), json!("plain"));
        assert_eq!(payload(json!(7)).to_json(), json!(7));
    }

    #[test]
    fn test_to_list() {
        assert_eq!(payload(json!("a, b,,c")).to_list(), vec![json!("a"), json!("b"), json!("c")]);
        assert_eq!(payload(json!("[1,2]")).to_list(), vec![json!(1), json!(2)]);
        assert_eq!(payload(json!([1, 2])).to_list(), vec![json!(1), json!(2)]);
        assert_eq!(payload(json!(7)).to_list(), vec![json!(7)]);
    }

    #[test]
    fn test_keeps_original_value() {
        let p = Payload::new("name", Operator::Like, json!("abc"), json!("  ABC "));
        assert_eq!(p.value(), &json!("abc"));
        assert_eq!(p.value_before_sanitize(), &json!("  ABC "));
    }
}
