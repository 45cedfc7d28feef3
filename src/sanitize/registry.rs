//! Named sanitizers

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use regex::Regex;
use serde_json::Value;

use crate::errors::{FilterError, FilterResult};

use super::spec::Sanitizer;

type Factory = dyn Fn() -> Box<dyn Sanitizer> + Send + Sync;

/// Name → sanitizer factory
#[derive(Clone, Default)]
pub struct SanitizerRegistry {
    factories: BTreeMap<String, Arc<Factory>>,
}

impl SanitizerRegistry {
    /// Registry with no sanitizers at all
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with the built-in sanitizers
    pub fn with_builtins() -> Self {
        Self::new()
            .register("trim", || Box::new(TextSanitizer(|s| s.trim().to_string())))
            .register("uppercase", || Box::new(TextSanitizer(|s| s.to_uppercase())))
            .register("lowercase", || Box::new(TextSanitizer(|s| s.to_lowercase())))
            .register("strip_tags", || Box::new(TextSanitizer(strip_tags)))
            .register("collapse_whitespace", || {
                Box::new(TextSanitizer(|s| {
                    s.split_whitespace().collect::<Vec<_>>().join(" ")
                }))
            })
            .register("escape_like", || Box::new(TextSanitizer(escape_like)))
            .register("to_int", || Box::new(Cast::Int))
            .register("to_float", || Box::new(Cast::Float))
            .register("to_bool", || Box::new(Cast::Bool))
            .register("null_if_empty", || Box::new(NullIfEmpty))
    }

    pub fn register<F>(mut self, name: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> Box<dyn Sanitizer> + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Arc::new(factory));
        self
    }

    pub fn has(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    /// Fresh sanitizer instance for `name`
    pub fn instantiate(&self, name: &str) -> FilterResult<Box<dyn Sanitizer>> {
        self.factories
            .get(name)
            .map(|factory| factory())
            .ok_or_else(|| FilterError::configuration(format!("unknown sanitizer '{}'", name)))
    }
}

impl fmt::Debug for SanitizerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.names()).finish()
    }
}

/// Applies a text transform to strings, element-wise to arrays
struct TextSanitizer(fn(&str) -> String);

impl TextSanitizer {
    fn apply(&self, value: Value) -> Value {
        match value {
            Value::String(s) => Value::String((self.0)(&s)),
            Value::Array(items) => Value::Array(items.into_iter().map(|v| self.apply(v)).collect()),
            other => other,
        }
    }
}

impl Sanitizer for TextSanitizer {
    fn sanitize(&self, value: Value) -> FilterResult<Value> {
        Ok(self.apply(value))
    }
}

fn strip_tags(s: &str) -> String {
    static TAGS: OnceLock<Option<Regex>> = OnceLock::new();
    match TAGS.get_or_init(|| Regex::new(r"<[^>]*>").ok()) {
        Some(re) => re.replace_all(s, "").into_owned(),
        None => s.to_string(),
    }
}

/// Escape LIKE wildcards so the value matches literally
fn escape_like(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Type casts; input that cannot be cast becomes null
enum Cast {
    Int,
    Float,
    Bool,
}

impl Cast {
    fn apply(&self, value: Value) -> Value {
        match value {
            Value::Array(items) => Value::Array(items.into_iter().map(|v| self.apply(v)).collect()),
            Value::Null => Value::Null,
            scalar => match self {
                Cast::Int => cast_int(&scalar).map(Value::from).unwrap_or(Value::Null),
                Cast::Float => cast_float(&scalar)
                    .and_then(serde_json::Number::from_f64)
                    .map(Value::Number)
                    .unwrap_or(Value::Null),
                Cast::Bool => cast_bool(&scalar).map(Value::Bool).unwrap_or(Value::Null),
            },
        }
    }
}

impl Sanitizer for Cast {
    fn sanitize(&self, value: Value) -> FilterResult<Value> {
        Ok(self.apply(value))
    }
}

fn cast_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| {
                    s.parse::<f64>()
                        .ok()
                        .filter(|f| f.is_finite())
                        .map(|f| f.trunc() as i64)
                })
        }
        Value::Bool(b) => Some(i64::from(*b)),
        _ => None,
    }
}

fn cast_float(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

fn cast_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_f64().map(|f| f != 0.0),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Some(true),
            "false" | "0" | "no" | "off" | "" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

struct NullIfEmpty;

impl Sanitizer for NullIfEmpty {
    fn sanitize(&self, value: Value) -> FilterResult<Value> {
        let empty = match &value {
            Value::String(s) => s.trim().is_empty(),
            Value::Array(items) => items.is_empty(),
            Value::Object(map) => map.is_empty(),
            _ => false,
        };
        Ok(if empty { Value::Null } else { value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn run(name: &str, value: Value) -> Value {
        SanitizerRegistry::with_builtins()
            .instantiate(name)
            .unwrap()
            .sanitize(value)
            .unwrap()
    }

    #[test]
    fn test_text_sanitizers() {
        assert_eq!(run("trim", json!("  a  ")), json!("a"));
        assert_eq!(run("uppercase", json!("  value")), json!("  VALUE"));
        assert_eq!(run("lowercase", json!(["A", "B"])), json!(["a", "b"]));
        assert_eq!(run("strip_tags", json!("<b>bold</b>")), json!("bold"));
        assert_eq!(run("collapse_whitespace", json!(" a   b ")), json!("a b"));
        assert_eq!(run("escape_like", json!("50%_off")), json!("50\\%\\_off"));
        assert_eq!(run("trim", json!(5)), json!(5));
    }

    #[test]
    fn test_casts() {
        assert_eq!(run("to_int", json!("42")), json!(42));
        assert_eq!(run("to_int", json!("4.9")), json!(4));
        assert_eq!(run("to_int", json!("abc")), Value::Null);
        assert_eq!(run("to_float", json!("2.5")), json!(2.5));
        assert_eq!(run("to_bool", json!("yes")), json!(true));
        assert_eq!(run("to_bool", json!(["0", "1"])), json!([false, true]));
    }

    #[test]
    fn test_null_if_empty() {
        assert_eq!(run("null_if_empty", json!("  ")), Value::Null);
        assert_eq!(run("null_if_empty", json!("x")), json!("x"));
    }

    #[test]
    fn test_register_custom() {
        let registry = SanitizerRegistry::new().register("trim", || {
            Box::new(TextSanitizer(|s| s.trim_start().to_string()))
        });
        assert!(registry.has("trim"));
        assert!(!registry.has("uppercase"));
        let out = registry.instantiate("trim").unwrap().sanitize(json!(" a ")).unwrap();
        assert_eq!(out, json!("a "));
    }
}
