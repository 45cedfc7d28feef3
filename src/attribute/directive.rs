//! Pre-processing directives declared alongside a field handler

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One declarative pre-processing step.
///
/// Configuration form: `{"kind": "default_value", "value": ...}`,
/// `{"kind": "required", "message": "..."}`, or any other `kind` with
/// free-form arguments for handlers registered at runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawDirective", into = "RawDirective")]
pub enum Directive {
    /// Replace an empty value
    DefaultValue(Value),
    /// Abort when the value is empty or null; `{field}` in the message is
    /// replaced with the field name
    Required(Option<String>),
    /// Handled by a runtime-registered attribute handler
    Custom { kind: String, args: Map<String, Value> },
}

pub const DEFAULT_VALUE: &str = "default_value";
pub const REQUIRED: &str = "required";

impl Directive {
    pub fn default_value(value: impl Into<Value>) -> Self {
        Directive::DefaultValue(value.into())
    }

    pub fn required() -> Self {
        Directive::Required(None)
    }

    pub fn required_with(message: impl Into<String>) -> Self {
        Directive::Required(Some(message.into()))
    }

    pub fn custom(kind: impl Into<String>, args: Map<String, Value>) -> Self {
        Directive::Custom {
            kind: kind.into(),
            args,
        }
    }

    /// Key into the attribute registry
    pub fn kind(&self) -> &str {
        match self {
            Directive::DefaultValue(_) => DEFAULT_VALUE,
            Directive::Required(_) => REQUIRED,
            Directive::Custom { kind, .. } => kind,
        }
    }
}

#[derive(Serialize, Deserialize)]
struct RawDirective {
    kind: String,
    #[serde(flatten)]
    args: Map<String, Value>,
}

impl From<RawDirective> for Directive {
    fn from(raw: RawDirective) -> Self {
        match raw.kind.as_str() {
            DEFAULT_VALUE => {
                Directive::DefaultValue(raw.args.get("value").cloned().unwrap_or(Value::Null))
            }
            REQUIRED => Directive::Required(
                raw.args
                    .get("message")
                    .and_then(Value::as_str)
                    .map(str::to_string),
            ),
            _ => Directive::Custom {
                kind: raw.kind,
                args: raw.args,
            },
        }
    }
}

impl From<Directive> for RawDirective {
    fn from(directive: Directive) -> Self {
        let kind = directive.kind().to_string();
        let mut args = Map::new();
        match directive {
            Directive::DefaultValue(value) => {
                args.insert("value".into(), value);
            }
            Directive::Required(Some(message)) => {
                args.insert("message".into(), Value::String(message));
            }
            Directive::Required(None) => {}
            Directive::Custom { args: custom, .. } => args = custom,
        }
        RawDirective { kind, args }
    }
}
