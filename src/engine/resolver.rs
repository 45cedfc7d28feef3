//! Resolution steps shared by every engine
//!
//! Mapping and allow-list check, dissection, operator resolution,
//! sanitization, then the attribute pipeline. Engines differ only in what
//! they do with a `Prepared` field and in how they walk their input.

use std::sync::Arc;

use serde_json::Value;
use tracing::trace;

use crate::attribute::{AttributeContext, AttributePipeline};
use crate::clause::Clause;
use crate::config::FilterConfig;
use crate::dissector::Dissector;
use crate::errors::{FilterError, FilterResult};
use crate::mapping::{OperatorAllowList, OperatorMapper, RelationPath, RelationResolver};
use crate::payload::Payload;
use crate::policy::{self, Failure, Resolution};
use crate::sanitize::{SanitizePipeline, SanitizerSpec};
use crate::target::QueryTarget;

/// Per-field overrides an engine may apply on top of the configuration
#[derive(Debug, Default, Clone, Copy)]
pub struct FieldPolicy<'r> {
    /// Internal name to use instead of the field map
    pub column: Option<&'r str>,
    /// Default operator alias instead of the configured one
    pub default_operator: Option<&'r str>,
    /// Further restricts the configured operator set
    pub operators: Option<&'r OperatorAllowList>,
    /// Sanitizer to use instead of the per-field one
    pub sanitizer: Option<&'r SanitizerSpec>,
    /// The engine already decided the field is filterable
    pub pre_allowed: bool,
}

/// A field that passed every shared step
#[derive(Debug, Clone)]
pub struct Prepared {
    name: String,
    path: RelationPath,
    payload: Payload,
}

impl Prepared {
    /// External (caller-facing) name
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &RelationPath {
        &self.path
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// The default clause for this field.
    ///
    /// List operators get a normalized list value, null checks carry null.
    pub fn clause(&self) -> Clause {
        let operator = self.payload.operator();
        let value = if operator.is_nullary() {
            Value::Null
        } else if operator.is_list() {
            Value::Array(self.payload.to_list())
        } else {
            self.payload.value().clone()
        };

        if self.path.is_local() {
            Clause::new(self.path.field(), operator, value)
        } else {
            Clause::related(self.path.relation(), self.path.field(), operator, value)
        }
    }

    /// Attach the default clause to `target` and return it
    pub fn attach_default(&self, target: &mut dyn QueryTarget) -> Clause {
        let clause = self.clause();
        RelationResolver::resolve(target, &clause);
        clause
    }
}

/// Runs the shared steps against one configuration snapshot
#[derive(Debug, Clone)]
pub struct Resolver {
    config: Arc<FilterConfig>,
    dissector: Dissector,
    attributes: AttributePipeline,
}

impl Resolver {
    pub fn new(config: Arc<FilterConfig>) -> Self {
        let dissector = Dissector::new(config.keys().clone());
        let attributes = config.attributes().clone();
        Self {
            config,
            dissector,
            attributes,
        }
    }

    /// Replace the directive declarations this resolver runs
    pub fn with_attributes(mut self, attributes: AttributePipeline) -> Self {
        self.attributes = attributes;
        self
    }

    pub fn config(&self) -> &FilterConfig {
        &self.config
    }

    pub fn attributes(&self) -> &AttributePipeline {
        &self.attributes
    }

    pub fn is_strict(&self) -> bool {
        self.config.strict()
    }

    /// Take one `(name, entry)` pair through steps 1 to 5
    pub fn prepare(
        &self,
        name: &str,
        entry: &Value,
        target: &mut dyn QueryTarget,
        policy: &FieldPolicy<'_>,
    ) -> Resolution<Prepared> {
        match self.try_prepare(name, entry, target, policy) {
            Ok(resolution) => resolution,
            Err(err) => Resolution::Fatal(err),
        }
    }

    fn try_prepare(
        &self,
        name: &str,
        entry: &Value,
        target: &mut dyn QueryTarget,
        policy: &FieldPolicy<'_>,
    ) -> FilterResult<Resolution<Prepared>> {
        let config = &*self.config;
        let strict = self.is_strict();

        let mapped = match policy.column {
            Some(column) => column.to_string(),
            None => config.field_map().map(name),
        };
        let path = RelationPath::parse(&mapped);

        if !policy.pre_allowed {
            let allowed = if path.is_local() {
                config.allowed_fields().validate(&mapped, strict)?
            } else if path.is_allowed(config.relations()) {
                true
            } else if strict {
                return Err(FilterError::field_not_allowed(mapped));
            } else {
                false
            };
            if !allowed {
                return Ok(Resolution::skipped(name, "field not allowed"));
            }
        }

        let default_operator = policy
            .default_operator
            .unwrap_or_else(|| config.default_operator());
        let (alias, raw) = self.dissector.parse(entry, default_operator)?;

        let operator = OperatorMapper::resolve(name, &alias)?;
        let mut permitted = config.operators().validate(name, operator, strict)?;
        if let Some(narrowed) = policy.operators {
            permitted = permitted && narrowed.validate(name, operator, strict)?;
        }
        if !permitted {
            return Ok(Resolution::skipped(
                name,
                format!("operator '{}' not allowed", operator.alias()),
            ));
        }

        let value = match policy.sanitizer {
            Some(spec) => {
                SanitizePipeline::new(config.sanitizers().registry()).handle(raw.clone(), spec)?
            }
            None => config.sanitizers().handle(name, raw.clone())?,
        };
        let mut payload = Payload::new(mapped, operator, value, raw);

        if self.attributes.has_directives(name) {
            let mut ctx = AttributeContext::new(name, target, payload);
            self.attributes.process(&mut ctx, name)?;
            payload = ctx.into_payload();
        }

        trace!(field = name, operator = %operator, "field resolved");
        Ok(Resolution::Resolved(Prepared {
            name: name.to_string(),
            path,
            payload,
        }))
    }

    /// Hand an unresolved field to the policy.
    ///
    /// `Ok(Some)` when resolved, `Ok(None)` when skipped, `Err` on abort.
    pub fn settle(&self, resolution: Resolution<Prepared>) -> FilterResult<Option<Prepared>> {
        match resolution {
            Resolution::Resolved(prepared) => Ok(Some(prepared)),
            Resolution::Skipped(skip) => self.fail(Failure::Skip(skip)).map(|()| None),
            Resolution::Fatal(err) => self.fail(Failure::Error(err)).map(|()| None),
        }
    }

    /// Policy decision for a failure past the shared steps
    pub fn fail(&self, failure: Failure) -> FilterResult<()> {
        policy::handle(failure, self.is_strict(), self.config.strict_throwing())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::Directive;
    use crate::mapping::{Operator, RelationScope};
    use crate::target::Condition;
    use serde_json::json;

    fn resolver(strict: bool) -> Resolver {
        let config = FilterConfig::builder()
            .allow_fields(["status", "created_at", "tags"])
            .map_field("created", "created_at")
            .map_field("writer", "author.name")
            .relation("author", RelationScope::only(["name"]))
            .sanitize("status", SanitizerSpec::reference("trim"))
            .directives("status", [Directive::default_value("open")])
            .strict(strict)
            .build()
            .unwrap();
        Resolver::new(Arc::new(config))
    }

    fn prepare(resolver: &Resolver, name: &str, entry: Value) -> Resolution<Prepared> {
        let mut target: Vec<Condition> = Vec::new();
        resolver.prepare(name, &entry, &mut target, &FieldPolicy::default())
    }

    #[test]
    fn test_resolved_clause() {
        let r = resolver(false);
        let Resolution::Resolved(p) = prepare(&r, "created", json!("gte:2024-01-01")) else {
            panic!("expected resolution");
        };
        assert_eq!(
            p.clause(),
            Clause::new("created_at", Operator::Gte, json!("2024-01-01"))
        );
    }

    #[test]
    fn test_sanitize_then_directive() {
        let r = resolver(false);
        let Resolution::Resolved(p) = prepare(&r, "status", json!("   ")) else {
            panic!("expected resolution");
        };
        assert_eq!(p.payload().value(), &json!("open"));
        assert_eq!(p.payload().value_before_sanitize(), &json!("   "));
    }

    #[test]
    fn test_list_and_null_normalization() {
        let r = resolver(false);
        let Resolution::Resolved(p) = prepare(&r, "tags", json!("in:a, b")) else {
            panic!("expected resolution");
        };
        assert_eq!(p.clause().value(), &json!(["a", "b"]));

        let Resolution::Resolved(p) = prepare(&r, "tags", json!("is_null:whatever")) else {
            panic!("expected resolution");
        };
        assert_eq!(p.clause().value(), &Value::Null);
    }

    #[test]
    fn test_relation_field() {
        let r = resolver(false);
        let Resolution::Resolved(p) = prepare(&r, "writer", json!("Ann")) else {
            panic!("expected resolution");
        };
        assert_eq!(
            p.clause(),
            Clause::related("author", "name", Operator::Eq, json!("Ann"))
        );

        assert!(matches!(
            prepare(&r, "author.email", json!("x")),
            Resolution::Skipped(_)
        ));
    }

    #[test]
    fn test_not_allowed_depends_on_strictness() {
        assert!(matches!(
            prepare(&resolver(false), "secret", json!("x")),
            Resolution::Skipped(_)
        ));
        let Resolution::Fatal(err) = prepare(&resolver(true), "secret", json!("x")) else {
            panic!("expected fatal");
        };
        assert_eq!(err, FilterError::field_not_allowed("secret"));
    }

    #[test]
    fn test_unknown_operator_is_fatal_even_when_permissive() {
        let Resolution::Fatal(err) = prepare(&resolver(false), "status", json!("approx:1")) else {
            panic!("expected fatal");
        };
        assert_eq!(err, FilterError::operator_unresolvable("status", "approx"));
    }

    #[test]
    fn test_narrowed_operators() {
        let r = resolver(false);
        let narrowed = OperatorAllowList::empty().set(Operator::Eq);
        let policy = FieldPolicy {
            operators: Some(&narrowed),
            ..FieldPolicy::default()
        };
        let mut target: Vec<Condition> = Vec::new();
        assert!(matches!(
            r.prepare("tags", &json!("ne:a"), &mut target, &policy),
            Resolution::Skipped(_)
        ));
    }

    #[test]
    fn test_settle() {
        let r = resolver(false);
        assert!(r.settle(Resolution::skipped("x", "y")).unwrap().is_none());
        assert!(r
            .settle(Resolution::Fatal(FilterError::data_shape("x", "bad")))
            .is_err());
    }
}
