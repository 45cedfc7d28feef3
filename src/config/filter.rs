//! Runtime filter configuration
//!
//! Built once from a `RunConfig` (or programmatically) and then shared
//! read-only between runs.

use crate::attribute::{AttributePipeline, AttributeRegistry, Directive};
use crate::dissector::ClauseKeys;
use crate::engine::{Rule, RuleSet};
use crate::errors::{FilterError, FilterResult};
use crate::mapping::{
    AllowList, FieldMap, Operator, OperatorAllowList, RelationAllowList, RelationScope,
};
use crate::sanitize::{SanitizerRegistry, SanitizerSpec, Sanitizers};

use super::run::RunConfig;

/// Immutable snapshot every engine of a run reads from
#[derive(Debug, Clone)]
pub struct FilterConfig {
    allowed_fields: AllowList,
    field_map: FieldMap,
    operators: OperatorAllowList,
    relations: RelationAllowList,
    sanitizers: Sanitizers,
    attributes: AttributePipeline,
    keys: ClauseKeys,
    default_operator: String,
    strict: bool,
    strict_throwing: bool,
    rules: RuleSet,
}

impl FilterConfig {
    pub fn builder() -> FilterConfigBuilder {
        FilterConfigBuilder::default()
    }

    /// Build the runtime snapshot from a configuration file
    pub fn from_run_config(
        config: &RunConfig,
        sanitizer_registry: SanitizerRegistry,
        attribute_registry: AttributeRegistry,
    ) -> FilterResult<Self> {
        config.validate()?;

        let mut builder = Self::builder()
            .allow_fields(config.allowed_fields.iter().cloned())
            .operators(OperatorAllowList::from_aliases(&config.allowed_operators)?)
            .keys(config.clause_keys.clone())
            .default_operator(config.default_operator.clone())
            .strict(config.strict)
            .strict_throwing(config.strict_throwing)
            .sanitizer_registry(sanitizer_registry)
            .attribute_registry(attribute_registry);

        for (external, internal) in &config.field_map {
            builder = builder.map_field(external.clone(), internal.clone());
        }
        for (relation, scope) in &config.relations {
            builder = builder.relation(relation.clone(), scope.clone());
        }
        for (field, raw) in &config.sanitizers {
            builder = builder.sanitize(field.clone(), SanitizerSpec::from_value(raw)?);
        }
        for (field, directives) in &config.directives {
            builder = builder.directives(field.clone(), directives.iter().cloned());
        }
        for (field, rule) in &config.rules {
            builder = builder.rule(field.clone(), Rule::from_config(field, rule)?);
        }

        builder.build()
    }

    pub fn allowed_fields(&self) -> &AllowList {
        &self.allowed_fields
    }

    pub fn field_map(&self) -> &FieldMap {
        &self.field_map
    }

    pub fn operators(&self) -> &OperatorAllowList {
        &self.operators
    }

    pub fn relations(&self) -> &RelationAllowList {
        &self.relations
    }

    pub fn sanitizers(&self) -> &Sanitizers {
        &self.sanitizers
    }

    pub fn attributes(&self) -> &AttributePipeline {
        &self.attributes
    }

    pub fn keys(&self) -> &ClauseKeys {
        &self.keys
    }

    pub fn default_operator(&self) -> &str {
        &self.default_operator
    }

    pub fn strict(&self) -> bool {
        self.strict
    }

    pub fn strict_throwing(&self) -> bool {
        self.strict_throwing
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }
}

/// Programmatic construction of a `FilterConfig`
#[derive(Debug)]
pub struct FilterConfigBuilder {
    allowed_fields: AllowList,
    field_map: FieldMap,
    operators: OperatorAllowList,
    relations: RelationAllowList,
    sanitizer_specs: Vec<(String, SanitizerSpec)>,
    sanitizer_registry: SanitizerRegistry,
    declarations: Vec<(String, Vec<Directive>)>,
    attribute_registry: AttributeRegistry,
    keys: ClauseKeys,
    default_operator: String,
    strict: bool,
    strict_throwing: bool,
    rules: RuleSet,
}

impl Default for FilterConfigBuilder {
    fn default() -> Self {
        Self {
            allowed_fields: AllowList::new(),
            field_map: FieldMap::new(),
            operators: OperatorAllowList::all_operators(),
            relations: RelationAllowList::new(),
            sanitizer_specs: Vec::new(),
            sanitizer_registry: SanitizerRegistry::with_builtins(),
            declarations: Vec::new(),
            attribute_registry: AttributeRegistry::with_builtins(),
            keys: ClauseKeys::default(),
            default_operator: Operator::Eq.alias().to_string(),
            strict: false,
            strict_throwing: false,
            rules: RuleSet::new(),
        }
    }
}

impl FilterConfigBuilder {
    pub fn allow(mut self, field: impl Into<String>) -> Self {
        self.allowed_fields = self.allowed_fields.set(field);
        self
    }

    pub fn allow_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_fields = self.allowed_fields.merge(&fields.into_iter().collect::<AllowList>());
        self
    }

    pub fn map_field(mut self, external: impl Into<String>, internal: impl Into<String>) -> Self {
        self.field_map = self.field_map.set(external, internal);
        self
    }

    pub fn operators(mut self, operators: OperatorAllowList) -> Self {
        self.operators = operators;
        self
    }

    pub fn relation(mut self, relation: impl Into<String>, scope: RelationScope) -> Self {
        self.relations = self.relations.set(relation, scope);
        self
    }

    pub fn sanitize(mut self, field: impl Into<String>, spec: SanitizerSpec) -> Self {
        self.sanitizer_specs.push((field.into(), spec));
        self
    }

    pub fn sanitizer_registry(mut self, registry: SanitizerRegistry) -> Self {
        self.sanitizer_registry = registry;
        self
    }

    pub fn directives(
        mut self,
        field: impl Into<String>,
        directives: impl IntoIterator<Item = Directive>,
    ) -> Self {
        self.declarations
            .push((field.into(), directives.into_iter().collect()));
        self
    }

    pub fn attribute_registry(mut self, registry: AttributeRegistry) -> Self {
        self.attribute_registry = registry;
        self
    }

    pub fn keys(mut self, keys: ClauseKeys) -> Self {
        self.keys = keys;
        self
    }

    pub fn default_operator(mut self, alias: impl Into<String>) -> Self {
        self.default_operator = alias.into();
        self
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn strict_throwing(mut self, strict_throwing: bool) -> Self {
        self.strict_throwing = strict_throwing;
        self
    }

    pub fn rule(mut self, field: impl Into<String>, rule: Rule) -> Self {
        self.rules = self.rules.set(field, rule);
        self
    }

    /// Resolve every reference against the registries and freeze
    pub fn build(self) -> FilterResult<FilterConfig> {
        if Operator::from_alias(&self.default_operator).is_none() {
            return Err(FilterError::configuration(format!(
                "default_operator '{}' is not a known operator alias",
                self.default_operator
            )));
        }

        let sanitizers = self
            .sanitizer_specs
            .into_iter()
            .fold(Sanitizers::new(self.sanitizer_registry), |acc, (field, spec)| {
                acc.set(field, spec)
            });
        for (_, spec) in sanitizers.all() {
            spec.check(sanitizers.registry())?;
        }
        for (_, rule) in self.rules.all() {
            if let Some(spec) = rule.sanitizer() {
                spec.check(sanitizers.registry())?;
            }
            if let Some(alias) = rule.default_operator() {
                if Operator::from_alias(alias).is_none() {
                    return Err(FilterError::configuration(format!(
                        "rule default_operator '{}' is not a known operator alias",
                        alias
                    )));
                }
            }
        }

        let attributes = self
            .declarations
            .into_iter()
            .fold(AttributePipeline::new(self.attribute_registry), |acc, (field, directives)| {
                acc.declare(field, directives)
            });
        attributes.check()?;

        Ok(FilterConfig {
            allowed_fields: self.allowed_fields,
            field_map: self.field_map,
            operators: self.operators,
            relations: self.relations,
            sanitizers,
            attributes,
            keys: self.keys,
            default_operator: self.default_operator,
            strict: self.strict,
            strict_throwing: self.strict_throwing,
            rules: self.rules,
        })
    }
}
