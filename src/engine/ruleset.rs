//! Declarative rule table
//!
//! Only fields with a rule are eligible. A rule may rename the column,
//! narrow the operator set, change the default operator and replace the
//! field's sanitizer.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::clause::CommitLog;
use crate::config::FilterConfig;
use crate::dissector::json_type_name;
use crate::errors::{FilterError, FilterResult};
use crate::mapping::OperatorAllowList;
use crate::policy::Resolution;
use crate::sanitize::SanitizerSpec;
use crate::target::QueryTarget;

use super::resolver::{FieldPolicy, Resolver};
use super::Engine;

/// Rule as written in the configuration file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuleConfig {
    #[serde(default)]
    pub column: Option<String>,

    /// Empty means every configured operator
    #[serde(default)]
    pub operators: Vec<String>,

    #[serde(default)]
    pub default_operator: Option<String>,

    #[serde(default)]
    pub sanitize: Option<Value>,
}

/// Compiled rule for one field
#[derive(Debug, Clone, Default)]
pub struct Rule {
    column: Option<String>,
    operators: Option<OperatorAllowList>,
    default_operator: Option<String>,
    sanitizer: Option<SanitizerSpec>,
}

impl Rule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(field: &str, config: &RuleConfig) -> FilterResult<Self> {
        let operators = if config.operators.is_empty() {
            None
        } else {
            Some(OperatorAllowList::from_aliases(&config.operators)?)
        };
        let sanitizer = config
            .sanitize
            .as_ref()
            .map(|raw| {
                SanitizerSpec::from_value(raw).map_err(|_| {
                    FilterError::configuration(format!(
                        "rule '{}': sanitize must be a name or a list, got {}",
                        field,
                        json_type_name(raw)
                    ))
                })
            })
            .transpose()?;

        Ok(Self {
            column: config.column.clone(),
            operators,
            default_operator: config.default_operator.clone(),
            sanitizer,
        })
    }

    pub fn with_column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }

    pub fn with_operators(mut self, operators: OperatorAllowList) -> Self {
        self.operators = Some(operators);
        self
    }

    pub fn with_default_operator(mut self, alias: impl Into<String>) -> Self {
        self.default_operator = Some(alias.into());
        self
    }

    pub fn with_sanitizer(mut self, spec: SanitizerSpec) -> Self {
        self.sanitizer = Some(spec);
        self
    }

    pub fn column(&self) -> Option<&str> {
        self.column.as_deref()
    }

    pub fn operators(&self) -> Option<&OperatorAllowList> {
        self.operators.as_ref()
    }

    pub fn default_operator(&self) -> Option<&str> {
        self.default_operator.as_deref()
    }

    pub fn sanitizer(&self) -> Option<&SanitizerSpec> {
        self.sanitizer.as_ref()
    }

    fn policy(&self) -> FieldPolicy<'_> {
        FieldPolicy {
            column: self.column(),
            default_operator: self.default_operator(),
            operators: self.operators(),
            sanitizer: self.sanitizer(),
            pre_allowed: true,
        }
    }
}

/// Field → rule
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: BTreeMap<String, Rule>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has(&self, field: &str) -> bool {
        self.rules.contains_key(field)
    }

    pub fn get(&self, field: &str) -> Option<&Rule> {
        self.rules.get(field)
    }

    pub fn set(mut self, field: impl Into<String>, rule: Rule) -> Self {
        self.rules.insert(field.into(), rule);
        self
    }

    pub fn merge(mut self, other: &RuleSet) -> Self {
        self.rules
            .extend(other.rules.iter().map(|(k, v)| (k.clone(), v.clone())));
        self
    }

    pub fn all(&self) -> impl Iterator<Item = (&str, &Rule)> {
        self.rules.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Applies the configured rule table to a flat criteria object
#[derive(Debug)]
pub struct RulesetEngine {
    resolver: Resolver,
    commits: CommitLog,
}

impl RulesetEngine {
    pub const NAME: &'static str = "ruleset";

    pub fn new(config: Arc<FilterConfig>) -> Self {
        Self {
            resolver: Resolver::new(config),
            commits: CommitLog::new(),
        }
    }
}

impl Engine for RulesetEngine {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn is_strict(&self) -> bool {
        self.resolver.is_strict()
    }

    fn apply(&mut self, input: &Value, target: &mut dyn QueryTarget) -> FilterResult<()> {
        let fields = super::flat_object(input)?;

        for (name, entry) in fields {
            let resolution = match self.resolver.config().rules().get(name) {
                Some(rule) => self.resolver.prepare(name, entry, target, &rule.policy()),
                None if self.is_strict() => {
                    Resolution::Fatal(FilterError::field_not_allowed(name.clone()))
                }
                None => Resolution::skipped(name.clone(), "no rule for field"),
            };

            if let Some(prepared) = self.resolver.settle(resolution)? {
                let clause = prepared.attach_default(target);
                self.commits.record(clause.path(), clause);
            }
        }
        Ok(())
    }

    fn commits(&self) -> &CommitLog {
        &self.commits
    }
}
