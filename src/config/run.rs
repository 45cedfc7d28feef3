//! Run configuration file
//!
//! Read once at run start. Every field except the allow-list has a
//! default, so `{"allowed_fields": ["status"]}` is a complete config.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::attribute::Directive;
use crate::dissector::ClauseKeys;
use crate::engine::{RuleConfig, BUILTIN_ENGINES};
use crate::errors::{FilterError, FilterResult};
use crate::mapping::{Operator, RelationScope};

/// Configuration file structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Filterable (mapped) field names
    #[serde(default)]
    pub allowed_fields: Vec<String>,

    /// External → internal field names
    #[serde(default)]
    pub field_map: BTreeMap<String, String>,

    /// Operator aliases the engine accepts (default: all)
    #[serde(default = "default_allowed_operators")]
    pub allowed_operators: Vec<String>,

    /// Relation path → `true` or a list of sub-fields
    #[serde(default)]
    pub relations: BTreeMap<String, RelationScope>,

    /// Sub-key names for record entries
    #[serde(default)]
    pub clause_keys: ClauseKeys,

    /// Operator used when an entry names none (default: "eq")
    #[serde(default = "default_operator")]
    pub default_operator: String,

    /// Policy violations abort instead of being skipped
    #[serde(default)]
    pub strict: bool,

    /// Skips abort as well
    #[serde(default)]
    pub strict_throwing: bool,

    /// Field → sanitizer spec (name or list of names)
    #[serde(default)]
    pub sanitizers: BTreeMap<String, Value>,

    /// Field → ordered pre-processing directives
    #[serde(default)]
    pub directives: BTreeMap<String, Vec<Directive>>,

    /// Rule table for the ruleset engine
    #[serde(default)]
    pub rules: BTreeMap<String, RuleConfig>,

    /// Engine short name (default: "tree")
    #[serde(default = "default_engine")]
    pub engine: String,
}

fn default_allowed_operators() -> Vec<String> {
    Operator::ALL.iter().map(|op| op.alias().to_string()).collect()
}

fn default_operator() -> String {
    "eq".to_string()
}

fn default_engine() -> String {
    "tree".to_string()
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            allowed_fields: Vec::new(),
            field_map: BTreeMap::new(),
            allowed_operators: default_allowed_operators(),
            relations: BTreeMap::new(),
            clause_keys: ClauseKeys::default(),
            default_operator: default_operator(),
            strict: false,
            strict_throwing: false,
            sanitizers: BTreeMap::new(),
            directives: BTreeMap::new(),
            rules: BTreeMap::new(),
            engine: default_engine(),
        }
    }
}

impl RunConfig {
    /// Load configuration from a JSON file
    pub fn load(path: &Path) -> FilterResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            FilterError::configuration(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> FilterResult<Self> {
        let config: RunConfig = serde_json::from_str(content)
            .map_err(|e| FilterError::configuration(format!("invalid config JSON: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that do not need the sanitizer or attribute registries
    pub fn validate(&self) -> FilterResult<()> {
        for alias in &self.allowed_operators {
            if Operator::from_alias(alias).is_none() {
                return Err(FilterError::configuration(format!(
                    "unknown operator alias '{}' in allowed_operators",
                    alias
                )));
            }
        }

        if Operator::from_alias(&self.default_operator).is_none() {
            return Err(FilterError::configuration(format!(
                "default_operator '{}' is not a known operator alias",
                self.default_operator
            )));
        }

        if !BUILTIN_ENGINES.contains(&self.engine.as_str()) {
            return Err(FilterError::configuration(format!(
                "unknown engine '{}'; expected one of {}",
                self.engine,
                BUILTIN_ENGINES.join(", ")
            )));
        }

        let keys = &self.clause_keys;
        if keys.field.is_empty() || keys.operator.is_empty() || keys.value.is_empty() {
            return Err(FilterError::configuration("clause_keys must not be empty"));
        }
        if keys.field == keys.operator || keys.field == keys.value || keys.operator == keys.value {
            return Err(FilterError::configuration("clause_keys must be distinct"));
        }

        for (external, internal) in &self.field_map {
            if internal.is_empty() {
                return Err(FilterError::configuration(format!(
                    "field_map entry '{}' maps to an empty name",
                    external
                )));
            }
        }

        Ok(())
    }
}
