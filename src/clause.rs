//! Resolved predicates and the per-run commit log

use serde::Serialize;
use serde_json::Value;

use crate::mapping::Operator;

/// Immutable resolved predicate
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Clause {
    field: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    relation: Option<String>,
    operator: Operator,
    value: Value,
}

impl Clause {
    pub fn new(field: impl Into<String>, operator: Operator, value: Value) -> Self {
        Self {
            field: field.into(),
            relation: None,
            operator,
            value,
        }
    }

    /// Clause on a related entity's field
    pub fn related(
        relation: impl Into<String>,
        field: impl Into<String>,
        operator: Operator,
        value: Value,
    ) -> Self {
        Self {
            field: field.into(),
            relation: Some(relation.into()),
            operator,
            value,
        }
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn relation(&self) -> Option<&str> {
        self.relation.as_deref()
    }

    pub fn operator(&self) -> Operator {
        self.operator
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Full dotted path (`author.name` for relation clauses)
    pub fn path(&self) -> String {
        match &self.relation {
            Some(relation) => format!("{}.{}", relation, self.field),
            None => self.field.clone(),
        }
    }

    /// Same predicate detached from its relation, for use inside an
    /// existence constraint
    pub fn local(&self) -> Clause {
        Clause::new(self.field.clone(), self.operator, self.value.clone())
    }
}

/// Append-only record of the clauses one engine run applied
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommitLog {
    entries: Vec<(String, Clause)>,
}

impl CommitLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record(&mut self, key: impl Into<String>, clause: Clause) {
        self.entries.push((key.into(), clause));
    }

    pub fn has(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    /// Latest clause recorded under `key`
    pub fn get(&self, key: &str) -> Option<&Clause> {
        self.entries
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, clause)| clause)
    }

    pub fn all(&self) -> impl Iterator<Item = &Clause> {
        self.entries.iter().map(|(_, clause)| clause)
    }

    pub fn entries(&self) -> &[(String, Clause)] {
        &self.entries
    }

    pub fn to_vec(&self) -> Vec<Clause> {
        self.all().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
