//! Dotted field paths and nested existence constraints

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::clause::Clause;
use crate::target::{Condition, QueryTarget};

/// Sub-fields of a relation that may be filtered on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawScope", into = "RawScope")]
pub enum RelationScope {
    /// Every sub-field (`true` in configuration)
    All,
    /// Only the listed sub-fields
    Only(BTreeSet<String>),
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RawScope {
    Flag(bool),
    Fields(Vec<String>),
}

impl TryFrom<RawScope> for RelationScope {
    type Error = String;

    fn try_from(raw: RawScope) -> Result<Self, Self::Error> {
        match raw {
            RawScope::Flag(true) => Ok(RelationScope::All),
            RawScope::Flag(false) => {
                Err("relation scope must be true or a list of fields".to_string())
            }
            RawScope::Fields(fields) => Ok(RelationScope::Only(fields.into_iter().collect())),
        }
    }
}

impl From<RelationScope> for RawScope {
    fn from(scope: RelationScope) -> Self {
        match scope {
            RelationScope::All => RawScope::Flag(true),
            RelationScope::Only(fields) => RawScope::Fields(fields.into_iter().collect()),
        }
    }
}

impl RelationScope {
    pub fn only<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        RelationScope::Only(fields.into_iter().map(Into::into).collect())
    }

    pub fn permits(&self, field: &str) -> bool {
        match self {
            RelationScope::All => true,
            RelationScope::Only(fields) => fields.contains(field),
        }
    }
}

/// Relation path → allowed sub-fields
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelationAllowList {
    relations: BTreeMap<String, RelationScope>,
}

impl RelationAllowList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has(&self, relation: &str) -> bool {
        self.relations.contains_key(relation)
    }

    pub fn get(&self, relation: &str) -> Option<&RelationScope> {
        self.relations.get(relation)
    }

    pub fn set(mut self, relation: impl Into<String>, scope: RelationScope) -> Self {
        self.relations.insert(relation.into(), scope);
        self
    }

    pub fn merge(mut self, other: &RelationAllowList) -> Self {
        self.relations
            .extend(other.relations.iter().map(|(k, v)| (k.clone(), v.clone())));
        self
    }

    pub fn all(&self) -> impl Iterator<Item = (&str, &RelationScope)> {
        self.relations.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl FromIterator<(String, RelationScope)> for RelationAllowList {
    fn from_iter<T: IntoIterator<Item = (String, RelationScope)>>(iter: T) -> Self {
        Self {
            relations: iter.into_iter().collect(),
        }
    }
}

/// `relation.path.field` split into relation path and terminal field.
///
/// Recomputed for every entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationPath {
    relation: String,
    field: String,
}

impl RelationPath {
    pub fn parse(path: &str) -> Self {
        match path.rsplit_once('.') {
            Some((relation, field)) => Self {
                relation: relation.to_string(),
                field: field.to_string(),
            },
            None => Self {
                relation: String::new(),
                field: path.to_string(),
            },
        }
    }

    pub fn relation(&self) -> &str {
        &self.relation
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    /// No relation segment, i.e. a field on the filtered entity itself
    pub fn is_local(&self) -> bool {
        self.relation.is_empty()
    }

    pub fn is_allowed(&self, allow_list: &RelationAllowList) -> bool {
        !self.is_local()
            && !self.field.is_empty()
            && allow_list
                .get(&self.relation)
                .is_some_and(|scope| scope.permits(&self.field))
    }
}

/// Attaches clauses on related entities as existence constraints
pub struct RelationResolver;

impl RelationResolver {
    /// Wrap a relation clause in "exists a related record satisfying it".
    /// Local clauses come back as plain comparisons.
    pub fn condition(clause: &Clause) -> Condition {
        match clause.relation() {
            Some(relation) => Condition::exists(relation, Condition::Compare(clause.local())),
            None => Condition::Compare(clause.clone()),
        }
    }

    /// Additive: only ever attaches
    pub fn resolve(target: &mut dyn QueryTarget, clause: &Clause) {
        target.attach(Self::condition(clause));
    }
}
