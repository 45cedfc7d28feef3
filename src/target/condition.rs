//! Condition tree handed to query targets

use serde::Serialize;

use crate::clause::Clause;

/// How sibling conditions combine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Boolean {
    And,
    Or,
}

impl Boolean {
    pub fn as_str(&self) -> &'static str {
        match self {
            Boolean::And => "AND",
            Boolean::Or => "OR",
        }
    }
}

/// A predicate the target can apply
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Condition {
    /// Plain field comparison
    Compare(Clause),

    /// "exists a related record satisfying `condition`"
    Exists {
        relation: String,
        condition: Box<Condition>,
    },

    /// Parenthesized group
    Group {
        boolean: Boolean,
        conditions: Vec<Condition>,
    },
}

impl Condition {
    pub fn exists(relation: impl Into<String>, condition: Condition) -> Self {
        Condition::Exists {
            relation: relation.into(),
            condition: Box::new(condition),
        }
    }

    pub fn group(boolean: Boolean, conditions: Vec<Condition>) -> Self {
        Condition::Group {
            boolean,
            conditions,
        }
    }
}

/// The external store's query object.
///
/// Attached conditions form an AND chain in attach order; disjunction is
/// expressed with an `Or` group. Attaching never removes constraints.
pub trait QueryTarget {
    fn attach(&mut self, condition: Condition);
}

impl QueryTarget for Vec<Condition> {
    fn attach(&mut self, condition: Condition) {
        self.push(condition);
    }
}
