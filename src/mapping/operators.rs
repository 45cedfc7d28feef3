//! Operator table, alias resolution and the per-engine operator allow-list

use std::collections::BTreeSet;
use std::fmt;

use serde::{Serialize, Serializer};

use crate::errors::{FilterError, FilterResult};

/// Canonical comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Operator {
    Eq,
    Ne,
    Gt,
    Lt,
    Gte,
    Lte,
    Like,
    NotLike,
    In,
    NotIn,
    IsNull,
    IsNotNull,
}

impl Operator {
    /// Every operator in table order
    pub const ALL: [Operator; 12] = [
        Operator::Eq,
        Operator::Ne,
        Operator::Gt,
        Operator::Lt,
        Operator::Gte,
        Operator::Lte,
        Operator::Like,
        Operator::NotLike,
        Operator::In,
        Operator::NotIn,
        Operator::IsNull,
        Operator::IsNotNull,
    ];

    /// External alias (`eq`, `not_like`, ...)
    pub fn alias(&self) -> &'static str {
        match self {
            Operator::Eq => "eq",
            Operator::Ne => "ne",
            Operator::Gt => "gt",
            Operator::Lt => "lt",
            Operator::Gte => "gte",
            Operator::Lte => "lte",
            Operator::Like => "like",
            Operator::NotLike => "not_like",
            Operator::In => "in",
            Operator::NotIn => "not_in",
            Operator::IsNull => "is_null",
            Operator::IsNotNull => "is_not_null",
        }
    }

    /// Canonical token handed to the query target
    pub fn token(&self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Ne => "!=",
            Operator::Gt => ">",
            Operator::Lt => "<",
            Operator::Gte => ">=",
            Operator::Lte => "<=",
            Operator::Like => "LIKE",
            Operator::NotLike => "NOT LIKE",
            Operator::In => "IN",
            Operator::NotIn => "NOT IN",
            Operator::IsNull => "IS NULL",
            Operator::IsNotNull => "IS NOT NULL",
        }
    }

    /// Exact alias lookup; anything outside the table is `None`
    pub fn from_alias(alias: &str) -> Option<Operator> {
        Operator::ALL.into_iter().find(|op| op.alias() == alias)
    }

    /// Operators whose value is a list
    pub fn is_list(&self) -> bool {
        matches!(self, Operator::In | Operator::NotIn)
    }

    /// Operators that take no value
    pub fn is_nullary(&self) -> bool {
        matches!(self, Operator::IsNull | Operator::IsNotNull)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl Serialize for Operator {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.token())
    }
}

/// Alias → canonical operator translation
pub struct OperatorMapper;

impl OperatorMapper {
    /// Resolve an alias, failing for anything outside the table.
    ///
    /// This raises regardless of strict mode, unlike the allow-list check.
    pub fn resolve(field: &str, alias: &str) -> FilterResult<Operator> {
        Operator::from_alias(alias).ok_or_else(|| FilterError::operator_unresolvable(field, alias))
    }
}

/// Operators an engine accepts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperatorAllowList {
    operators: BTreeSet<Operator>,
}

impl Default for OperatorAllowList {
    fn default() -> Self {
        Self::all_operators()
    }
}

impl OperatorAllowList {
    pub fn empty() -> Self {
        Self {
            operators: BTreeSet::new(),
        }
    }

    pub fn all_operators() -> Self {
        Self {
            operators: Operator::ALL.into_iter().collect(),
        }
    }

    /// Build from aliases; an unknown alias is a configuration error
    pub fn from_aliases<I, S>(aliases: I) -> FilterResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut operators = BTreeSet::new();
        for alias in aliases {
            let alias = alias.as_ref();
            let op = Operator::from_alias(alias).ok_or_else(|| {
                FilterError::configuration(format!("unknown operator alias '{}'", alias))
            })?;
            operators.insert(op);
        }
        Ok(Self { operators })
    }

    pub fn has(&self, op: Operator) -> bool {
        self.operators.contains(&op)
    }

    pub fn set(mut self, op: Operator) -> Self {
        self.operators.insert(op);
        self
    }

    pub fn merge(mut self, other: &OperatorAllowList) -> Self {
        self.operators.extend(other.operators.iter().copied());
        self
    }

    pub fn all(&self) -> impl Iterator<Item = Operator> + '_ {
        self.operators.iter().copied()
    }

    /// Same skip/throw policy as the field allow-list
    pub fn validate(&self, field: &str, op: Operator, strict: bool) -> FilterResult<bool> {
        if self.has(op) {
            return Ok(true);
        }
        if strict {
            return Err(FilterError::operator_not_allowed(field, op.alias()));
        }
        Ok(false)
    }
}
