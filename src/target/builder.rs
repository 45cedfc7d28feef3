//! In-memory query target
//!
//! Collects attached conditions, renders them as parameterised SQL-like
//! text and evaluates them against JSON documents.

use std::cmp::Ordering;

use regex::Regex;
use serde_json::Value;

use crate::clause::Clause;
use crate::mapping::Operator;

use super::condition::{Boolean, Condition, QueryTarget};

/// Query object accepting AND-chained conditions
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryBuilder {
    conditions: Vec<Condition>,
}

impl QueryTarget for QueryBuilder {
    fn attach(&mut self, condition: Condition) {
        self.conditions.push(condition);
    }
}

impl QueryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Render the WHERE body with `?` placeholders
    pub fn to_sql(&self) -> (String, Vec<Value>) {
        let mut params = Vec::new();
        let parts: Vec<String> = self
            .conditions
            .iter()
            .filter_map(|c| render(c, &mut params))
            .collect();
        (parts.join(" AND "), params)
    }

    /// Check if a document satisfies every attached condition
    pub fn matches(&self, doc: &Value) -> bool {
        self.conditions.iter().all(|c| evaluate(c, doc))
    }
}

fn render(condition: &Condition, params: &mut Vec<Value>) -> Option<String> {
    match condition {
        Condition::Compare(clause) => Some(render_clause(clause, params)),
        Condition::Exists {
            relation,
            condition,
        } => {
            let inner = render(condition, params)?;
            // Nested relation paths become nested existence checks
            let sql = relation
                .split('.')
                .rev()
                .fold(inner, |acc, segment| {
                    format!("EXISTS (SELECT 1 FROM \"{}\" WHERE {})", segment, acc)
                });
            Some(sql)
        }
        Condition::Group {
            boolean,
            conditions,
        } => {
            let parts: Vec<String> = conditions.iter().filter_map(|c| render(c, params)).collect();
            match parts.len() {
                0 => None,
                1 => parts.into_iter().next(),
                _ => Some(format!(
                    "({})",
                    parts.join(&format!(" {} ", boolean.as_str()))
                )),
            }
        }
    }
}

fn render_clause(clause: &Clause, params: &mut Vec<Value>) -> String {
    let column = format!("\"{}\"", clause.field());
    let op = clause.operator();
    match op {
        Operator::IsNull | Operator::IsNotNull => format!("{} {}", column, op.token()),
        Operator::In | Operator::NotIn => {
            let items = match clause.value() {
                Value::Array(items) => items.clone(),
                other => vec![other.clone()],
            };
            if items.is_empty() {
                // Empty IN matches nothing, empty NOT IN matches everything
                let constant = if op == Operator::In { "1 = 0" } else { "1 = 1" };
                return constant.to_string();
            }
            let placeholders = vec!["?"; items.len()].join(", ");
            params.extend(items);
            format!("{} {} ({})", column, op.token(), placeholders)
        }
        _ => {
            params.push(clause.value().clone());
            format!("{} {} ?", column, op.token())
        }
    }
}

fn evaluate(condition: &Condition, doc: &Value) -> bool {
    match condition {
        Condition::Compare(clause) => matches_clause(clause, doc),
        Condition::Exists {
            relation,
            condition,
        } => {
            let segments: Vec<&str> = relation.split('.').collect();
            exists(&segments, condition, doc)
        }
        Condition::Group {
            boolean,
            conditions,
        } => match boolean {
            Boolean::And => conditions.iter().all(|c| evaluate(c, doc)),
            Boolean::Or => conditions.is_empty() || conditions.iter().any(|c| evaluate(c, doc)),
        },
    }
}

/// A related record is a nested object or any element of a nested array
fn exists(segments: &[&str], condition: &Condition, doc: &Value) -> bool {
    let Some((first, rest)) = segments.split_first() else {
        return evaluate(condition, doc);
    };
    match doc.get(*first) {
        Some(Value::Array(items)) => items.iter().any(|item| exists(rest, condition, item)),
        Some(related @ Value::Object(_)) => exists(rest, condition, related),
        _ => false,
    }
}

fn matches_clause(clause: &Clause, doc: &Value) -> bool {
    let actual = doc.get(clause.field()).unwrap_or(&Value::Null);
    let expected = clause.value();

    match clause.operator() {
        Operator::IsNull => actual.is_null(),
        Operator::IsNotNull => !actual.is_null(),
        _ if actual.is_null() => false,
        Operator::Eq => loose_eq(actual, expected),
        Operator::Ne => !loose_eq(actual, expected),
        Operator::Gt => compare(actual, expected) == Some(Ordering::Greater),
        Operator::Gte => matches!(
            compare(actual, expected),
            Some(Ordering::Greater | Ordering::Equal)
        ),
        Operator::Lt => compare(actual, expected) == Some(Ordering::Less),
        Operator::Lte => matches!(
            compare(actual, expected),
            Some(Ordering::Less | Ordering::Equal)
        ),
        Operator::Like => like(actual, expected),
        Operator::NotLike => !like(actual, expected),
        Operator::In => list(expected).iter().any(|v| loose_eq(actual, v)),
        Operator::NotIn => !list(expected).iter().any(|v| loose_eq(actual, v)),
    }
}

fn list(value: &Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items.clone(),
        other => vec![other.clone()],
    }
}

/// Numeric text compares equal to the number it spells
fn loose_eq(a: &Value, b: &Value) -> bool {
    if a == b {
        return true;
    }
    match (as_number(a), as_number(b)) {
        (Some(x), Some(y)) => x == y,
        _ => match (a, b) {
            (Value::Bool(x), Value::String(s)) | (Value::String(s), Value::Bool(x)) => {
                s.eq_ignore_ascii_case(if *x { "true" } else { "false" })
            }
            _ => false,
        },
    }
}

fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    if let (Some(x), Some(y)) = (as_number(a), as_number(b)) {
        return x.partial_cmp(&y);
    }
    match (a, b) {
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// SQL LIKE: `%` any sequence, `_` one character, `\` escapes
fn like(actual: &Value, pattern: &Value) -> bool {
    let (Some(text), Some(pattern)) = (actual.as_str(), pattern.as_str()) else {
        return false;
    };
    match Regex::new(&like_to_regex(pattern)) {
        Ok(re) => re.is_match(text),
        Err(_) => false,
    }
}

fn like_to_regex(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() + 8);
    out.push_str("(?s)^");
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        match c {
            '%' => out.push_str(".*"),
            '_' => out.push('.'),
            '\\' => {
                if let Some(escaped) = chars.next() {
                    out.push_str(&regex::escape(&escaped.to_string()));
                }
            }
            other => out.push_str(&regex::escape(&other.to_string())),
        }
    }
    out.push('$');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn compare_clause(field: &str, op: Operator, value: Value) -> Condition {
        Condition::Compare(Clause::new(field, op, value))
    }

    #[test]
    fn test_to_sql() {
        let mut q = QueryBuilder::new();
        q.attach(compare_clause("status", Operator::Eq, json!("open")));
        q.attach(compare_clause("id", Operator::In, json!([1, 2])));
        q.attach(compare_clause("deleted_at", Operator::IsNull, Value::Null));

        let (sql, params) = q.to_sql();
        assert_eq!(
            sql,
            "\"status\" = ? AND \"id\" IN (?, ?) AND \"deleted_at\" IS NULL"
        );
        assert_eq!(params, vec![json!("open"), json!(1), json!(2)]);
    }

    #[test]
    fn test_to_sql_groups_and_exists() {
        let mut q = QueryBuilder::new();
        q.attach(Condition::group(
            Boolean::Or,
            vec![
                compare_clause("a", Operator::Gt, json!(1)),
                Condition::exists("author", compare_clause("name", Operator::Eq, json!("x"))),
            ],
        ));
        let (sql, params) = q.to_sql();
        assert_eq!(
            sql,
            "(\"a\" > ? OR EXISTS (SELECT 1 FROM \"author\" WHERE \"name\" = ?))"
        );
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn test_matches_scalar_ops() {
        let doc = json!({"name": "Johnson", "age": 21, "status": "active"});

        let mut q = QueryBuilder::new();
        q.attach(compare_clause("name", Operator::Like, json!("%son")));
        q.attach(compare_clause("age", Operator::Gte, json!("18")));
        q.attach(compare_clause("status", Operator::In, json!(["active", "pending"])));
        assert!(q.matches(&doc));

        let mut q = QueryBuilder::new();
        q.attach(compare_clause("age", Operator::Gt, json!(21)));
        assert!(!q.matches(&doc));
    }

    #[test]
    fn test_like_wildcards() {
        assert!(like(&json!("Wilson"), &json!("W_lson")));
        assert!(!like(&json!("Smith"), &json!("%son")));
        assert!(like(&json!("50%"), &json!("50\\%")));
        assert!(!like(&json!("500"), &json!("50\\%")));
    }

    #[test]
    fn test_exists_over_arrays() {
        let doc = json!({"comments": [{"body": "hi"}, {"body": "spam"}]});
        let mut q = QueryBuilder::new();
        q.attach(Condition::exists(
            "comments",
            compare_clause("body", Operator::Eq, json!("spam")),
        ));
        assert!(q.matches(&doc));

        let mut q = QueryBuilder::new();
        q.attach(Condition::exists(
            "comments",
            compare_clause("body", Operator::Eq, json!("nope")),
        ));
        assert!(!q.matches(&doc));
    }

    #[test]
    fn test_null_handling() {
        let doc = json!({"deleted_at": null});
        let mut q = QueryBuilder::new();
        q.attach(compare_clause("deleted_at", Operator::IsNull, Value::Null));
        q.attach(compare_clause("missing", Operator::IsNull, Value::Null));
        assert!(q.matches(&doc));

        let mut q = QueryBuilder::new();
        q.attach(compare_clause("deleted_at", Operator::Ne, json!("x")));
        assert!(!q.matches(&doc));
    }
}
