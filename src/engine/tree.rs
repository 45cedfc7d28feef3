//! Nested boolean criteria
//!
//! Input is a tree of `{"and": [...]}` / `{"or": [...]}` groups. Leaves
//! are records carrying the field sub-key, or single-key `{name: entry}`
//! maps. A plain object of fields is an implicit AND group.

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::clause::CommitLog;
use crate::config::FilterConfig;
use crate::dissector::{json_type_name, ClauseKeys};
use crate::errors::{FilterError, FilterResult};
use crate::mapping::RelationResolver;
use crate::target::{Boolean, Condition, QueryTarget};

use super::resolver::{FieldPolicy, Resolver};
use super::Engine;

/// Parsed criteria tree
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Leaf { name: String, entry: Value },
    Group { boolean: Boolean, children: Vec<Node> },
}

impl Node {
    pub fn leaf(name: impl Into<String>, entry: Value) -> Self {
        Node::Leaf {
            name: name.into(),
            entry,
        }
    }

    pub fn and(children: Vec<Node>) -> Self {
        Node::Group {
            boolean: Boolean::And,
            children,
        }
    }

    pub fn or(children: Vec<Node>) -> Self {
        Node::Group {
            boolean: Boolean::Or,
            children,
        }
    }

    /// Read a criteria tree from JSON
    pub fn parse(input: &Value, keys: &ClauseKeys) -> FilterResult<Node> {
        match input {
            Value::Array(items) => items
                .iter()
                .map(|item| Node::parse(item, keys))
                .collect::<FilterResult<Vec<_>>>()
                .map(Node::and),
            Value::Object(map) => parse_object(map, keys),
            other => Err(FilterError::data_shape(
                "$criteria",
                format!("criteria must be an object or an array, got {}", json_type_name(other)),
            )),
        }
    }
}

fn group_keyword(key: &str) -> Option<Boolean> {
    if key.eq_ignore_ascii_case("and") {
        Some(Boolean::And)
    } else if key.eq_ignore_ascii_case("or") {
        Some(Boolean::Or)
    } else {
        None
    }
}

/// A record carries the field sub-key plus a value or operator sub-key.
/// Otherwise `field` is an ordinary criteria name.
fn is_record(map: &Map<String, Value>, keys: &ClauseKeys) -> bool {
    map.contains_key(&keys.field)
        && (map.contains_key(&keys.value) || map.contains_key(&keys.operator))
}

fn parse_object(map: &Map<String, Value>, keys: &ClauseKeys) -> FilterResult<Node> {
    if map.len() == 1 {
        if let Some((key, value)) = map.iter().next() {
            if let Some(boolean) = group_keyword(key) {
                return parse_group(boolean, value, keys);
            }
        }
    }

    if is_record(map, keys) {
        if let Some(name) = map.get(&keys.field) {
            return parse_record(name, map, keys);
        }
    }

    map.iter()
        .map(|(key, value)| match group_keyword(key) {
            Some(boolean) => parse_group(boolean, value, keys),
            None => Ok(Node::leaf(key.clone(), value.clone())),
        })
        .collect::<FilterResult<Vec<_>>>()
        .map(Node::and)
}

fn parse_group(boolean: Boolean, value: &Value, keys: &ClauseKeys) -> FilterResult<Node> {
    let Value::Array(items) = value else {
        return Err(FilterError::data_shape(
            format!("${}", boolean.as_str().to_lowercase()),
            format!("group members must be an array, got {}", json_type_name(value)),
        ));
    };
    let children = items
        .iter()
        .map(|item| Node::parse(item, keys))
        .collect::<FilterResult<Vec<_>>>()?;
    Ok(Node::Group { boolean, children })
}

/// `{field, operator, value}` record, or `{field, value}` using the default operator
fn parse_record(name: &Value, map: &Map<String, Value>, keys: &ClauseKeys) -> FilterResult<Node> {
    let Value::String(name) = name else {
        return Err(FilterError::data_shape(
            "$entry",
            format!("'{}' must be text, got {}", keys.field, json_type_name(name)),
        ));
    };
    let Some(value) = map.get(&keys.value) else {
        return Err(FilterError::data_shape(
            name.clone(),
            format!("record must carry '{}'", keys.value),
        ));
    };

    let entry = if map.contains_key(&keys.operator) {
        let mut record = map.clone();
        record.remove(&keys.field);
        Value::Object(record)
    } else {
        value.clone()
    };
    Ok(Node::leaf(name.clone(), entry))
}

/// Resolves a criteria tree into conditions on the target.
///
/// Skipped leaves are dropped, empty groups with them. Each leaf is
/// committed as soon as it resolves. Members of the root AND group are
/// attached one by one; any other group is attached once it resolved.
#[derive(Debug)]
pub struct TreeEngine {
    resolver: Resolver,
    commits: CommitLog,
}

impl TreeEngine {
    pub const NAME: &'static str = "tree";

    pub fn new(config: Arc<FilterConfig>) -> Self {
        Self {
            resolver: Resolver::new(config),
            commits: CommitLog::new(),
        }
    }

    pub fn keys(&self) -> &ClauseKeys {
        self.resolver.config().keys()
    }

    /// Resolve an already parsed tree into `target`
    pub fn apply_node(&mut self, node: &Node, target: &mut dyn QueryTarget) -> FilterResult<()> {
        match node {
            Node::Group {
                boolean: Boolean::And,
                children,
            } => {
                for child in children {
                    if let Some(condition) = self.resolve(child, target)? {
                        target.attach(condition);
                    }
                }
            }
            other => {
                if let Some(condition) = self.resolve(other, target)? {
                    target.attach(condition);
                }
            }
        }
        Ok(())
    }

    fn resolve(
        &mut self,
        node: &Node,
        target: &mut dyn QueryTarget,
    ) -> FilterResult<Option<Condition>> {
        match node {
            Node::Leaf { name, entry } => {
                let resolution = self
                    .resolver
                    .prepare(name, entry, target, &FieldPolicy::default());
                let Some(prepared) = self.resolver.settle(resolution)? else {
                    return Ok(None);
                };
                let clause = prepared.clause();
                let condition = RelationResolver::condition(&clause);
                self.commits.record(clause.path(), clause);
                Ok(Some(condition))
            }
            Node::Group { boolean, children } => {
                let mut conditions = Vec::with_capacity(children.len());
                for child in children {
                    if let Some(condition) = self.resolve(child, target)? {
                        conditions.push(condition);
                    }
                }
                Ok(match conditions.len() {
                    0 => None,
                    1 => conditions.pop(),
                    _ => Some(Condition::group(*boolean, conditions)),
                })
            }
        }
    }
}

impl Engine for TreeEngine {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn is_strict(&self) -> bool {
        self.resolver.is_strict()
    }

    fn apply(&mut self, input: &Value, target: &mut dyn QueryTarget) -> FilterResult<()> {
        let node = Node::parse(input, self.keys())?;
        self.apply_node(&node, target)
    }

    fn commits(&self) -> &CommitLog {
        &self.commits
    }
}
