//! In-memory document store
//!
//! Executes a `QueryBuilder` against JSON documents. Each execution is
//! one physical query and fires exactly one `QueryExecuted` notification.

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::trace;

use super::builder::QueryBuilder;

/// Notification fired once per executed query
#[derive(Debug, Clone, Serialize)]
pub struct QueryExecuted {
    pub text: String,
    pub parameters: Vec<Value>,
    pub elapsed: Duration,
    pub executed_at: DateTime<Utc>,
}

/// Observer of executed queries
pub trait QueryListener {
    fn on_query(&self, event: &QueryExecuted);
}

impl<F> QueryListener for F
where
    F: Fn(&QueryExecuted),
{
    fn on_query(&self, event: &QueryExecuted) {
        self(event)
    }
}

/// JSON documents queried in memory
#[derive(Default)]
pub struct MemoryStore {
    table: String,
    documents: Vec<Value>,
    listeners: Vec<Box<dyn QueryListener>>,
}

impl MemoryStore {
    pub fn new(table: impl Into<String>, documents: Vec<Value>) -> Self {
        Self {
            table: table.into(),
            documents,
            listeners: Vec::new(),
        }
    }

    pub fn with_listener(mut self, listener: impl QueryListener + 'static) -> Self {
        self.listeners.push(Box::new(listener));
        self
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Run the query and return matching documents in store order
    pub fn execute(&self, query: &QueryBuilder) -> Vec<Value> {
        let started = Instant::now();
        let rows: Vec<Value> = self
            .documents
            .iter()
            .filter(|doc| query.matches(doc))
            .cloned()
            .collect();

        let (predicate, parameters) = query.to_sql();
        let text = if predicate.is_empty() {
            format!("SELECT * FROM \"{}\"", self.table)
        } else {
            format!("SELECT * FROM \"{}\" WHERE {}", self.table, predicate)
        };
        let event = QueryExecuted {
            text,
            parameters,
            elapsed: started.elapsed(),
            executed_at: Utc::now(),
        };
        trace!(query = %event.text, rows = rows.len(), "query executed");
        for listener in &self.listeners {
            listener.on_query(&event);
        }
        rows
    }
}
