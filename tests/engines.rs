//! Engine Tests
//!
//! End-to-end runs against the in-memory document store:
//! - tree and expression engines agree on equivalent criteria
//! - relation fields become existence checks over nested documents
//! - ruleset and dispatch engines shape clauses their own way
//! - the factory builds registered custom engines

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use serde_json::{json, Value};
use sifter::clause::{Clause, CommitLog};
use sifter::engine::{
    Engine, EngineArgs, EngineFactory, EngineSpec, FieldHandler, HandlerMap, Rule, TreeEngine,
};
use sifter::mapping::{Operator, OperatorAllowList, RelationScope};
use sifter::payload::Payload;
use sifter::sanitize::SanitizerSpec;
use sifter::target::{Condition, MemoryStore, QueryBuilder, QueryExecuted, QueryTarget};
use sifter::{FilterConfig, FilterResult, FilterRun};

// =============================================================================
// Helper Functions
// =============================================================================

fn documents() -> Vec<Value> {
    vec![
        json!({"id": 1, "status": "open", "age": 34, "title": "Rust in practice",
               "author": {"name": "Ann", "country": "NO"}, "tags": [{"name": "systems"}]}),
        json!({"id": 2, "status": "closed", "age": 17, "title": "Go basics",
               "author": {"name": "Bob", "country": "SE"}, "tags": [{"name": "web"}]}),
        json!({"id": 3, "status": "open", "age": 70, "title": "Rust for seniors",
               "author": {"name": "Cid", "country": "NO"}, "tags": []}),
        json!({"id": 4, "status": "draft", "age": null, "title": "Untitled",
               "author": null, "tags": [{"name": "systems"}, {"name": "web"}]}),
    ]
}

fn config() -> Arc<FilterConfig> {
    Arc::new(
        FilterConfig::builder()
            .allow_fields(["status", "age", "title", "id"])
            .map_field("writer", "author.name")
            .relation("author", RelationScope::only(["name", "country"]))
            .relation("tags", RelationScope::All)
            .sanitize("status", SanitizerSpec::reference("lowercase"))
            .build()
            .unwrap(),
    )
}

fn ids(rows: &[Value]) -> Vec<i64> {
    rows.iter().filter_map(|r| r["id"].as_i64()).collect()
}

fn run(engine: &str, criteria: Value) -> (Vec<i64>, QueryBuilder) {
    let mut builder = QueryBuilder::new();
    FilterRun::new(config())
        .execute(EngineSpec::named(engine), &criteria, &mut builder)
        .unwrap();
    let rows = MemoryStore::new("posts", documents()).execute(&builder);
    (ids(&rows), builder)
}

// =============================================================================
// Tree and Expression
// =============================================================================

/// The same criteria as a tree and as text select the same documents.
#[test]
fn test_tree_and_expression_agree() {
    let (tree_ids, tree_query) = run(
        "tree",
        json!({"and": [
            {"status": "OPEN"},
            {"or": [
                {"field": "age", "operator": "lt", "value": 18},
                {"field": "age", "operator": "gte", "value": 65}
            ]}
        ]}),
    );
    let (expr_ids, expr_query) = run(
        "expression",
        json!("status = OPEN AND (age < 18 OR age >= 65)"),
    );

    assert_eq!(tree_ids, vec![3]);
    assert_eq!(tree_ids, expr_ids);
    assert_eq!(tree_query.to_sql(), expr_query.to_sql());
}

/// List operators accept comma text and JSON arrays alike.
#[test]
fn test_in_operator() {
    let (from_text, _) = run("tree", json!({"status": "in:open, draft"}));
    let (from_array, _) = run(
        "tree",
        json!({"status": {"operator": "in", "value": ["open", "draft"]}}),
    );
    let (from_expr, _) = run("expression", json!("status IN (open, draft)"));
    assert_eq!(from_text, vec![1, 3, 4]);
    assert_eq!(from_text, from_array);
    assert_eq!(from_text, from_expr);
}

/// LIKE and null checks evaluate like their SQL counterparts.
#[test]
fn test_like_and_null_checks() {
    let (ids, query) = run("expression", json!("title LIKE 'Rust%' AND age IS NOT NULL"));
    assert_eq!(ids, vec![1, 3]);
    assert_eq!(query.to_sql().0, r#""title" LIKE ? AND "age" IS NOT NULL"#);

    let (ids, _) = run("tree", json!({"age": "is_null:"}));
    assert_eq!(ids, vec![4]);
}

// =============================================================================
// Relations
// =============================================================================

/// Relation fields are existence checks over nested documents.
#[test]
fn test_relation_fields() {
    let (ids, query) = run("tree", json!({"writer": "Ann"}));
    assert_eq!(ids, vec![1]);
    assert!(matches!(
        &query.conditions()[0],
        Condition::Exists { relation, .. } if relation == "author"
    ));

    let (ids, _) = run("tree", json!({"tags.name": "web"}));
    assert_eq!(ids, vec![2, 4]);

    let (ids, _) = run("expression", json!("author.country = NO AND tags.name = systems"));
    assert_eq!(ids, vec![1]);
}

/// Sub-fields outside the relation scope are dropped.
#[test]
fn test_relation_scope_is_enforced() {
    let (ids, query) = run("tree", json!({"author.email": "x@y", "status": "draft"}));
    assert_eq!(ids, vec![4]);
    assert_eq!(query.conditions().len(), 1);
}

// =============================================================================
// Ruleset
// =============================================================================

#[test]
fn test_ruleset_engine() {
    let config = Arc::new(
        FilterConfig::builder()
            .rule("q", Rule::new().with_column("title").with_default_operator("like"))
            .rule(
                "min_age",
                Rule::new()
                    .with_column("age")
                    .with_default_operator("gte")
                    .with_operators(OperatorAllowList::from_aliases(["gte"]).unwrap())
                    .with_sanitizer(SanitizerSpec::reference("to_int")),
            )
            .build()
            .unwrap(),
    );
    let mut builder = QueryBuilder::new();
    let report = FilterRun::new(config)
        .execute(
            EngineSpec::named("ruleset"),
            &json!({"q": "Rust%", "min_age": "40", "status": "open"}),
            &mut builder,
        )
        .unwrap();

    assert_eq!(
        report.clauses,
        vec![
            Clause::new("title", Operator::Like, json!("Rust%")),
            Clause::new("age", Operator::Gte, json!(40)),
        ]
    );
    let rows = MemoryStore::new("posts", documents()).execute(&builder);
    assert_eq!(ids(&rows), vec![3]);
}

// =============================================================================
// Dispatch
// =============================================================================

/// `q` searches the title; everything else falls back to plain clauses.
struct TitleSearch;

impl FieldHandler for TitleSearch {
    fn apply(
        &self,
        payload: &Payload,
        target: &mut dyn QueryTarget,
    ) -> FilterResult<Option<Clause>> {
        let Some(text) = payload.value().as_str().filter(|t| !t.is_empty()) else {
            return Ok(None);
        };
        let clause = Clause::new("title", Operator::Like, json!(format!("%{}%", text)));
        target.attach(Condition::Compare(clause.clone()));
        Ok(Some(clause))
    }
}

#[test]
fn test_dispatch_engine() {
    let config = Arc::new(
        FilterConfig::builder()
            .allow_fields(["q", "status"])
            .build()
            .unwrap(),
    );
    let mut builder = QueryBuilder::new();
    let report = FilterRun::new(config)
        .with_handlers(HandlerMap::new().register("q", TitleSearch))
        .execute(
            EngineSpec::named("dispatch"),
            &json!({"q": "Rust", "status": "open"}),
            &mut builder,
        )
        .unwrap();

    assert_eq!(report.clauses.len(), 2);
    let rows = MemoryStore::new("posts", documents()).execute(&builder);
    assert_eq!(ids(&rows), vec![1, 3]);
}

// =============================================================================
// Factory and Store Events
// =============================================================================

/// Tree engine under another name
struct Recording {
    inner: TreeEngine,
}

impl Engine for Recording {
    fn name(&self) -> &str {
        "recording"
    }

    fn is_strict(&self) -> bool {
        self.inner.is_strict()
    }

    fn apply(&mut self, input: &Value, target: &mut dyn QueryTarget) -> FilterResult<()> {
        self.inner.apply(input, target)
    }

    fn commits(&self) -> &CommitLog {
        self.inner.commits()
    }
}

#[test]
fn test_custom_engine_through_factory() {
    let factory = EngineFactory::new().register("recording", |args: EngineArgs| {
        Ok(Box::new(Recording {
            inner: TreeEngine::new(args.config),
        }) as Box<dyn Engine>)
    });

    let mut builder = QueryBuilder::new();
    let report = FilterRun::new(config())
        .with_factory(factory)
        .execute(EngineSpec::custom("recording"), &json!({"status": "open"}), &mut builder)
        .unwrap();
    assert_eq!(report.engine, "recording");
    assert_eq!(report.clauses.len(), 1);
}

#[test]
fn test_store_fires_one_event_per_query() {
    let events: Rc<RefCell<Vec<QueryExecuted>>> = Rc::default();
    let sink = Rc::clone(&events);
    let store = MemoryStore::new("posts", documents())
        .with_listener(move |event: &QueryExecuted| sink.borrow_mut().push(event.clone()));

    let (_, builder) = run("tree", json!({"status": "open", "age": "gt:18"}));
    let rows = store.execute(&builder);

    assert_eq!(ids(&rows), vec![1, 3]);
    let events = events.borrow();
    assert_eq!(events.len(), 1);
    assert_eq!(
        events[0].text,
        r#"SELECT * FROM "posts" WHERE "status" = ? AND "age" > ?"#
    );
    assert_eq!(events[0].parameters, vec![json!("open"), json!("18")]);
}
