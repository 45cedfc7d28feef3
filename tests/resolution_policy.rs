//! Resolution Policy Tests
//!
//! The skip-vs-abort decision is made in one place, so the same field
//! failure must produce the same run outcome on every engine:
//! - permissive runs skip disallowed fields and operators
//! - strict runs abort on them
//! - strict-throwing escalates plain skips
//! - unknown operators and failed directives always abort

use std::sync::Arc;

use serde_json::{json, Value};
use sifter::attribute::Directive;
use sifter::engine::{EngineSpec, HandlerMap};
use sifter::target::QueryBuilder;
use sifter::{
    EngineArgs, EngineFactory, FilterConfig, FilterError, FilterResult, FilterRun, RunReport,
};

// =============================================================================
// Helper Functions
// =============================================================================

fn config(strict: bool, strict_throwing: bool) -> Arc<FilterConfig> {
    let builder = FilterConfig::builder()
        .allow_fields(["status", "age"])
        .directives("status", [Directive::required()])
        .strict(strict)
        .strict_throwing(strict_throwing);

    // The ruleset engine only knows fields with a rule
    let builder = ["status", "age"]
        .into_iter()
        .fold(builder, |b, field| b.rule(field, sifter::engine::Rule::new()));
    Arc::new(builder.build().unwrap())
}

/// Run the same criteria on the flat engines and the expression engine
fn run_everywhere(
    config: &Arc<FilterConfig>,
    flat: Value,
    expression: &str,
) -> Vec<(&'static str, FilterResult<RunReport>)> {
    let mut outcomes = Vec::new();
    for engine in ["tree", "ruleset", "dispatch"] {
        let mut target = QueryBuilder::new();
        let result = FilterRun::new(Arc::clone(config))
            .with_handlers(HandlerMap::new())
            .execute(EngineSpec::named(engine), &flat, &mut target);
        outcomes.push((engine, result));
    }
    let mut target = QueryBuilder::new();
    let result = FilterRun::new(Arc::clone(config)).execute(
        EngineSpec::named("expression"),
        &json!(expression),
        &mut target,
    );
    outcomes.push(("expression", result));
    outcomes
}

fn codes(outcomes: &[(&str, FilterResult<RunReport>)]) -> Vec<Option<&'static str>> {
    outcomes
        .iter()
        .map(|(_, r)| r.as_ref().err().map(FilterError::code))
        .collect()
}

// =============================================================================
// Permissive Mode
// =============================================================================

/// Disallowed fields are skipped and the rest of the run proceeds.
#[test]
fn test_permissive_skips_unknown_field() {
    let config = config(false, false);
    let outcomes = run_everywhere(
        &config,
        json!({"status": "open", "secret": "x"}),
        "status = open AND secret = x",
    );

    for (engine, result) in outcomes {
        let report = result.unwrap_or_else(|e| panic!("{} aborted: {}", engine, e));
        assert_eq!(report.clauses.len(), 1, "{}", engine);
        assert_eq!(report.clauses[0].field(), "status");
    }
}

/// Disallowed operators are skipped too.
#[test]
fn test_permissive_skips_disallowed_operator() {
    let config = Arc::new(
        FilterConfig::builder()
            .allow("age")
            .operators(sifter::mapping::OperatorAllowList::from_aliases(["eq"]).unwrap())
            .build()
            .unwrap(),
    );
    let mut target = QueryBuilder::new();
    let report = FilterRun::new(config)
        .execute(EngineSpec::named("tree"), &json!({"age": "gt:3"}), &mut target)
        .unwrap();
    assert!(report.clauses.is_empty());
    assert!(target.is_empty());
}

// =============================================================================
// Strict Mode
// =============================================================================

/// Every engine aborts with the same error for the same disallowed field.
#[test]
fn test_strict_aborts_identically() {
    let config = config(true, false);
    let outcomes = run_everywhere(
        &config,
        json!({"status": "open", "secret": "x"}),
        "status = open AND secret = x",
    );
    assert_eq!(
        codes(&outcomes),
        vec![Some("SIFTER_FIELD_NOT_ALLOWED"); 4],
        "{:?}",
        outcomes.iter().map(|(e, _)| e).collect::<Vec<_>>()
    );
}

/// After a strict abort every engine has committed and attached exactly the
/// fields that came before the failing one.
#[test]
fn test_strict_abort_keeps_earlier_commits() {
    let config = config(true, false);
    let factory = EngineFactory::new();
    let flat = json!({"status": "open", "secret": "x", "age": "gt:3"});
    let expression = json!("status = open AND secret = x AND age > 3");

    for engine_name in ["tree", "ruleset", "dispatch", "expression"] {
        let args = EngineArgs::new(Arc::clone(&config)).with_handlers(HandlerMap::new());
        let mut engine = factory.make(EngineSpec::named(engine_name), args).unwrap();
        let input = if engine_name == "expression" {
            &expression
        } else {
            &flat
        };

        let mut target = QueryBuilder::new();
        let err = engine.apply(input, &mut target).unwrap_err();
        assert_eq!(err, FilterError::field_not_allowed("secret"), "{}", engine_name);

        let keys: Vec<&str> = engine
            .commits()
            .entries()
            .iter()
            .map(|(key, _)| key.as_str())
            .collect();
        assert_eq!(keys, vec!["status"], "{}", engine_name);
        assert_eq!(target.conditions().len(), 1, "{}", engine_name);
    }
}

/// Strict-throwing aborts even where permissive mode would only skip.
#[test]
fn test_strict_throwing_escalates() {
    let config = config(false, true);
    let outcomes = run_everywhere(
        &config,
        json!({"status": "open", "secret": "x"}),
        "status = open AND secret = x",
    );
    for (engine, result) in outcomes {
        assert!(result.is_err(), "{} did not abort", engine);
    }
}

// =============================================================================
// Always Fatal
// =============================================================================

/// An unknown operator alias aborts even when permissive.
#[test]
fn test_unknown_operator_aborts_in_permissive_mode() {
    let config = config(false, false);
    let outcomes = run_everywhere(
        &config,
        json!({"status": "open", "age": "approx:30"}),
        "status = open AND age approx 30",
    );
    assert_eq!(codes(&outcomes), vec![Some("SIFTER_OPERATOR_UNRESOLVABLE"); 4]);
}

/// A failed `required` directive aborts with its message.
#[test]
fn test_required_directive_aborts() {
    let config = config(false, false);
    let outcomes = run_everywhere(&config, json!({"status": ""}), "status = ''");
    for (engine, result) in outcomes {
        let err = result.expect_err(engine);
        assert_eq!(err.to_string(), "The status filter is required.", "{}", engine);
    }
}

/// Malformed records are data-shape errors regardless of mode.
#[test]
fn test_half_record_is_fatal() {
    let config = config(false, false);
    let mut target = QueryBuilder::new();
    let err = FilterRun::new(config)
        .execute(
            EngineSpec::named("dispatch"),
            &json!({"age": {"operator": "gt"}}),
            &mut target,
        )
        .unwrap_err();
    assert_eq!(err.code(), "SIFTER_DATA_SHAPE_INVALID");
}

// =============================================================================
// Commit Log
// =============================================================================

/// Commit log size equals the number of applied clauses, in input order.
#[test]
fn test_commit_log_is_deterministic() {
    let config = config(false, false);
    let criteria = json!({"age": "gte:18", "status": "open", "secret": 1});

    let first: Vec<_> = (0..10)
        .map(|_| {
            let mut target = QueryBuilder::new();
            FilterRun::new(Arc::clone(&config))
                .execute(EngineSpec::named("tree"), &criteria, &mut target)
                .unwrap()
                .clauses
        })
        .collect();

    assert_eq!(first[0].len(), 2);
    assert_eq!(first[0][0].field(), "age");
    assert_eq!(first[0][1].field(), "status");
    assert!(first.windows(2).all(|w| w[0] == w[1]));
}
