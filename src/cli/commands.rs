//! CLI command implementations
//!
//! Each command loads the configuration, builds one `FilterRun` and prints
//! a single JSON response. Filter failures are printed as error responses
//! and also returned, so the process exits non-zero.

use std::path::Path;
use std::sync::Arc;

use serde_json::{json, Value};
use tracing::debug;

use crate::attribute::AttributeRegistry;
use crate::config::{FilterConfig, RunConfig};
use crate::engine::EngineSpec;
use crate::run::{FilterRun, RunReport};
use crate::sanitize::SanitizerRegistry;
use crate::target::{MemoryStore, QueryBuilder, QueryExecuted};

use super::args::Command;
use super::errors::{CliError, CliResult};
use super::io::{read_documents, read_request, write_error, write_response};

/// Table name the document store reports in query events
const DOCUMENTS_TABLE: &str = "documents";

/// Main CLI entry point
///
/// Parses arguments and dispatches to the appropriate command.
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    run_command(cli.command)
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    let result = match cmd {
        Command::Resolve {
            config,
            engine,
            strict,
        } => resolve(&config, engine, strict),
        Command::Query {
            config,
            data,
            engine,
            strict,
        } => query(&config, &data, engine, strict),
        Command::Check { config } => check(&config),
    };

    if let Err(err) = &result {
        write_error(err.code(), &err.message())?;
    }
    result
}

/// Load the run configuration, applying command-line overrides
fn load(config_path: &Path, engine: Option<String>, strict: bool) -> CliResult<RunConfig> {
    let mut config =
        RunConfig::load(config_path).map_err(|e| CliError::config_error(e.to_string()))?;
    if let Some(engine) = engine {
        config.engine = engine;
    }
    config.strict |= strict;
    config
        .validate()
        .map_err(|e| CliError::config_error(e.to_string()))?;
    Ok(config)
}

fn build(config: &RunConfig) -> CliResult<Arc<FilterConfig>> {
    FilterConfig::from_run_config(
        config,
        SanitizerRegistry::with_builtins(),
        AttributeRegistry::with_builtins(),
    )
    .map(Arc::new)
    .map_err(|e| CliError::config_error(e.to_string()))
}

fn execute(config: &RunConfig, input: &Value) -> CliResult<(RunReport, QueryBuilder)> {
    let filter_config = build(config)?;
    let mut builder = QueryBuilder::new();
    let report = FilterRun::new(filter_config).execute(
        EngineSpec::named(config.engine.clone()),
        input,
        &mut builder,
    )?;
    Ok((report, builder))
}

/// Resolve criteria from stdin and print clauses plus rendered SQL
pub fn resolve(config_path: &Path, engine: Option<String>, strict: bool) -> CliResult<()> {
    let config = load(config_path, engine, strict)?;
    let input = read_request()?;

    let (report, builder) = execute(&config, &input)?;
    let (sql, params) = builder.to_sql();

    write_response(json!({
        "run_id": report.run_id,
        "engine": report.engine,
        "clauses": report.clauses,
        "sql": sql,
        "params": params,
    }))
}

/// Resolve criteria from stdin and filter the documents in `data_path`
pub fn query(
    config_path: &Path,
    data_path: &Path,
    engine: Option<String>,
    strict: bool,
) -> CliResult<()> {
    let config = load(config_path, engine, strict)?;
    let documents = read_documents(data_path)?;
    let input = read_request()?;

    let (report, builder) = execute(&config, &input)?;

    let store = MemoryStore::new(DOCUMENTS_TABLE, documents).with_listener(|event: &QueryExecuted| {
        debug!(
            sql = %event.text,
            elapsed_us = event.elapsed.as_micros() as u64,
            "query executed"
        );
    });
    let matches = store.execute(&builder);

    write_response(json!({
        "run_id": report.run_id,
        "engine": report.engine,
        "clauses": report.clauses,
        "count": matches.len(),
        "documents": matches,
    }))
}

/// Validate a configuration file without running anything
pub fn check(config_path: &Path) -> CliResult<()> {
    let config = load(config_path, None, false)?;
    let filter_config = build(&config)?;

    write_response(json!({
        "valid": true,
        "engine": config.engine,
        "allowed_fields": filter_config.allowed_fields().all().collect::<Vec<_>>(),
        "rules": filter_config.rules().len(),
    }))
}
