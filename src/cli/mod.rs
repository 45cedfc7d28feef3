//! CLI module for sifter
//!
//! Provides command-line interface for:
//! - resolve: criteria on stdin → clauses and rendered SQL
//! - query: criteria on stdin → matching documents from a JSON file
//! - check: configuration validation

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{check, query, resolve, run, run_command};
pub use errors::{CliError, CliResult};
pub use io::{read_documents, read_request, write_error, write_response};
