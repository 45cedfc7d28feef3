//! sifter CLI entry point
//!
//! Installs logging, then delegates everything to `cli::run`. Logs go to
//! stderr; stdout carries exactly one JSON response.

use sifter::cli;

/// Environment variable holding the log filter
const ENV_LOG: &str = "SIFTER_LOG";

fn init_logging() {
    let filter = std::env::var(ENV_LOG)
        .or_else(|_| std::env::var("RUST_LOG"))
        .unwrap_or_else(|_| "warn".to_string());

    tracing_subscriber::fmt()
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .with_env_filter(filter)
        .init();
}

fn main() {
    init_logging();

    if let Err(e) = cli::run() {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
