//! CLI argument definitions using clap
//!
//! Commands:
//! - sifter resolve --config <path> [--engine <name>] [--strict]
//! - sifter query --config <path> --data <path> [--engine <name>] [--strict]
//! - sifter check --config <path>

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// sifter - resolve caller criteria into query clauses
#[derive(Parser, Debug)]
#[command(name = "sifter")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Resolve criteria read from stdin and print the clauses
    Resolve {
        /// Path to configuration file
        #[arg(long, default_value = "./sifter.json")]
        config: PathBuf,

        /// Engine to use instead of the configured one
        #[arg(long)]
        engine: Option<String>,

        /// Abort on policy violations instead of skipping
        #[arg(long)]
        strict: bool,
    },

    /// Resolve criteria and run them against a JSON document file
    Query {
        /// Path to configuration file
        #[arg(long, default_value = "./sifter.json")]
        config: PathBuf,

        /// JSON array of documents to filter
        #[arg(long)]
        data: PathBuf,

        /// Engine to use instead of the configured one
        #[arg(long)]
        engine: Option<String>,

        /// Abort on policy violations instead of skipping
        #[arg(long)]
        strict: bool,
    },

    /// Validate a configuration file
    Check {
        /// Path to configuration file
        #[arg(long, default_value = "./sifter.json")]
        config: PathBuf,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_resolve() {
        let cli = Cli::try_parse_from(["sifter", "resolve", "--engine", "expression", "--strict"])
            .unwrap();
        match cli.command {
            Command::Resolve { config, engine, strict } => {
                assert_eq!(config, PathBuf::from("./sifter.json"));
                assert_eq!(engine.as_deref(), Some("expression"));
                assert!(strict);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_query_requires_data() {
        assert!(Cli::try_parse_from(["sifter", "query"]).is_err());
    }
}
