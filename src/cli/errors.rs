//! CLI-specific error types

use std::io;

use thiserror::Error;

use crate::errors::FilterError;

/// CLI error
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration file missing, unreadable or invalid
    #[error("SIFTER_CLI_CONFIG_ERROR: {0}")]
    Config(String),

    /// stdin/stdout or data file failure
    #[error("SIFTER_CLI_IO_ERROR: {0}")]
    Io(String),

    /// The run itself aborted
    #[error("{}: {}", .0.code(), .0)]
    Filter(#[from] FilterError),
}

impl CliError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn io_error(msg: impl Into<String>) -> Self {
        Self::Io(msg.into())
    }

    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            Self::Config(_) => "SIFTER_CLI_CONFIG_ERROR",
            Self::Io(_) => "SIFTER_CLI_IO_ERROR",
            Self::Filter(err) => err.code(),
        }
    }

    /// Message without the code prefix
    pub fn message(&self) -> String {
        match self {
            Self::Config(msg) | Self::Io(msg) => msg.clone(),
            Self::Filter(err) => err.to_string(),
        }
    }
}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        Self::io_error(e.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        Self::io_error(format!("JSON error: {}", e))
    }
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes() {
        assert_eq!(CliError::config_error("x").code(), "SIFTER_CLI_CONFIG_ERROR");
        let err = CliError::from(FilterError::field_not_allowed("secret"));
        assert_eq!(err.code(), "SIFTER_FIELD_NOT_ALLOWED");
        assert!(err.to_string().starts_with("SIFTER_FIELD_NOT_ALLOWED: "));
    }
}
