//! Filter error taxonomy
//!
//! Every failure raised while resolving criteria is a `FilterError`.
//! Each variant belongs to exactly one `ErrorClass`, which is the only
//! thing the policy handler looks at when deciding skip vs abort.
//!
//! Error codes:
//! - SIFTER_CONFIGURATION (FATAL)
//! - SIFTER_FIELD_NOT_ALLOWED (STRICTNESS)
//! - SIFTER_OPERATOR_NOT_ALLOWED (STRICTNESS)
//! - SIFTER_OPERATOR_UNRESOLVABLE (FATAL)
//! - SIFTER_DATA_SHAPE_INVALID (FATAL)
//! - SIFTER_VALIDATION_FAILED (FATAL)
//! - SIFTER_UNAUTHORIZED (FATAL)
//! - SIFTER_SKIPPED (SKIP)

use std::fmt;

use thiserror::Error;

/// Result type for filter resolution
pub type FilterResult<T> = Result<T, FilterError>;

/// Failure classes understood by the policy handler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Explicit per-field opt-out, not an error
    Skip,
    /// Policy violation, fatal only when the run is strict
    Strictness,
    /// Always aborts the run
    Fatal,
}

impl ErrorClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorClass::Skip => "SKIP",
            ErrorClass::Strictness => "STRICTNESS",
            ErrorClass::Fatal => "FATAL",
        }
    }
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Filter resolution errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FilterError {
    /// Bad sanitizer, engine or directive setup
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Field is not in the allow-list
    #[error("Field '{field}' is not allowed")]
    FieldNotAllowed { field: String },

    /// Operator is known but not allowed for this engine
    #[error("Operator '{operator}' is not allowed on field '{field}'")]
    OperatorNotAllowed { field: String, operator: String },

    /// Operator alias is not part of the operator table
    #[error("Operator '{operator}' on field '{field}' cannot be resolved")]
    OperatorUnresolvable { field: String, operator: String },

    /// Input cannot be safely interpreted
    #[error("Invalid data shape for '{field}': {reason}")]
    DataShapeInvalid { field: String, reason: String },

    /// A required directive failed
    #[error("{message}")]
    ValidationFailed { field: String, message: String },

    /// Authorization gate refused the run
    #[error("Filter run is not authorized")]
    Unauthorized,

    /// A field was skipped and the policy turned the skip into an abort
    #[error("Filter on '{field}' was skipped: {reason}")]
    Skipped { field: String, reason: String },
}

impl FilterError {
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn field_not_allowed(field: impl Into<String>) -> Self {
        Self::FieldNotAllowed {
            field: field.into(),
        }
    }

    pub fn operator_not_allowed(field: impl Into<String>, operator: impl Into<String>) -> Self {
        Self::OperatorNotAllowed {
            field: field.into(),
            operator: operator.into(),
        }
    }

    pub fn operator_unresolvable(field: impl Into<String>, operator: impl Into<String>) -> Self {
        Self::OperatorUnresolvable {
            field: field.into(),
            operator: operator.into(),
        }
    }

    pub fn data_shape(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::DataShapeInvalid {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn validation_failed(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ValidationFailed {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn skipped(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Skipped {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "SIFTER_CONFIGURATION",
            Self::FieldNotAllowed { .. } => "SIFTER_FIELD_NOT_ALLOWED",
            Self::OperatorNotAllowed { .. } => "SIFTER_OPERATOR_NOT_ALLOWED",
            Self::OperatorUnresolvable { .. } => "SIFTER_OPERATOR_UNRESOLVABLE",
            Self::DataShapeInvalid { .. } => "SIFTER_DATA_SHAPE_INVALID",
            Self::ValidationFailed { .. } => "SIFTER_VALIDATION_FAILED",
            Self::Unauthorized => "SIFTER_UNAUTHORIZED",
            Self::Skipped { .. } => "SIFTER_SKIPPED",
        }
    }

    /// Failure class consulted by the policy handler
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Skipped { .. } => ErrorClass::Skip,
            Self::FieldNotAllowed { .. } | Self::OperatorNotAllowed { .. } => {
                ErrorClass::Strictness
            }
            Self::Configuration(_)
            | Self::OperatorUnresolvable { .. }
            | Self::DataShapeInvalid { .. }
            | Self::ValidationFailed { .. }
            | Self::Unauthorized => ErrorClass::Fatal,
        }
    }

    /// Offending field, when the error is tied to one
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::FieldNotAllowed { field }
            | Self::OperatorNotAllowed { field, .. }
            | Self::OperatorUnresolvable { field, .. }
            | Self::DataShapeInvalid { field, .. }
            | Self::ValidationFailed { field, .. }
            | Self::Skipped { field, .. } => Some(field),
            Self::Configuration(_) | Self::Unauthorized => None,
        }
    }
}
