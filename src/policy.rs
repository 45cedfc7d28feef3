//! Skip-vs-abort policy
//!
//! The single decision point every engine consults once per field.
//! Identical field-level failures yield identical run-level outcomes
//! regardless of which engine produced them.

use tracing::{debug, warn};

use crate::errors::{ErrorClass, FilterError, FilterResult};

/// Per-field outcome of the shared resolution steps.
///
/// `Skipped` is the common "produced nothing" path and carries no error.
#[derive(Debug)]
pub enum Resolution<T> {
    Resolved(T),
    Skipped(Skip),
    Fatal(FilterError),
}

impl<T> Resolution<T> {
    pub fn skipped(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Resolution::Skipped(Skip::new(field, reason))
    }
}

/// A non-fatal per-field opt-out
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Skip {
    pub field: String,
    pub reason: String,
}

impl Skip {
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }

    fn into_error(self) -> FilterError {
        FilterError::skipped(self.field, self.reason)
    }
}

/// What the run does after a field failed
#[derive(Debug)]
pub enum Failure {
    Skip(Skip),
    Error(FilterError),
}

impl Failure {
    fn class(&self) -> ErrorClass {
        match self {
            Failure::Skip(_) => ErrorClass::Skip,
            Failure::Error(err) => err.class(),
        }
    }
}

/// Decides whether a failed field is skipped (`Ok`) or aborts the run (`Err`).
///
/// - Skip-class: abort when the engine is strict or strict-throwing is on
/// - Strictness-class, or strict-throwing on: abort
/// - Fatal-class: abort
pub fn handle(failure: Failure, strict: bool, strict_throwing: bool) -> FilterResult<()> {
    let abort = match failure.class() {
        ErrorClass::Skip => strict || strict_throwing,
        ErrorClass::Strictness => true,
        ErrorClass::Fatal => true,
    } || strict_throwing;

    match failure {
        Failure::Skip(skip) if !abort => {
            debug!(field = %skip.field, reason = %skip.reason, "filter skipped");
            Ok(())
        }
        Failure::Skip(skip) => {
            warn!(field = %skip.field, reason = %skip.reason, "skip escalated to abort");
            Err(skip.into_error())
        }
        Failure::Error(err) => {
            warn!(code = err.code(), error = %err, "filter run aborted");
            Err(err)
        }
    }
}
