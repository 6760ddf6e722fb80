use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse classification shared by every crate in the workspace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// A reference row (procedure, card profile, budget) could not be resolved
    ReferenceDataMissing,
    /// A business policy refused the operation
    PolicyViolation,
    /// The external store failed to persist or read data
    PersistenceFailure,
    /// Caller supplied invalid input
    Validation,
}

impl ErrorCategory {
    /// Whether the user can fix the problem by changing their input
    pub fn is_user_correctable(&self) -> bool {
        matches!(self, Self::PolicyViolation | Self::Validation)
    }

    /// Whether retrying the same request may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::PersistenceFailure)
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ReferenceDataMissing => "reference_data_missing",
            Self::PolicyViolation => "policy_violation",
            Self::PersistenceFailure => "persistence_failure",
            Self::Validation => "validation",
        };
        f.write_str(name)
    }
}

/// Implemented by crate-level error enums so they can be reported uniformly
pub trait ClassifiedError: std::error::Error {
    fn category(&self) -> ErrorCategory;

    /// Stable code from [`crate::codes`]
    fn code(&self) -> &'static str;

    /// Message safe to show to an operator
    fn user_message(&self) -> String {
        match self.category() {
            ErrorCategory::PersistenceFailure => {
                "The operation could not be saved. Please try again.".to_string()
            }
            _ => self.to_string(),
        }
    }
}
