// Error reporting: one log line per failure, level chosen by category

use crate::context::ErrorContext;
use crate::types::{ClassifiedError, ErrorCategory};

#[derive(Debug, Default, Clone, Copy)]
pub struct ErrorReporter;

impl ErrorReporter {
    pub fn new() -> Self {
        Self
    }

    pub fn report<E: ClassifiedError>(&self, error: &E, context: &ErrorContext) {
        let category = error.category();
        let operation = context.operation.as_deref().unwrap_or("unknown");
        let entity_id = context.entity_id.as_deref().unwrap_or("-");
        let user_id = context.user_id.as_deref().unwrap_or("-");

        match category {
            ErrorCategory::PersistenceFailure => tracing::error!(
                error_code = error.code(),
                error_category = %category,
                operation,
                entity_id,
                user_id,
                "{}",
                error
            ),
            ErrorCategory::PolicyViolation => tracing::warn!(
                error_code = error.code(),
                error_category = %category,
                operation,
                entity_id,
                user_id,
                "{}",
                error
            ),
            ErrorCategory::ReferenceDataMissing | ErrorCategory::Validation => tracing::info!(
                error_code = error.code(),
                error_category = %category,
                operation,
                entity_id,
                user_id,
                "{}",
                error
            ),
        }
    }
}
