use crate::models::BudgetStatus;
use error_common::{codes, ClassifiedError, ErrorCategory};
use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PricingError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Budget not found: {0}")]
    BudgetNotFound(Uuid),

    #[error("Card machine profile not found: {0}")]
    CardProfileNotFound(Uuid),

    #[error("Reference data lookup failed: {0}")]
    ReferenceData(String),

    #[error("Budget cannot move from {from} to {to}")]
    InvalidTransition { from: BudgetStatus, to: BudgetStatus },

    #[error("Approval blocked: net value {net_value} on gross {gross_value} leaves a shortfall of {shortfall}")]
    ApprovalBlocked {
        gross_value: Decimal,
        net_value: Decimal,
        shortfall: Decimal,
    },

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Approval of budget {budget_id} could not be committed: {reason}")]
    ApprovalCommitFailed { budget_id: Uuid, reason: String },
}

impl ClassifiedError for PricingError {
    fn category(&self) -> ErrorCategory {
        match self {
            Self::Validation(_) | Self::InvalidTransition { .. } => ErrorCategory::Validation,
            Self::BudgetNotFound(_) | Self::CardProfileNotFound(_) => {
                ErrorCategory::ReferenceDataMissing
            }
            Self::ApprovalBlocked { .. } => ErrorCategory::PolicyViolation,
            Self::ReferenceData(_) | Self::Persistence(_) | Self::ApprovalCommitFailed { .. } => {
                ErrorCategory::PersistenceFailure
            }
        }
    }

    fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => codes::validation::INVALID_INPUT,
            Self::InvalidTransition { .. } => codes::validation::INVALID_TRANSITION,
            Self::BudgetNotFound(_) => codes::reference_data::BUDGET_NOT_FOUND,
            Self::CardProfileNotFound(_) => codes::reference_data::CARD_PROFILE_NOT_FOUND,
            Self::ReferenceData(_) => codes::reference_data::LOOKUP_FAILED,
            Self::ApprovalBlocked { .. } => codes::policy::APPROVAL_BLOCKED,
            Self::Persistence(_) => codes::persistence::WRITE_FAILED,
            Self::ApprovalCommitFailed { .. } => codes::persistence::APPROVAL_COMMIT_FAILED,
        }
    }

    fn user_message(&self) -> String {
        match self {
            Self::ApprovalBlocked { gross_value, net_value, shortfall } => format!(
                "Approval blocked: this payment plan loses {} (net {} on a gross of {}). \
                 Change the down payment, installments or card profile before approving.",
                shortfall, net_value, gross_value
            ),
            Self::ApprovalCommitFailed { .. } => {
                "The approval could not be saved and the budget was left unchanged. Please try again."
                    .to_string()
            }
            Self::ReferenceData(_) | Self::Persistence(_) => {
                "The operation could not be completed. Please try again.".to_string()
            }
            other => other.to_string(),
        }
    }
}

pub type PricingResult<T> = Result<T, PricingError>;

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_blocked_message_names_shortfall() {
        let err = PricingError::ApprovalBlocked {
            gross_value: dec!(100.00),
            net_value: dec!(-10.00),
            shortfall: dec!(10.00),
        };
        assert_eq!(err.category(), ErrorCategory::PolicyViolation);
        assert!(err.user_message().contains("loses 10.00"));
    }

    #[test]
    fn test_commit_failure_is_distinct_from_generic_persistence() {
        let commit = PricingError::ApprovalCommitFailed {
            budget_id: Uuid::new_v4(),
            reason: "deadlock detected".to_string(),
        };
        let generic = PricingError::Persistence("timeout".to_string());
        assert_eq!(commit.category(), generic.category());
        assert_ne!(commit.code(), generic.code());
        assert!(!commit.user_message().contains("deadlock"));
    }
}
