use error_common::{codes, ClassifiedError, ErrorCategory};
use pricing_service::PricingError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Stored value is not valid: {0}")]
    InvalidData(String),

    #[error("Schema setup failed: {0}")]
    SchemaError(String),

    #[error("Database error: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

pub type DatabaseResult<T> = Result<T, DatabaseError>;

impl ClassifiedError for DatabaseError {
    fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidData(_) => ErrorCategory::ReferenceDataMissing,
            _ => ErrorCategory::PersistenceFailure,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            Self::InvalidData(_) => codes::reference_data::LOOKUP_FAILED,
            _ => codes::persistence::WRITE_FAILED,
        }
    }
}

impl DatabaseError {
    /// Failure while reading clinic reference data
    pub fn into_reference(self) -> PricingError {
        PricingError::ReferenceData(self.to_string())
    }

    /// Failure while reading or writing budgets and installments
    pub fn into_persistence(self) -> PricingError {
        PricingError::Persistence(self.to_string())
    }
}
