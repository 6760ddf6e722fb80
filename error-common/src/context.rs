use serde::{Deserialize, Serialize};

/// Error context information attached when reporting
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorContext {
    pub operation: Option<String>,
    pub clinic_id: Option<String>,
    pub entity_id: Option<String>,
    pub user_id: Option<String>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = Some(operation.into());
        self
    }

    pub fn with_clinic_id(mut self, clinic_id: impl ToString) -> Self {
        self.clinic_id = Some(clinic_id.to_string());
        self
    }

    pub fn with_entity_id(mut self, entity_id: impl ToString) -> Self {
        self.entity_id = Some(entity_id.to_string());
        self
    }

    pub fn with_user_id(mut self, user_id: impl ToString) -> Self {
        self.user_id = Some(user_id.to_string());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_fills_every_field() {
        let ctx = ErrorContext::new()
            .with_operation("approve_budget")
            .with_clinic_id(7)
            .with_entity_id("budget-1")
            .with_user_id("user-9");

        assert_eq!(ctx.operation.as_deref(), Some("approve_budget"));
        assert_eq!(ctx.clinic_id.as_deref(), Some("7"));
        assert_eq!(ctx.entity_id.as_deref(), Some("budget-1"));
        assert_eq!(ctx.user_id.as_deref(), Some("user-9"));
    }
}
