// Audit event types and structures
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Kind of pricing decision being recorded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    /// Approval refused because the net receivable was negative
    ApprovalBlocked,
    /// Approval allowed with a net margin under the warning threshold
    LowMarginApproval,
    /// Budget approved and installments generated
    BudgetApproved,
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ApprovalBlocked => "APPROVAL_BLOCKED",
            Self::LowMarginApproval => "LOW_MARGIN_APPROVAL",
            Self::BudgetApproved => "BUDGET_APPROVED",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub action: AuditAction,
    pub entity_type: String,
    pub entity_id: Uuid,
    pub clinic_id: Option<Uuid>,
    pub actor_id: Option<Uuid>,
    pub before: serde_json::Value,
    pub after: serde_json::Value,
    pub summary: String,
}

impl AuditEvent {
    pub fn new(
        action: AuditAction,
        entity_type: impl Into<String>,
        entity_id: Uuid,
        summary: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            action,
            entity_type: entity_type.into(),
            entity_id,
            clinic_id: None,
            actor_id: None,
            before: serde_json::Value::Null,
            after: serde_json::Value::Null,
            summary: summary.into(),
        }
    }

    pub fn with_clinic(mut self, clinic_id: Uuid) -> Self {
        self.clinic_id = Some(clinic_id);
        self
    }

    pub fn with_actor(mut self, actor_id: Option<Uuid>) -> Self {
        self.actor_id = actor_id;
        self
    }

    pub fn with_before(mut self, before: serde_json::Value) -> Self {
        self.before = before;
        self
    }

    pub fn with_after(mut self, after: serde_json::Value) -> Self {
        self.after = after;
        self
    }
}
