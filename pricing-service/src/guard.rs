//! Profit Guardian: the approval-time policy gate.
//!
//! Evaluated on the simulated net receivable, never on the cost-based margin.
//! The guard keeps no state between calls.

use crate::error::{PricingError, PricingResult};
use crate::models::Budget;
use crate::receivables::ApprovalSimulationResult;
use audit_engine::{AuditAction, AuditEvent, AuditSink};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum GuardDecision {
    /// Net value is negative; approval refused
    Blocked { shortfall: Decimal },
    /// Approval proceeds with a recorded low-margin audit entry
    Warn { net_margin_percent: Decimal },
    /// Approval proceeds silently
    Pass,
}

impl GuardDecision {
    pub fn allows_approval(&self) -> bool {
        !matches!(self, Self::Blocked { .. })
    }
}

/// Blocks iff net < 0, warns iff the net margin is under `warning_threshold`
pub fn evaluate(simulation: &ApprovalSimulationResult, warning_threshold: Decimal) -> GuardDecision {
    if simulation.net_value < Decimal::ZERO {
        return GuardDecision::Blocked { shortfall: -simulation.net_value };
    }
    if simulation.net_margin_percent < warning_threshold {
        return GuardDecision::Warn { net_margin_percent: simulation.net_margin_percent };
    }
    GuardDecision::Pass
}

/// Applies [`evaluate`] and writes the audit entries the policy requires
#[derive(Clone)]
pub struct ApprovalGuard {
    audit: Arc<dyn AuditSink>,
    warning_threshold: Decimal,
}

impl ApprovalGuard {
    pub fn new(audit: Arc<dyn AuditSink>, warning_threshold: Decimal) -> Self {
        Self { audit, warning_threshold }
    }

    /// `Err(ApprovalBlocked)` on a negative net value; otherwise the decision
    /// to continue with. Audit failures are logged and never change the
    /// outcome.
    pub async fn check(
        &self,
        budget: &Budget,
        simulation: &ApprovalSimulationResult,
        actor_id: Option<Uuid>,
    ) -> PricingResult<GuardDecision> {
        let decision = evaluate(simulation, self.warning_threshold);

        match &decision {
            GuardDecision::Blocked { shortfall } => {
                warn!(
                    budget_id = %budget.id,
                    gross_value = %simulation.gross_value,
                    net_value = %simulation.net_value,
                    "Approval blocked: loss-making payment plan"
                );
                let event = self
                    .event(AuditAction::ApprovalBlocked, budget, simulation, actor_id)
                    .with_after(json!({
                        "status": budget.status,
                        "gross_value": simulation.gross_value,
                        "card_fee_amount": simulation.card_fee_amount,
                        "tax_amount": simulation.tax_amount,
                        "net_value": simulation.net_value,
                        "shortfall": shortfall,
                    }));
                self.record(event).await;

                Err(PricingError::ApprovalBlocked {
                    gross_value: simulation.gross_value,
                    net_value: simulation.net_value,
                    shortfall: *shortfall,
                })
            }
            GuardDecision::Warn { net_margin_percent } => {
                warn!(
                    budget_id = %budget.id,
                    net_margin_percent = %net_margin_percent,
                    "Approving budget with low net margin"
                );
                let event = self
                    .event(AuditAction::LowMarginApproval, budget, simulation, actor_id)
                    .with_after(json!({
                        "gross_value": simulation.gross_value,
                        "net_value": simulation.net_value,
                        "net_margin_percent": net_margin_percent,
                        "threshold_percent": self.warning_threshold,
                    }));
                self.record(event).await;
                Ok(decision)
            }
            GuardDecision::Pass => {
                info!(budget_id = %budget.id, net_value = %simulation.net_value, "Approval guard passed");
                Ok(decision)
            }
        }
    }

    fn event(
        &self,
        action: AuditAction,
        budget: &Budget,
        simulation: &ApprovalSimulationResult,
        actor_id: Option<Uuid>,
    ) -> AuditEvent {
        let summary = match action {
            AuditAction::ApprovalBlocked => format!(
                "Approval blocked for budget {}: gross {} would net {}",
                budget.id, simulation.gross_value, simulation.net_value
            ),
            _ => format!(
                "Budget {} approved with net margin {}% (net {} on gross {})",
                budget.id,
                simulation.net_margin_percent.round_dp(2),
                simulation.net_value,
                simulation.gross_value
            ),
        };

        AuditEvent::new(action, "budget", budget.id, summary)
            .with_clinic(budget.clinic_id)
            .with_actor(actor_id)
            .with_before(json!({
                "status": budget.status,
                "final_value": budget.final_value,
                "patient_id": budget.patient_id,
            }))
    }

    async fn record(&self, event: AuditEvent) {
        let action = event.action;
        if let Err(e) = self.audit.record(event).await {
            error!(action = %action, error = %e, "Failed to record audit event");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::receivables::RateSnapshot;
    use audit_engine::InMemoryAuditSink;
    use rust_decimal_macros::dec;

    fn simulation(gross: Decimal, net: Decimal) -> ApprovalSimulationResult {
        ApprovalSimulationResult {
            gross_value: gross,
            card_fee_amount: Decimal::ZERO,
            tax_amount: gross - net,
            net_value: net,
            net_margin_percent: crate::money::ratio_percent(net, gross),
            rates: RateSnapshot {
                card_profile_id: None,
                card_profile_name: None,
                installments: 1,
                card_rate_percent: Decimal::ZERO,
                clinic_tax_rate_percent: Decimal::ZERO,
            },
        }
    }

    fn budget() -> Budget {
        Budget::new(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4())
    }

    #[test]
    fn test_boundaries() {
        let threshold = dec!(20);
        assert_eq!(
            evaluate(&simulation(dec!(100), dec!(-0.01)), threshold),
            GuardDecision::Blocked { shortfall: dec!(0.01) }
        );
        assert!(matches!(evaluate(&simulation(dec!(100), dec!(0)), threshold), GuardDecision::Warn { .. }));
        assert!(matches!(evaluate(&simulation(dec!(100), dec!(19.99)), threshold), GuardDecision::Warn { .. }));
        assert_eq!(evaluate(&simulation(dec!(100), dec!(20)), threshold), GuardDecision::Pass);
        assert_eq!(evaluate(&simulation(dec!(1000), dec!(948)), threshold), GuardDecision::Pass);
    }

    #[test]
    fn test_zero_gross_value_warns() {
        assert!(matches!(
            evaluate(&simulation(Decimal::ZERO, Decimal::ZERO), dec!(20)),
            GuardDecision::Warn { .. }
        ));
    }

    #[tokio::test]
    async fn test_block_records_audit_and_errors() {
        let sink = Arc::new(InMemoryAuditSink::new());
        let guard = ApprovalGuard::new(sink.clone(), dec!(20));

        let result = guard.check(&budget(), &simulation(dec!(100), dec!(-10)), None).await;
        assert!(matches!(
            result,
            Err(PricingError::ApprovalBlocked { shortfall, .. }) if shortfall == dec!(10)
        ));

        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].action, AuditAction::ApprovalBlocked);
        assert_eq!(events[0].after["net_value"], json!(dec!(-10)));
    }

    #[tokio::test]
    async fn test_warn_records_audit_and_continues() {
        let sink = Arc::new(InMemoryAuditSink::new());
        let guard = ApprovalGuard::new(sink.clone(), dec!(20));

        let decision = guard.check(&budget(), &simulation(dec!(100), dec!(12)), None).await.unwrap();
        assert!(decision.allows_approval());
        assert_eq!(sink.events()[0].action, AuditAction::LowMarginApproval);
    }

    #[tokio::test]
    async fn test_pass_is_silent() {
        let sink = Arc::new(InMemoryAuditSink::new());
        let guard = ApprovalGuard::new(sink.clone(), dec!(20));

        let decision = guard.check(&budget(), &simulation(dec!(100), dec!(80)), None).await.unwrap();
        assert_eq!(decision, GuardDecision::Pass);
        assert!(sink.events().is_empty());
    }

    #[tokio::test]
    async fn test_audit_failure_does_not_change_outcome() {
        let sink = Arc::new(InMemoryAuditSink::new());
        sink.set_failing(true);
        let guard = ApprovalGuard::new(sink, dec!(20));

        let decision = guard.check(&budget(), &simulation(dec!(100), dec!(5)), None).await.unwrap();
        assert!(matches!(decision, GuardDecision::Warn { .. }));
    }
}
