use crate::cost::CostCalculator;
use crate::error::{PricingError, PricingResult};
use crate::guard::{ApprovalGuard, GuardDecision};
use crate::installments::{ApprovalRequest, InstallmentGenerator};
use crate::margin::{suggest_minimum_price, BudgetMarginAnalysis, MarginAnalyzer};
use crate::models::*;
use crate::receivables::{ApprovalSimulationResult, PaymentPlan, ReceivablesSimulator};
use crate::repository::{BudgetRepository, ReferenceDataRepository};
use audit_engine::{AuditAction, AuditEvent, AuditSink};
use chrono::Utc;
use config_engine::PricingConfig;
use error_common::{ErrorContext, ErrorReporter};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

/// What the caller gets back from a successful approval
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovalOutcome {
    pub simulation: ApprovalSimulationResult,
    pub decision: GuardDecision,
    pub installments: Vec<Installment>,
}

/// Budget pricing and approval service
pub struct BudgetApprovalService {
    reference: Arc<dyn ReferenceDataRepository>,
    budgets: Arc<dyn BudgetRepository>,
    audit: Arc<dyn AuditSink>,
    defaults: PricingConfig,
    reporter: ErrorReporter,
}

impl BudgetApprovalService {
    /// Create a new service over the given collaborators
    pub fn new(
        reference: Arc<dyn ReferenceDataRepository>,
        budgets: Arc<dyn BudgetRepository>,
        audit: Arc<dyn AuditSink>,
        defaults: PricingConfig,
    ) -> Self {
        Self {
            reference,
            budgets,
            audit,
            defaults,
            reporter: ErrorReporter::new(),
        }
    }

    /// Clinic rates overlaid on the configured defaults, or the defaults alone
    pub async fn pricing_for(&self, clinic_id: Uuid) -> PricingResult<PricingConfig> {
        match self.reference.clinic_pricing(clinic_id).await? {
            Some(clinic) => clinic
                .overlay_on(&self.defaults)
                .map_err(|e| PricingError::Validation(format!("clinic {} pricing: {}", clinic_id, e))),
            None => Ok(self.defaults.clone()),
        }
    }

    pub fn margin_analyzer(&self) -> MarginAnalyzer {
        MarginAnalyzer::new(CostCalculator::new(self.reference.clone()))
    }

    pub fn simulator(&self) -> ReceivablesSimulator {
        ReceivablesSimulator::new(self.reference.clone())
    }

    /// Cost-based margin of a stored budget
    pub async fn compute_budget_margin(&self, budget_id: Uuid) -> PricingResult<BudgetMarginAnalysis> {
        let budget = self.load_budget(budget_id).await?;
        let pricing = self.pricing_for(budget.clinic_id).await?;
        self.margin_analyzer().compute_budget_margin(&budget, &pricing).await
    }

    /// Net receivable preview for a plan; nothing is persisted
    pub async fn simulate_approval(&self, plan: &PaymentPlan) -> PricingResult<ApprovalSimulationResult> {
        let pricing = self.pricing_for(plan.clinic_id).await?;
        self.simulator()
            .simulate_approval(plan, pricing.clinic_tax_rate_percent)
            .await
    }

    /// Minimum price for a procedure at the clinic's target margin, or the
    /// given one. `None` when the procedure does not exist.
    pub async fn suggest_minimum_price(
        &self,
        procedure_id: Uuid,
        clinic_id: Uuid,
        target_margin_percent: Option<Decimal>,
    ) -> PricingResult<Option<Decimal>> {
        let Some(procedure) = self.reference.find_procedure(procedure_id).await? else {
            return Ok(None);
        };
        let recipe = self.reference.material_recipe(procedure_id).await?;
        let pricing = self.pricing_for(clinic_id).await?;

        Ok(Some(suggest_minimum_price(
            &procedure,
            &recipe,
            pricing.cost_per_minute,
            target_margin_percent.unwrap_or(pricing.target_margin_percent),
            pricing.item_tax_rate_percent,
            pricing.card_fee_rate_percent,
        )))
    }

    /// DRAFT -> SENT
    pub async fn send_budget(&self, budget_id: Uuid) -> PricingResult<Budget> {
        let mut budget = self.load_budget(budget_id).await?;
        budget.send()?;
        self.budgets.save_budget(&budget).await?;
        info!(budget_id = %budget_id, "Budget sent to patient");
        Ok(budget)
    }

    /// DRAFT/SENT -> REJECTED
    pub async fn reject_budget(&self, budget_id: Uuid) -> PricingResult<Budget> {
        let mut budget = self.load_budget(budget_id).await?;
        budget.reject()?;
        self.budgets.save_budget(&budget).await?;
        info!(budget_id = %budget_id, "Budget rejected");
        Ok(budget)
    }

    /// Simulate, run the guard, then generate installments and approve.
    ///
    /// A blocked approval writes nothing but its audit entry.
    pub async fn approve_budget_and_generate_installments(
        &self,
        budget_id: Uuid,
        request: ApprovalRequest,
    ) -> PricingResult<ApprovalOutcome> {
        let result = self.approve(budget_id, &request).await;
        if let Err(e) = &result {
            let mut context = ErrorContext::new()
                .with_operation("approve_budget")
                .with_clinic_id(request.clinic_id)
                .with_entity_id(budget_id);
            if let Some(actor) = request.actor_id {
                context = context.with_user_id(actor);
            }
            self.reporter.report(e, &context);
        }
        result
    }

    async fn approve(&self, budget_id: Uuid, request: &ApprovalRequest) -> PricingResult<ApprovalOutcome> {
        let budget = self.load_budget(budget_id).await?;
        budget.ensure_approvable()?;
        validate_request_against(&budget, request)?;

        let pricing = self.pricing_for(budget.clinic_id).await?;
        let simulation = self
            .simulator()
            .simulate_approval(&request.plan(), pricing.clinic_tax_rate_percent)
            .await?;

        let guard = ApprovalGuard::new(self.audit.clone(), pricing.thresholds.approval_warning);
        let decision = guard.check(&budget, &simulation, request.actor_id).await?;

        let generator = InstallmentGenerator::new(self.budgets.clone());
        let installments = generator
            .approve_budget_and_generate_installments(&budget, request, Utc::now().date_naive())
            .await?;

        let event = AuditEvent::new(
            AuditAction::BudgetApproved,
            "budget",
            budget.id,
            format!("Budget {} approved with {} receivables", budget.id, installments.len()),
        )
        .with_clinic(budget.clinic_id)
        .with_actor(request.actor_id)
        .with_before(json!({ "status": budget.status }))
        .with_after(json!({
            "status": BudgetStatus::Approved,
            "net_value": simulation.net_value,
            "installments": installments.len(),
        }));
        if let Err(e) = self.audit.record(event).await {
            error!(budget_id = %budget.id, error = %e, "Failed to record approval audit event");
        }

        Ok(ApprovalOutcome { simulation, decision, installments })
    }

    async fn load_budget(&self, budget_id: Uuid) -> PricingResult<Budget> {
        self.budgets
            .find_budget(budget_id)
            .await?
            .ok_or(PricingError::BudgetNotFound(budget_id))
    }
}

fn validate_request_against(budget: &Budget, request: &ApprovalRequest) -> PricingResult<()> {
    if request.clinic_id != budget.clinic_id {
        return Err(PricingError::Validation("approval clinic does not match the budget".to_string()));
    }
    if request.patient_id != budget.patient_id {
        return Err(PricingError::Validation("approval patient does not match the budget".to_string()));
    }
    if request.total_value != budget.final_value {
        return Err(PricingError::Validation(format!(
            "plan total {} differs from the budget final value {}",
            request.total_value, budget.final_value
        )));
    }
    request.plan().validate()
}
