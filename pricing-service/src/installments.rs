//! Receivable schedule generation for approved budgets.

use crate::error::{PricingError, PricingResult};
use crate::models::{Budget, Installment, InstallmentStatus};
use crate::money::truncate_cents;
use crate::receivables::{PaymentPlan, MAX_INSTALLMENTS};
use crate::repository::{ApprovalCommit, BudgetRepository};
use chrono::{Months, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

/// Everything needed to approve a budget and schedule its receivables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovalRequest {
    pub total_value: Decimal,
    pub installments: u32,
    pub card_profile_id: Option<Uuid>,
    pub down_payment: Decimal,
    pub clinic_id: Uuid,
    pub first_due_date: NaiveDate,
    pub patient_id: Uuid,
    /// Operator performing the approval, recorded in audit events
    #[serde(default)]
    pub actor_id: Option<Uuid>,
}

impl ApprovalRequest {
    pub fn plan(&self) -> PaymentPlan {
        PaymentPlan {
            total_value: self.total_value,
            installments: self.installments,
            card_profile_id: self.card_profile_id,
            down_payment: self.down_payment,
            clinic_id: self.clinic_id,
        }
    }
}

/// Split `amount` into `count` parts truncated to the cent; the last part
/// absorbs the remainder so the parts add up to `amount` exactly.
pub fn split_amount(amount: Decimal, count: u32) -> PricingResult<Vec<Decimal>> {
    if count == 0 || count > MAX_INSTALLMENTS {
        return Err(PricingError::Validation(format!(
            "cannot split into {} installments, allowed range is 1 to {}",
            count, MAX_INSTALLMENTS
        )));
    }
    if amount < Decimal::ZERO {
        return Err(PricingError::Validation("cannot split a negative amount".to_string()));
    }

    let base = truncate_cents(amount / Decimal::from(count));
    let mut parts = vec![base; count as usize];
    let allocated = base * Decimal::from(count - 1);
    if let Some(last) = parts.last_mut() {
        *last = amount - allocated;
    }
    Ok(parts)
}

/// Build the installment rows for a plan.
///
/// A positive down payment becomes sequence 0, due on `down_payment_date`.
/// Financed installment `k` (1-based) is due `k - 1` months after
/// `first_due_date`; month ends clamp to the last day of shorter months.
/// When the down payment covers the whole value no financed rows are emitted.
pub fn build_schedule(
    budget: &Budget,
    request: &ApprovalRequest,
    down_payment_date: NaiveDate,
) -> PricingResult<Vec<Installment>> {
    let plan = request.plan();
    plan.validate()?;

    let row = |sequence: u32, is_down_payment: bool, due_date: NaiveDate, amount: Decimal| Installment {
        id: Uuid::new_v4(),
        budget_id: budget.id,
        clinic_id: budget.clinic_id,
        patient_id: request.patient_id,
        sequence,
        is_down_payment,
        due_date,
        amount,
        status: InstallmentStatus::Pending,
    };

    let mut schedule = Vec::with_capacity(request.installments as usize + 1);
    if request.down_payment > Decimal::ZERO {
        schedule.push(row(0, true, down_payment_date, request.down_payment));
    }

    let remaining = plan.financed_value();
    if remaining > Decimal::ZERO {
        for (index, amount) in split_amount(remaining, request.installments)?.into_iter().enumerate() {
            let offset = u32::try_from(index)
                .map_err(|_| PricingError::Validation("too many installments".to_string()))?;
            let due_date = request
                .first_due_date
                .checked_add_months(Months::new(offset))
                .ok_or_else(|| {
                    PricingError::Validation(format!(
                        "installment {} falls outside the supported date range",
                        offset + 1
                    ))
                })?;
            schedule.push(row(offset + 1, false, due_date, amount));
        }
    }

    Ok(schedule)
}

/// Turns an accepted plan into installments and commits the approval
#[derive(Clone)]
pub struct InstallmentGenerator {
    budgets: Arc<dyn BudgetRepository>,
}

impl InstallmentGenerator {
    pub fn new(budgets: Arc<dyn BudgetRepository>) -> Self {
        Self { budgets }
    }

    /// Status flip and installment batch go to the repository as a single
    /// commit. Any failure there surfaces as `ApprovalCommitFailed`.
    pub async fn approve_budget_and_generate_installments(
        &self,
        budget: &Budget,
        request: &ApprovalRequest,
        down_payment_date: NaiveDate,
    ) -> PricingResult<Vec<Installment>> {
        budget.ensure_approvable()?;
        let installments = build_schedule(budget, request, down_payment_date)?;

        let commit = ApprovalCommit {
            budget_id: budget.id,
            approved_at: Utc::now(),
            installments: installments.clone(),
        };

        match self.budgets.commit_approval(commit).await {
            Ok(()) => {
                info!(
                    budget_id = %budget.id,
                    installments = installments.len(),
                    total_value = %request.total_value,
                    "Budget approved and installments generated"
                );
                Ok(installments)
            }
            Err(e @ PricingError::InvalidTransition { .. }) => Err(e),
            Err(e) => {
                error!(budget_id = %budget.id, error = %e, "Failed to commit budget approval");
                Err(PricingError::ApprovalCommitFailed {
                    budget_id: budget.id,
                    reason: e.to_string(),
                })
            }
        }
    }
}
