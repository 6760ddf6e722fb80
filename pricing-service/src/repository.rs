use crate::error::{PricingError, PricingResult};
use crate::models::*;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use config_engine::PricingConfig;
use dashmap::DashMap;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use uuid::Uuid;

/// Read-only reference data owned by the clinic back office.
///
/// Every lookup of a single row returns `Option`; it is up to the caller to
/// decide whether absence is fatal.
#[async_trait]
pub trait ReferenceDataRepository: Send + Sync {
    async fn find_procedure(&self, procedure_id: Uuid) -> PricingResult<Option<Procedure>>;

    /// Empty when the procedure has no recipe
    async fn material_recipe(&self, procedure_id: Uuid) -> PricingResult<Vec<RecipeLine>>;

    /// All rules of a sales representative within a clinic
    async fn sales_commission_rules(
        &self,
        user_id: Uuid,
        clinic_id: Uuid,
    ) -> PricingResult<Vec<SalesCommissionRule>>;

    async fn find_card_profile(&self, profile_id: Uuid) -> PricingResult<Option<CardMachineProfile>>;

    async fn default_card_profile(&self, clinic_id: Uuid) -> PricingResult<Option<CardMachineProfile>>;

    /// Per-clinic override of the configured pricing defaults
    async fn clinic_pricing(&self, clinic_id: Uuid) -> PricingResult<Option<PricingConfig>>;
}

/// Everything written when an approval goes through
#[derive(Debug, Clone)]
pub struct ApprovalCommit {
    pub budget_id: Uuid,
    pub approved_at: DateTime<Utc>,
    pub installments: Vec<Installment>,
}

/// Mutable budget storage
#[async_trait]
pub trait BudgetRepository: Send + Sync {
    async fn find_budget(&self, budget_id: Uuid) -> PricingResult<Option<Budget>>;

    /// Persist draft edits and manual transitions. Never used for approval.
    async fn save_budget(&self, budget: &Budget) -> PricingResult<()>;

    /// Flip the budget to APPROVED and insert its installments as one unit.
    ///
    /// Implementations must leave nothing behind on failure and must refuse
    /// when the stored budget is no longer DRAFT or SENT.
    async fn commit_approval(&self, commit: ApprovalCommit) -> PricingResult<()>;

    async fn installments_for(&self, budget_id: Uuid) -> PricingResult<Vec<Installment>>;
}

#[derive(Default)]
struct BudgetState {
    budgets: HashMap<Uuid, Budget>,
    installments: HashMap<Uuid, Vec<Installment>>,
}

/// In-memory repository for testing and development
#[derive(Default)]
pub struct InMemoryPricingRepository {
    procedures: DashMap<Uuid, Procedure>,
    recipes: DashMap<Uuid, Vec<RecipeLine>>,
    sales_rules: DashMap<Uuid, SalesCommissionRule>,
    card_profiles: DashMap<Uuid, CardMachineProfile>,
    clinic_pricing: DashMap<Uuid, PricingConfig>,
    state: RwLock<BudgetState>,
    fail_next_commit: AtomicBool,
}

impl InMemoryPricingRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    pub fn insert_procedure(&self, procedure: Procedure) {
        self.procedures.insert(procedure.id, procedure);
    }

    pub fn insert_recipe(&self, procedure_id: Uuid, lines: Vec<RecipeLine>) {
        self.recipes.insert(procedure_id, lines);
    }

    pub fn insert_sales_rule(&self, rule: SalesCommissionRule) {
        self.sales_rules.insert(rule.id, rule);
    }

    pub fn insert_card_profile(&self, profile: CardMachineProfile) {
        self.card_profiles.insert(profile.id, profile);
    }

    pub fn insert_clinic_pricing(&self, clinic_id: Uuid, pricing: PricingConfig) {
        self.clinic_pricing.insert(clinic_id, pricing);
    }

    pub fn insert_budget(&self, budget: Budget) {
        self.state.write().budgets.insert(budget.id, budget);
    }

    /// Make the next `commit_approval` fail without writing anything
    pub fn fail_next_commit(&self) {
        self.fail_next_commit.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl ReferenceDataRepository for InMemoryPricingRepository {
    async fn find_procedure(&self, procedure_id: Uuid) -> PricingResult<Option<Procedure>> {
        Ok(self.procedures.get(&procedure_id).map(|entry| entry.value().clone()))
    }

    async fn material_recipe(&self, procedure_id: Uuid) -> PricingResult<Vec<RecipeLine>> {
        Ok(self
            .recipes
            .get(&procedure_id)
            .map(|entry| entry.value().clone())
            .unwrap_or_default())
    }

    async fn sales_commission_rules(
        &self,
        user_id: Uuid,
        clinic_id: Uuid,
    ) -> PricingResult<Vec<SalesCommissionRule>> {
        Ok(self
            .sales_rules
            .iter()
            .filter(|entry| entry.user_id == user_id && entry.clinic_id == clinic_id)
            .map(|entry| entry.value().clone())
            .collect())
    }

    async fn find_card_profile(&self, profile_id: Uuid) -> PricingResult<Option<CardMachineProfile>> {
        Ok(self.card_profiles.get(&profile_id).map(|entry| entry.value().clone()))
    }

    async fn default_card_profile(&self, clinic_id: Uuid) -> PricingResult<Option<CardMachineProfile>> {
        Ok(self
            .card_profiles
            .iter()
            .find(|entry| entry.clinic_id == clinic_id && entry.is_default)
            .map(|entry| entry.value().clone()))
    }

    async fn clinic_pricing(&self, clinic_id: Uuid) -> PricingResult<Option<PricingConfig>> {
        Ok(self.clinic_pricing.get(&clinic_id).map(|entry| entry.value().clone()))
    }
}

#[async_trait]
impl BudgetRepository for InMemoryPricingRepository {
    async fn find_budget(&self, budget_id: Uuid) -> PricingResult<Option<Budget>> {
        Ok(self.state.read().budgets.get(&budget_id).cloned())
    }

    async fn save_budget(&self, budget: &Budget) -> PricingResult<()> {
        if budget.status == BudgetStatus::Approved {
            return Err(PricingError::Validation(
                "approved budgets are only written through commit_approval".to_string(),
            ));
        }

        let mut state = self.state.write();
        if let Some(existing) = state.budgets.get(&budget.id) {
            if existing.status == BudgetStatus::Approved {
                return Err(PricingError::InvalidTransition {
                    from: existing.status,
                    to: budget.status,
                });
            }
        }
        state.budgets.insert(budget.id, budget.clone());
        Ok(())
    }

    async fn commit_approval(&self, commit: ApprovalCommit) -> PricingResult<()> {
        let mut state = self.state.write();

        let budget = state
            .budgets
            .get(&commit.budget_id)
            .cloned()
            .ok_or(PricingError::BudgetNotFound(commit.budget_id))?;
        budget.ensure_approvable()?;

        if self.fail_next_commit.swap(false, Ordering::SeqCst) {
            return Err(PricingError::Persistence("simulated write failure".to_string()));
        }

        let mut approved = budget;
        approved.mark_approved(commit.approved_at)?;
        state.budgets.insert(approved.id, approved);
        state.installments.insert(commit.budget_id, commit.installments);
        Ok(())
    }

    async fn installments_for(&self, budget_id: Uuid) -> PricingResult<Vec<Installment>> {
        Ok(self
            .state
            .read()
            .installments
            .get(&budget_id)
            .cloned()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn installment(budget: &Budget) -> Installment {
        Installment {
            id: Uuid::new_v4(),
            budget_id: budget.id,
            clinic_id: budget.clinic_id,
            patient_id: budget.patient_id,
            sequence: 1,
            is_down_payment: false,
            due_date: NaiveDate::from_ymd_opt(2026, 11, 10).unwrap(),
            amount: dec!(100),
            status: InstallmentStatus::Pending,
        }
    }

    #[tokio::test]
    async fn test_commit_approval_is_all_or_nothing() {
        let repo = InMemoryPricingRepository::new();
        let budget = Budget::new(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        repo.insert_budget(budget.clone());

        repo.fail_next_commit();
        let failed = repo
            .commit_approval(ApprovalCommit {
                budget_id: budget.id,
                approved_at: Utc::now(),
                installments: vec![installment(&budget)],
            })
            .await;
        assert!(matches!(failed, Err(PricingError::Persistence(_))));
        assert_eq!(repo.find_budget(budget.id).await.unwrap().unwrap().status, BudgetStatus::Draft);
        assert!(repo.installments_for(budget.id).await.unwrap().is_empty());

        repo.commit_approval(ApprovalCommit {
            budget_id: budget.id,
            approved_at: Utc::now(),
            installments: vec![installment(&budget)],
        })
        .await
        .unwrap();
        let stored = repo.find_budget(budget.id).await.unwrap().unwrap();
        assert_eq!(stored.status, BudgetStatus::Approved);
        assert!(stored.approved_at.is_some());
        assert_eq!(repo.installments_for(budget.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_second_commit_is_refused() {
        let repo = InMemoryPricingRepository::new();
        let budget = Budget::new(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        repo.insert_budget(budget.clone());

        let commit = ApprovalCommit {
            budget_id: budget.id,
            approved_at: Utc::now(),
            installments: vec![installment(&budget)],
        };
        repo.commit_approval(commit.clone()).await.unwrap();
        let second = repo.commit_approval(commit).await;
        assert!(matches!(second, Err(PricingError::InvalidTransition { .. })));
        assert_eq!(repo.installments_for(budget.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_default_card_profile_is_scoped_to_clinic() {
        let repo = InMemoryPricingRepository::new();
        let clinic = Uuid::new_v4();
        repo.insert_card_profile(CardMachineProfile {
            id: Uuid::new_v4(),
            clinic_id: Uuid::new_v4(),
            name: "Other clinic".to_string(),
            debit_rate: dec!(1),
            credit_rates: Default::default(),
            is_default: true,
        });
        assert!(repo.default_card_profile(clinic).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_budget_cannot_approve() {
        let repo = InMemoryPricingRepository::new();
        let mut budget = Budget::new(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        budget.status = BudgetStatus::Approved;
        assert!(repo.save_budget(&budget).await.is_err());
    }
}
