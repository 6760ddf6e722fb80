//! PostgreSQL-backed pricing repository
//!
//! Reference data is read-only here. Budgets are written through
//! `save_budget` while editable and through `commit_approval` exactly once,
//! inside a single transaction that also inserts the installment batch.

use crate::connection::DatabasePool;
use crate::error::{DatabaseError, DatabaseResult};
use crate::rows;
use async_trait::async_trait;
use config_engine::PricingConfig;
use pricing_service::{
    ApprovalCommit, Budget, BudgetRepository, BudgetStatus, CardMachineProfile, Installment, PricingError,
    PricingResult, Procedure, RecipeLine, ReferenceDataRepository, SalesCommissionRule,
};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::{debug, error, info};
use uuid::Uuid;

fn reference(e: sqlx::Error) -> PricingError {
    DatabaseError::from(e).into_reference()
}

fn persistence(e: sqlx::Error) -> PricingError {
    DatabaseError::from(e).into_persistence()
}

pub struct PostgresPricingRepository {
    pool: PgPool,
}

impl PostgresPricingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn from_pool(pool: &DatabasePool) -> Self {
        Self::new(pool.pool().clone())
    }

    async fn load_card_profile(&self, row: &sqlx::postgres::PgRow) -> DatabaseResult<CardMachineProfile> {
        let profile_id: Uuid = row.try_get("id")?;
        let rates: Vec<(i32, Decimal)> = sqlx::query_as(
            "SELECT installments, rate FROM card_machine_rates WHERE profile_id = $1 ORDER BY installments",
        )
        .bind(profile_id)
        .fetch_all(&self.pool)
        .await?;

        rows::card_profile(row, rows::rate_table(&rates)?)
    }

    async fn insert_items(tx: &mut Transaction<'_, Postgres>, budget: &Budget) -> DatabaseResult<()> {
        sqlx::query("DELETE FROM budget_items WHERE budget_id = $1")
            .bind(budget.id)
            .execute(&mut **tx)
            .await?;

        for (position, item) in budget.items.iter().enumerate() {
            let position = i32::try_from(position)
                .map_err(|_| DatabaseError::InvalidData("too many budget items".to_string()))?;
            sqlx::query(
                r#"
                INSERT INTO budget_items (
                    id, budget_id, position, procedure_id, quantity, unit_price, discount_percent, total
                ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            )
            .bind(item.id)
            .bind(budget.id)
            .bind(position)
            .bind(item.procedure_id)
            .bind(rows::to_column(item.quantity)?)
            .bind(item.unit_price)
            .bind(item.discount_percent)
            .bind(item.total)
            .execute(&mut **tx)
            .await?;
        }
        Ok(())
    }

    async fn insert_installments(
        tx: &mut Transaction<'_, Postgres>,
        installments: &[Installment],
    ) -> DatabaseResult<()> {
        for installment in installments {
            sqlx::query(
                r#"
                INSERT INTO installments (
                    id, budget_id, clinic_id, patient_id, sequence, is_down_payment, due_date, amount, status
                ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                "#,
            )
            .bind(installment.id)
            .bind(installment.budget_id)
            .bind(installment.clinic_id)
            .bind(installment.patient_id)
            .bind(rows::to_column(installment.sequence)?)
            .bind(installment.is_down_payment)
            .bind(installment.due_date)
            .bind(installment.amount)
            .bind(installment.status.as_str())
            .execute(&mut **tx)
            .await?;
        }
        Ok(())
    }

    async fn upsert_budget(&self, budget: &Budget) -> DatabaseResult<bool> {
        let mut tx = self.pool.begin().await?;

        let written = sqlx::query(
            r#"
            INSERT INTO budgets (
                id, clinic_id, patient_id, professional_id, sales_rep_id,
                discount_value, total_value, final_value, status, created_at, approved_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (id) DO UPDATE SET
                sales_rep_id = EXCLUDED.sales_rep_id,
                discount_value = EXCLUDED.discount_value,
                total_value = EXCLUDED.total_value,
                final_value = EXCLUDED.final_value,
                status = EXCLUDED.status
            WHERE budgets.status <> 'APPROVED'
            "#,
        )
        .bind(budget.id)
        .bind(budget.clinic_id)
        .bind(budget.patient_id)
        .bind(budget.professional_id)
        .bind(budget.sales_rep_id)
        .bind(budget.discount_value)
        .bind(budget.total_value)
        .bind(budget.final_value)
        .bind(budget.status.as_str())
        .bind(budget.created_at)
        .bind(budget.approved_at)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if written == 0 {
            return Ok(false);
        }

        Self::insert_items(&mut tx, budget).await?;
        tx.commit().await?;
        Ok(true)
    }

    async fn stored_status(&self, budget_id: Uuid) -> DatabaseResult<Option<BudgetStatus>> {
        let status: Option<String> = sqlx::query_scalar("SELECT status FROM budgets WHERE id = $1")
            .bind(budget_id)
            .fetch_optional(&self.pool)
            .await?;
        status.map(|s| rows::parse_budget_status(&s)).transpose()
    }

    /// `Ok(false)` when the budget was not in an approvable state
    async fn try_commit(&self, commit: &ApprovalCommit) -> DatabaseResult<bool> {
        let mut tx = self.pool.begin().await?;

        let flipped = sqlx::query(
            r#"
            UPDATE budgets
            SET status = 'APPROVED', approved_at = $2
            WHERE id = $1 AND status IN ('DRAFT', 'SENT')
            "#,
        )
        .bind(commit.budget_id)
        .bind(commit.approved_at)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if flipped == 0 {
            return Ok(false);
        }

        Self::insert_installments(&mut tx, &commit.installments).await?;
        tx.commit().await?;
        Ok(true)
    }
}

#[async_trait]
impl ReferenceDataRepository for PostgresPricingRepository {
    async fn find_procedure(&self, procedure_id: Uuid) -> PricingResult<Option<Procedure>> {
        let row = sqlx::query(
            r#"
            SELECT id, name, category_id, duration_minutes, estimated_lab_cost,
                   commission_type, commission_value
            FROM procedures
            WHERE id = $1
            "#,
        )
        .bind(procedure_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(reference)?;

        row.as_ref()
            .map(rows::procedure)
            .transpose()
            .map_err(DatabaseError::into_reference)
    }

    async fn material_recipe(&self, procedure_id: Uuid) -> PricingResult<Vec<RecipeLine>> {
        let found = sqlx::query(
            r#"
            SELECT m.inventory_item_id, i.name AS item_name, m.quantity, i.average_unit_cost
            FROM procedure_materials m
            JOIN inventory_items i ON i.id = m.inventory_item_id
            WHERE m.procedure_id = $1
            "#,
        )
        .bind(procedure_id)
        .fetch_all(&self.pool)
        .await
        .map_err(reference)?;

        debug!(procedure_id = %procedure_id, lines = found.len(), "Loaded material recipe");
        found
            .iter()
            .map(rows::recipe_line)
            .collect::<DatabaseResult<Vec<_>>>()
            .map_err(DatabaseError::into_reference)
    }

    async fn sales_commission_rules(
        &self,
        user_id: Uuid,
        clinic_id: Uuid,
    ) -> PricingResult<Vec<SalesCommissionRule>> {
        let found = sqlx::query(
            r#"
            SELECT id, user_id, clinic_id, category_id, commission_type, value,
                   minimum_budget_value, is_active
            FROM sales_commission_rules
            WHERE user_id = $1 AND clinic_id = $2
            "#,
        )
        .bind(user_id)
        .bind(clinic_id)
        .fetch_all(&self.pool)
        .await
        .map_err(reference)?;

        found
            .iter()
            .map(rows::sales_rule)
            .collect::<DatabaseResult<Vec<_>>>()
            .map_err(DatabaseError::into_reference)
    }

    async fn find_card_profile(&self, profile_id: Uuid) -> PricingResult<Option<CardMachineProfile>> {
        let row = sqlx::query(
            "SELECT id, clinic_id, name, debit_rate, is_default FROM card_machine_profiles WHERE id = $1",
        )
        .bind(profile_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(reference)?;

        match row {
            Some(row) => self
                .load_card_profile(&row)
                .await
                .map(Some)
                .map_err(DatabaseError::into_reference),
            None => Ok(None),
        }
    }

    async fn default_card_profile(&self, clinic_id: Uuid) -> PricingResult<Option<CardMachineProfile>> {
        let row = sqlx::query(
            r#"
            SELECT id, clinic_id, name, debit_rate, is_default
            FROM card_machine_profiles
            WHERE clinic_id = $1 AND is_default
            ORDER BY name
            LIMIT 1
            "#,
        )
        .bind(clinic_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(reference)?;

        match row {
            Some(row) => self
                .load_card_profile(&row)
                .await
                .map(Some)
                .map_err(DatabaseError::into_reference),
            None => Ok(None),
        }
    }

    async fn clinic_pricing(&self, clinic_id: Uuid) -> PricingResult<Option<PricingConfig>> {
        let row = sqlx::query(
            r#"
            SELECT cost_per_minute, item_tax_rate_percent, clinic_tax_rate_percent,
                   card_fee_rate_percent, target_margin_percent
            FROM clinic_pricing_settings
            WHERE clinic_id = $1
            "#,
        )
        .bind(clinic_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(reference)?;

        row.as_ref()
            .map(rows::clinic_pricing)
            .transpose()
            .map_err(DatabaseError::into_reference)
    }
}

#[async_trait]
impl BudgetRepository for PostgresPricingRepository {
    async fn find_budget(&self, budget_id: Uuid) -> PricingResult<Option<Budget>> {
        let Some(row) = sqlx::query(
            r#"
            SELECT id, clinic_id, patient_id, professional_id, sales_rep_id, discount_value,
                   total_value, final_value, status, created_at, approved_at
            FROM budgets
            WHERE id = $1
            "#,
        )
        .bind(budget_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(persistence)?
        else {
            return Ok(None);
        };

        let item_rows = sqlx::query(
            r#"
            SELECT id, procedure_id, quantity, unit_price, discount_percent, total
            FROM budget_items
            WHERE budget_id = $1
            ORDER BY position
            "#,
        )
        .bind(budget_id)
        .fetch_all(&self.pool)
        .await
        .map_err(persistence)?;

        let items = item_rows
            .iter()
            .map(rows::budget_item)
            .collect::<DatabaseResult<Vec<_>>>()
            .map_err(DatabaseError::into_persistence)?;

        rows::budget(&row, items)
            .map(Some)
            .map_err(DatabaseError::into_persistence)
    }

    async fn save_budget(&self, budget: &Budget) -> PricingResult<()> {
        if budget.status == BudgetStatus::Approved {
            return Err(PricingError::Validation(
                "approved budgets are only written through commit_approval".to_string(),
            ));
        }

        let written = self
            .upsert_budget(budget)
            .await
            .map_err(DatabaseError::into_persistence)?;
        if !written {
            return Err(PricingError::InvalidTransition {
                from: BudgetStatus::Approved,
                to: budget.status,
            });
        }

        debug!(budget_id = %budget.id, status = %budget.status, "Budget saved");
        Ok(())
    }

    async fn commit_approval(&self, commit: ApprovalCommit) -> PricingResult<()> {
        match self.try_commit(&commit).await {
            Ok(true) => {
                info!(
                    budget_id = %commit.budget_id,
                    installments = commit.installments.len(),
                    "Approval committed"
                );
                Ok(())
            }
            Ok(false) => match self
                .stored_status(commit.budget_id)
                .await
                .map_err(DatabaseError::into_persistence)?
            {
                Some(from) => Err(PricingError::InvalidTransition { from, to: BudgetStatus::Approved }),
                None => Err(PricingError::BudgetNotFound(commit.budget_id)),
            },
            Err(e) => {
                error!(budget_id = %commit.budget_id, error = %e, "Approval transaction rolled back");
                Err(e.into_persistence())
            }
        }
    }

    async fn installments_for(&self, budget_id: Uuid) -> PricingResult<Vec<Installment>> {
        let found = sqlx::query(
            r#"
            SELECT id, budget_id, clinic_id, patient_id, sequence, is_down_payment, due_date, amount, status
            FROM installments
            WHERE budget_id = $1
            ORDER BY sequence
            "#,
        )
        .bind(budget_id)
        .fetch_all(&self.pool)
        .await
        .map_err(persistence)?;

        found
            .iter()
            .map(rows::installment)
            .collect::<DatabaseResult<Vec<_>>>()
            .map_err(DatabaseError::into_persistence)
    }
}
