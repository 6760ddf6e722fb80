//! Mapping between Postgres rows and pricing models.

use crate::error::{DatabaseError, DatabaseResult};
use config_engine::{MarginThresholds, PricingConfig};
use pricing_service::{
    Budget, BudgetItem, BudgetStatus, CardMachineProfile, CommissionRule, CommissionType, Installment,
    InstallmentStatus, Procedure, RecipeLine, SalesCommissionRule, SalesCommissionType,
};
use rust_decimal::Decimal;
use sqlx::postgres::PgRow;
use sqlx::Row;
use std::collections::BTreeMap;

pub fn commission_type_str(value: CommissionType) -> &'static str {
    match value {
        CommissionType::Percentage => "PERCENTAGE",
        CommissionType::FixedAmount => "FIXED_AMOUNT",
    }
}

pub fn parse_commission_type(value: &str) -> DatabaseResult<CommissionType> {
    match value {
        "PERCENTAGE" => Ok(CommissionType::Percentage),
        "FIXED_AMOUNT" => Ok(CommissionType::FixedAmount),
        other => Err(DatabaseError::InvalidData(format!("commission type '{}'", other))),
    }
}

pub fn parse_sales_commission_type(value: &str) -> DatabaseResult<SalesCommissionType> {
    match value {
        "PERCENTAGE" => Ok(SalesCommissionType::Percentage),
        "FIXED" => Ok(SalesCommissionType::Fixed),
        other => Err(DatabaseError::InvalidData(format!("sales commission type '{}'", other))),
    }
}

pub fn parse_budget_status(value: &str) -> DatabaseResult<BudgetStatus> {
    BudgetStatus::parse(value).ok_or_else(|| DatabaseError::InvalidData(format!("budget status '{}'", value)))
}

pub fn parse_installment_status(value: &str) -> DatabaseResult<InstallmentStatus> {
    InstallmentStatus::parse(value)
        .ok_or_else(|| DatabaseError::InvalidData(format!("installment status '{}'", value)))
}

/// INTEGER columns that hold counts never go below zero
pub fn to_count(column: &str, value: i32) -> DatabaseResult<u32> {
    u32::try_from(value).map_err(|_| DatabaseError::InvalidData(format!("{} = {}", column, value)))
}

pub fn to_column(value: u32) -> DatabaseResult<i32> {
    i32::try_from(value).map_err(|_| DatabaseError::InvalidData(format!("{} does not fit an INTEGER column", value)))
}

pub fn procedure(row: &PgRow) -> DatabaseResult<Procedure> {
    let commission_type: String = row.try_get("commission_type")?;
    Ok(Procedure {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        category_id: row.try_get("category_id")?,
        duration_minutes: to_count("duration_minutes", row.try_get("duration_minutes")?)?,
        estimated_lab_cost: row.try_get("estimated_lab_cost")?,
        commission: CommissionRule {
            commission_type: parse_commission_type(&commission_type)?,
            value: row.try_get("commission_value")?,
        },
    })
}

pub fn recipe_line(row: &PgRow) -> DatabaseResult<RecipeLine> {
    Ok(RecipeLine {
        inventory_item_id: row.try_get("inventory_item_id")?,
        item_name: row.try_get("item_name")?,
        quantity: row.try_get("quantity")?,
        average_unit_cost: row.try_get("average_unit_cost")?,
    })
}

pub fn sales_rule(row: &PgRow) -> DatabaseResult<SalesCommissionRule> {
    let commission_type: String = row.try_get("commission_type")?;
    Ok(SalesCommissionRule {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        clinic_id: row.try_get("clinic_id")?,
        category_id: row.try_get("category_id")?,
        commission_type: parse_sales_commission_type(&commission_type)?,
        value: row.try_get("value")?,
        minimum_budget_value: row.try_get("minimum_budget_value")?,
        is_active: row.try_get("is_active")?,
    })
}

/// Fee tiers keyed by installment count
pub fn rate_table(rows: &[(i32, Decimal)]) -> DatabaseResult<BTreeMap<u32, Decimal>> {
    rows.iter()
        .map(|(installments, rate)| Ok((to_count("installments", *installments)?, *rate)))
        .collect()
}

pub fn card_profile(row: &PgRow, credit_rates: BTreeMap<u32, Decimal>) -> DatabaseResult<CardMachineProfile> {
    Ok(CardMachineProfile {
        id: row.try_get("id")?,
        clinic_id: row.try_get("clinic_id")?,
        name: row.try_get("name")?,
        debit_rate: row.try_get("debit_rate")?,
        credit_rates,
        is_default: row.try_get("is_default")?,
    })
}

/// Clinic settings row; thresholds are not stored per clinic
pub fn clinic_pricing(row: &PgRow) -> DatabaseResult<PricingConfig> {
    Ok(PricingConfig {
        cost_per_minute: row.try_get("cost_per_minute")?,
        item_tax_rate_percent: row.try_get("item_tax_rate_percent")?,
        clinic_tax_rate_percent: row.try_get("clinic_tax_rate_percent")?,
        card_fee_rate_percent: row.try_get("card_fee_rate_percent")?,
        target_margin_percent: row.try_get("target_margin_percent")?,
        thresholds: MarginThresholds::default(),
    })
}

pub fn budget_item(row: &PgRow) -> DatabaseResult<BudgetItem> {
    Ok(BudgetItem {
        id: row.try_get("id")?,
        procedure_id: row.try_get("procedure_id")?,
        quantity: to_count("quantity", row.try_get("quantity")?)?,
        unit_price: row.try_get("unit_price")?,
        discount_percent: row.try_get("discount_percent")?,
        total: row.try_get("total")?,
    })
}

pub fn budget(row: &PgRow, items: Vec<BudgetItem>) -> DatabaseResult<Budget> {
    let status: String = row.try_get("status")?;
    Ok(Budget {
        id: row.try_get("id")?,
        clinic_id: row.try_get("clinic_id")?,
        patient_id: row.try_get("patient_id")?,
        professional_id: row.try_get("professional_id")?,
        sales_rep_id: row.try_get("sales_rep_id")?,
        items,
        discount_value: row.try_get("discount_value")?,
        total_value: row.try_get("total_value")?,
        final_value: row.try_get("final_value")?,
        status: parse_budget_status(&status)?,
        created_at: row.try_get("created_at")?,
        approved_at: row.try_get("approved_at")?,
    })
}

pub fn installment(row: &PgRow) -> DatabaseResult<Installment> {
    let status: String = row.try_get("status")?;
    Ok(Installment {
        id: row.try_get("id")?,
        budget_id: row.try_get("budget_id")?,
        clinic_id: row.try_get("clinic_id")?,
        patient_id: row.try_get("patient_id")?,
        sequence: to_count("sequence", row.try_get("sequence")?)?,
        is_down_payment: row.try_get("is_down_payment")?,
        due_date: row.try_get("due_date")?,
        amount: row.try_get("amount")?,
        status: parse_installment_status(&status)?,
    })
}
