use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// How a professional is paid for performing a procedure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommissionType {
    Percentage,
    FixedAmount,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommissionRule {
    #[serde(rename = "type")]
    pub commission_type: CommissionType,
    pub value: Decimal,
}

impl CommissionRule {
    pub fn percentage(value: Decimal) -> Self {
        Self { commission_type: CommissionType::Percentage, value }
    }

    pub fn fixed_amount(value: Decimal) -> Self {
        Self { commission_type: CommissionType::FixedAmount, value }
    }
}

impl Default for CommissionRule {
    fn default() -> Self {
        Self::percentage(Decimal::ZERO)
    }
}

/// Billable procedure, edited by staff and read-only here
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Procedure {
    pub id: Uuid,
    pub name: String,
    pub category_id: Option<Uuid>,
    pub duration_minutes: u32,
    pub estimated_lab_cost: Decimal,
    #[serde(default)]
    pub commission: CommissionRule,
}

/// One ingredient of a procedure's material recipe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeLine {
    pub inventory_item_id: Uuid,
    pub item_name: String,
    pub quantity: Decimal,
    /// Average unit cost carried by the inventory item
    pub average_unit_cost: Decimal,
}

impl RecipeLine {
    pub fn line_cost(&self) -> Decimal {
        self.quantity * self.average_unit_cost
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SalesCommissionType {
    Percentage,
    Fixed,
}

/// Commission paid to the sales representative who closed a budget
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesCommissionRule {
    pub id: Uuid,
    pub user_id: Uuid,
    pub clinic_id: Uuid,
    /// `None` means the clinic-wide default for this user
    pub category_id: Option<Uuid>,
    #[serde(rename = "type")]
    pub commission_type: SalesCommissionType,
    pub value: Decimal,
    #[serde(default)]
    pub minimum_budget_value: Decimal,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

/// Budget status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BudgetStatus {
    Draft,
    Sent,
    Approved,
    Rejected,
}

impl BudgetStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::Sent => "SENT",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "DRAFT" => Some(Self::Draft),
            "SENT" => Some(Self::Sent),
            "APPROVED" => Some(Self::Approved),
            "REJECTED" => Some(Self::Rejected),
            _ => None,
        }
    }
}

impl fmt::Display for BudgetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Billed line of a budget
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetItem {
    pub id: Uuid,
    pub procedure_id: Uuid,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub discount_percent: Decimal,
    /// `unit_price * quantity * (1 - discount_percent / 100)`, rounded to the cent
    pub total: Decimal,
}

/// Clinical budget (treatment quote) for a patient
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Budget {
    pub id: Uuid,
    pub clinic_id: Uuid,
    pub patient_id: Uuid,
    pub professional_id: Uuid,
    pub sales_rep_id: Option<Uuid>,
    pub items: Vec<BudgetItem>,
    /// Flat discount applied on top of the item totals
    pub discount_value: Decimal,
    pub total_value: Decimal,
    pub final_value: Decimal,
    pub status: BudgetStatus,
    pub created_at: DateTime<Utc>,
    pub approved_at: Option<DateTime<Utc>>,
}

/// Payment processor configuration with fee tiers per installment count
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardMachineProfile {
    pub id: Uuid,
    pub clinic_id: Uuid,
    pub name: String,
    pub debit_rate: Decimal,
    /// Credit fee percent keyed by installment count (1..=18 typically)
    #[serde(default)]
    pub credit_rates: BTreeMap<u32, Decimal>,
    #[serde(default)]
    pub is_default: bool,
}

impl CardMachineProfile {
    /// Fee percent charged for a plan split into `installments` card payments.
    ///
    /// A single payment uses the 1x credit tier when the profile defines one,
    /// otherwise the debit rate. Counts beyond the table fall back to the
    /// highest tier below them.
    pub fn rate_for(&self, installments: u32) -> Decimal {
        if let Some(rate) = self.credit_rates.get(&installments) {
            return *rate;
        }
        if installments <= 1 {
            return self.debit_rate;
        }
        self.credit_rates
            .range(..installments)
            .next_back()
            .map(|(_, rate)| *rate)
            .unwrap_or(self.debit_rate)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstallmentStatus {
    Pending,
    Paid,
    Overdue,
    Cancelled,
}

impl InstallmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Overdue => "overdue",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "paid" => Some(Self::Paid),
            "overdue" => Some(Self::Overdue),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

/// One scheduled receivable derived from an approved budget
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Installment {
    pub id: Uuid,
    pub budget_id: Uuid,
    pub clinic_id: Uuid,
    pub patient_id: Uuid,
    /// 0 for the down payment, 1..=n for financed installments
    pub sequence: u32,
    pub is_down_payment: bool,
    pub due_date: NaiveDate,
    pub amount: Decimal,
    pub status: InstallmentStatus,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn profile(rates: &[(u32, Decimal)]) -> CardMachineProfile {
        CardMachineProfile {
            id: Uuid::new_v4(),
            clinic_id: Uuid::new_v4(),
            name: "Stone".to_string(),
            debit_rate: dec!(1.5),
            credit_rates: rates.iter().copied().collect(),
            is_default: true,
        }
    }

    #[test]
    fn test_single_payment_uses_debit_without_1x_tier() {
        let p = profile(&[(2, dec!(4)), (3, dec!(4.5))]);
        assert_eq!(p.rate_for(1), dec!(1.5));
        assert_eq!(p.rate_for(0), dec!(1.5));
    }

    #[test]
    fn test_exact_tier_wins() {
        let p = profile(&[(1, dec!(3)), (2, dec!(4)), (3, dec!(4.5))]);
        assert_eq!(p.rate_for(1), dec!(3));
        assert_eq!(p.rate_for(3), dec!(4.5));
    }

    #[test]
    fn test_missing_tier_falls_back_to_highest_below() {
        let p = profile(&[(2, dec!(4)), (6, dec!(7))]);
        assert_eq!(p.rate_for(5), dec!(4));
        assert_eq!(p.rate_for(12), dec!(7));
    }

    #[test]
    fn test_recipe_line_cost() {
        let line = RecipeLine {
            inventory_item_id: Uuid::new_v4(),
            item_name: "Composite resin".to_string(),
            quantity: dec!(2.5),
            average_unit_cost: dec!(12),
        };
        assert_eq!(line.line_cost(), dec!(30));
    }

    #[test]
    fn test_status_round_trip_strings() {
        for status in [BudgetStatus::Draft, BudgetStatus::Sent, BudgetStatus::Approved, BudgetStatus::Rejected] {
            assert_eq!(BudgetStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(BudgetStatus::parse("ARCHIVED"), None);
    }
}
