// Budget lifecycle: item totals, budget totals and manual status transitions.
// Approval is deliberately absent here; it only happens through the
// approval service once the guard has passed.
use crate::error::{PricingError, PricingResult};
use crate::models::{Budget, BudgetItem, BudgetStatus};
use crate::money::{round_currency, ONE_HUNDRED};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

impl BudgetItem {
    pub fn new(
        procedure_id: Uuid,
        quantity: u32,
        unit_price: Decimal,
        discount_percent: Decimal,
    ) -> PricingResult<Self> {
        validate_item(quantity, unit_price, discount_percent)?;
        Ok(Self {
            id: Uuid::new_v4(),
            procedure_id,
            quantity,
            unit_price,
            discount_percent,
            total: Self::compute_total(unit_price, quantity, discount_percent),
        })
    }

    /// `unit_price * quantity * (1 - discount_percent / 100)`
    /// Discounted line total, rounded to the cent
    pub fn compute_total(unit_price: Decimal, quantity: u32, discount_percent: Decimal) -> Decimal {
        round_currency(unit_price * Decimal::from(quantity) * (Decimal::ONE - discount_percent / ONE_HUNDRED))
    }

    pub fn recalculate(&mut self) {
        self.total = Self::compute_total(self.unit_price, self.quantity, self.discount_percent);
    }
}

fn validate_item(quantity: u32, unit_price: Decimal, discount_percent: Decimal) -> PricingResult<()> {
    if quantity == 0 {
        return Err(PricingError::Validation("item quantity must be at least 1".to_string()));
    }
    if unit_price < Decimal::ZERO {
        return Err(PricingError::Validation("unit price cannot be negative".to_string()));
    }
    if discount_percent < Decimal::ZERO || discount_percent > ONE_HUNDRED {
        return Err(PricingError::Validation(format!(
            "discount percent must be between 0 and 100, got {}",
            discount_percent
        )));
    }
    Ok(())
}

impl Budget {
    pub fn new(clinic_id: Uuid, patient_id: Uuid, professional_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            clinic_id,
            patient_id,
            professional_id,
            sales_rep_id: None,
            items: Vec::new(),
            discount_value: Decimal::ZERO,
            total_value: Decimal::ZERO,
            final_value: Decimal::ZERO,
            status: BudgetStatus::Draft,
            created_at: Utc::now(),
            approved_at: None,
        }
    }

    pub fn with_sales_rep(mut self, sales_rep_id: Uuid) -> Self {
        self.sales_rep_id = Some(sales_rep_id);
        self
    }

    pub fn add_item(&mut self, item: BudgetItem) -> PricingResult<()> {
        self.ensure_editable()?;
        validate_item(item.quantity, item.unit_price, item.discount_percent)?;
        let mut item = item;
        item.recalculate();
        self.items.push(item);
        self.recalculate_totals();
        Ok(())
    }

    pub fn remove_item(&mut self, item_id: Uuid) -> PricingResult<()> {
        self.ensure_editable()?;
        let before = self.items.len();
        self.items.retain(|item| item.id != item_id);
        if self.items.len() == before {
            return Err(PricingError::Validation(format!("item {} is not part of this budget", item_id)));
        }
        self.recalculate_totals();
        Ok(())
    }

    pub fn set_discount(&mut self, discount_value: Decimal) -> PricingResult<()> {
        self.ensure_editable()?;
        if discount_value < Decimal::ZERO {
            return Err(PricingError::Validation("budget discount cannot be negative".to_string()));
        }
        self.discount_value = discount_value;
        self.recalculate_totals();
        Ok(())
    }

    /// Total is the sum of item totals; final value never drops below zero
    pub fn recalculate_totals(&mut self) {
        self.total_value = round_currency(self.items.iter().map(|item| item.total).sum());
        self.final_value = round_currency((self.total_value - self.discount_value).max(Decimal::ZERO));
    }

    /// DRAFT -> SENT
    pub fn send(&mut self) -> PricingResult<()> {
        match self.status {
            BudgetStatus::Draft => {
                self.status = BudgetStatus::Sent;
                Ok(())
            }
            from => Err(PricingError::InvalidTransition { from, to: BudgetStatus::Sent }),
        }
    }

    /// DRAFT/SENT -> REJECTED.
    ///
    /// An approved budget already owns installments, so rejecting it here
    /// would leave receivables attached to a non-approved budget.
    pub fn reject(&mut self) -> PricingResult<()> {
        match self.status {
            BudgetStatus::Draft | BudgetStatus::Sent => {
                self.status = BudgetStatus::Rejected;
                Ok(())
            }
            from => Err(PricingError::InvalidTransition { from, to: BudgetStatus::Rejected }),
        }
    }

    pub fn is_approvable(&self) -> bool {
        matches!(self.status, BudgetStatus::Draft | BudgetStatus::Sent)
    }

    pub fn ensure_approvable(&self) -> PricingResult<()> {
        if self.is_approvable() {
            Ok(())
        } else {
            Err(PricingError::InvalidTransition { from: self.status, to: BudgetStatus::Approved })
        }
    }

    /// Used by repositories when committing an approval
    pub fn mark_approved(&mut self, approved_at: DateTime<Utc>) -> PricingResult<()> {
        self.ensure_approvable()?;
        self.status = BudgetStatus::Approved;
        self.approved_at = Some(approved_at);
        Ok(())
    }

    fn ensure_editable(&self) -> PricingResult<()> {
        if self.status == BudgetStatus::Draft {
            Ok(())
        } else {
            Err(PricingError::Validation(format!(
                "budget items are frozen once the budget is {}",
                self.status
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn draft() -> Budget {
        Budget::new(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4())
    }

    #[test]
    fn test_item_total_applies_discount() {
        let item = BudgetItem::new(Uuid::new_v4(), 3, dec!(200), dec!(10)).unwrap();
        assert_eq!(item.total, dec!(540));
    }

    #[test]
    fn test_fractional_discount_rounds_to_cents() {
        // 33.33 * 0.875 = 29.16375
        let item = BudgetItem::new(Uuid::new_v4(), 1, dec!(33.33), dec!(12.5)).unwrap();
        assert_eq!(item.total, dec!(29.16));
        assert_eq!(item.total.scale(), 2);

        let mut budget = draft();
        budget.add_item(item).unwrap();
        budget
            .add_item(BudgetItem::new(Uuid::new_v4(), 3, dec!(10.01), dec!(33.333)).unwrap())
            .unwrap();
        // 30.03 * 0.66667 = 20.0201001 -> 20.02
        assert_eq!(budget.items[1].total, dec!(20.02));
        assert_eq!(budget.total_value, dec!(49.18));
        assert_eq!(budget.final_value, budget.items.iter().map(|i| i.total).sum::<Decimal>());
        assert!(budget.final_value.scale() <= 2);
    }

    #[test]
    fn test_item_validation() {
        assert!(BudgetItem::new(Uuid::new_v4(), 0, dec!(200), dec!(0)).is_err());
        assert!(BudgetItem::new(Uuid::new_v4(), 1, dec!(-1), dec!(0)).is_err());
        assert!(BudgetItem::new(Uuid::new_v4(), 1, dec!(100), dec!(101)).is_err());
    }

    #[test]
    fn test_totals_follow_items_and_discount() {
        let mut budget = draft();
        budget.add_item(BudgetItem::new(Uuid::new_v4(), 1, dec!(500), dec!(0)).unwrap()).unwrap();
        budget.add_item(BudgetItem::new(Uuid::new_v4(), 2, dec!(250), dec!(20)).unwrap()).unwrap();
        assert_eq!(budget.total_value, dec!(900));

        budget.set_discount(dec!(100)).unwrap();
        assert_eq!(budget.final_value, dec!(800));

        budget.set_discount(dec!(5000)).unwrap();
        assert_eq!(budget.final_value, Decimal::ZERO);
    }

    #[test]
    fn test_items_frozen_after_send() {
        let mut budget = draft();
        let item = BudgetItem::new(Uuid::new_v4(), 1, dec!(100), dec!(0)).unwrap();
        let item_id = item.id;
        budget.add_item(item).unwrap();
        budget.send().unwrap();

        assert!(budget.add_item(BudgetItem::new(Uuid::new_v4(), 1, dec!(1), dec!(0)).unwrap()).is_err());
        assert!(budget.remove_item(item_id).is_err());
        assert!(budget.set_discount(dec!(1)).is_err());
    }

    #[test]
    fn test_transitions() {
        let mut budget = draft();
        budget.send().unwrap();
        assert!(matches!(
            budget.send(),
            Err(PricingError::InvalidTransition { from: BudgetStatus::Sent, to: BudgetStatus::Sent })
        ));
        assert!(budget.is_approvable());

        budget.reject().unwrap();
        assert_eq!(budget.status, BudgetStatus::Rejected);
        assert!(!budget.is_approvable());
        assert!(budget.ensure_approvable().is_err());
    }

    #[test]
    fn test_approved_budget_cannot_be_rejected() {
        let mut budget = draft();
        budget.mark_approved(Utc::now()).unwrap();
        assert!(budget.reject().is_err());
        assert!(budget.mark_approved(Utc::now()).is_err());
    }
}
