//! Per-item cost waterfall.
//!
//! Each term is its own function so it can be checked in isolation; the
//! [`compute_item_costs`] function only adds them up. Everything here is pure
//! over the reference data handed in. [`CostCalculator`] is the thin async
//! layer that fetches that data from a [`ReferenceDataRepository`].

use crate::error::PricingResult;
use crate::models::{
    CommissionRule, CommissionType, Procedure, RecipeLine, SalesCommissionRule,
    SalesCommissionType,
};
use crate::money::percent_of;
use crate::repository::ReferenceDataRepository;
use config_engine::PricingConfig;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

/// Itemized cost breakdown for one billed line
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemCosts {
    pub time_cost: Decimal,
    pub material_cost: Decimal,
    pub lab_cost: Decimal,
    pub tax_cost: Decimal,
    pub card_fee: Decimal,
    pub professional_cost: Decimal,
    pub sales_commission_cost: Decimal,
    pub total_cost: Decimal,
    /// Set when the procedure could not be resolved and every term is zero
    pub degraded: bool,
}

impl ItemCosts {
    /// All-zero record returned when the procedure reference is broken
    pub fn degraded() -> Self {
        Self { degraded: true, ..Self::default() }
    }

    pub fn sum_of_terms(&self) -> Decimal {
        self.time_cost
            + self.material_cost
            + self.lab_cost
            + self.tax_cost
            + self.card_fee
            + self.professional_cost
            + self.sales_commission_cost
    }
}

/// Rates feeding the waterfall
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostRates {
    pub cost_per_minute: Decimal,
    pub tax_rate_percent: Decimal,
    pub card_fee_rate_percent: Decimal,
}

impl From<&PricingConfig> for CostRates {
    fn from(config: &PricingConfig) -> Self {
        Self {
            cost_per_minute: config.cost_per_minute,
            tax_rate_percent: config.item_tax_rate_percent,
            card_fee_rate_percent: config.card_fee_rate_percent,
        }
    }
}

/// Who sold the budget, used to resolve the sales commission
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SalesContext {
    pub sales_rep_id: Option<Uuid>,
    pub clinic_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
}

/// Reference data resolved for one line
#[derive(Debug, Clone, Default)]
pub struct ItemReferenceData {
    pub procedure: Option<Procedure>,
    pub recipe: Vec<RecipeLine>,
    pub sales_rule: Option<SalesCommissionRule>,
}

pub fn time_cost(procedure: &Procedure, cost_per_minute: Decimal) -> Decimal {
    Decimal::from(procedure.duration_minutes) * cost_per_minute
}

/// Zero for an empty recipe
pub fn material_cost(recipe: &[RecipeLine]) -> Decimal {
    recipe.iter().map(RecipeLine::line_cost).sum()
}

pub fn lab_cost(procedure: &Procedure) -> Decimal {
    procedure.estimated_lab_cost
}

pub fn tax_cost(price: Decimal, tax_rate_percent: Decimal) -> Decimal {
    percent_of(price, tax_rate_percent)
}

pub fn card_fee(price: Decimal, card_fee_rate_percent: Decimal) -> Decimal {
    percent_of(price, card_fee_rate_percent)
}

/// Professional commission for one unit, always on the gross line price
pub fn professional_cost(commission: &CommissionRule, price: Decimal) -> Decimal {
    match commission.commission_type {
        CommissionType::FixedAmount => commission.value,
        CommissionType::Percentage => percent_of(price, commission.value),
    }
}

/// Pick the rule that applies to a sale: a category-specific rule beats the
/// representative's clinic-wide default. Inactive rules never apply.
pub fn resolve_sales_rule<'a>(
    rules: &'a [SalesCommissionRule],
    context: &SalesContext,
) -> Option<&'a SalesCommissionRule> {
    let user_id = context.sales_rep_id?;
    let clinic_id = context.clinic_id?;

    let applicable = || {
        rules
            .iter()
            .filter(move |rule| rule.is_active && rule.user_id == user_id && rule.clinic_id == clinic_id)
    };

    context
        .category_id
        .and_then(|category| applicable().find(|rule| rule.category_id == Some(category)))
        .or_else(|| applicable().find(|rule| rule.category_id.is_none()))
}

/// Zero when no rule resolved or the price is under the rule's minimum
pub fn sales_commission_cost(rule: Option<&SalesCommissionRule>, price: Decimal) -> Decimal {
    let Some(rule) = rule else {
        return Decimal::ZERO;
    };
    if price < rule.minimum_budget_value {
        debug!(
            rule_id = %rule.id,
            price = %price,
            minimum = %rule.minimum_budget_value,
            "Sales commission rule below minimum budget value, ignored"
        );
        return Decimal::ZERO;
    }
    match rule.commission_type {
        SalesCommissionType::Fixed => rule.value,
        SalesCommissionType::Percentage => percent_of(price, rule.value),
    }
}

/// Full waterfall for a line of `quantity` units billed at `price` in total.
///
/// Duration, materials, lab and a fixed professional fee are incurred per
/// unit; percentage terms and the sales commission apply to the line price.
/// Without a procedure the result is [`ItemCosts::degraded`].
pub fn compute_item_costs(
    reference: &ItemReferenceData,
    price: Decimal,
    quantity: u32,
    rates: &CostRates,
) -> ItemCosts {
    let Some(procedure) = reference.procedure.as_ref() else {
        return ItemCosts::degraded();
    };

    let units = Decimal::from(quantity.max(1));
    let professional_cost = match procedure.commission.commission_type {
        CommissionType::FixedAmount => professional_cost(&procedure.commission, price) * units,
        CommissionType::Percentage => professional_cost(&procedure.commission, price),
    };

    let mut costs = ItemCosts {
        time_cost: time_cost(procedure, rates.cost_per_minute) * units,
        material_cost: material_cost(&reference.recipe) * units,
        lab_cost: lab_cost(procedure) * units,
        tax_cost: tax_cost(price, rates.tax_rate_percent),
        card_fee: card_fee(price, rates.card_fee_rate_percent),
        professional_cost,
        sales_commission_cost: sales_commission_cost(reference.sales_rule.as_ref(), price),
        total_cost: Decimal::ZERO,
        degraded: false,
    };
    costs.total_cost = costs.sum_of_terms();

    debug!(
        procedure_id = %procedure.id,
        price = %price,
        total_cost = %costs.total_cost,
        "Computed item costs"
    );
    costs
}

/// Fetches reference data and runs the waterfall
#[derive(Clone)]
pub struct CostCalculator {
    repository: Arc<dyn ReferenceDataRepository>,
}

impl CostCalculator {
    pub fn new(repository: Arc<dyn ReferenceDataRepository>) -> Self {
        Self { repository }
    }

    pub async fn load_reference_data(
        &self,
        procedure_id: Uuid,
        sales: &SalesContext,
    ) -> PricingResult<ItemReferenceData> {
        let Some(procedure) = self.repository.find_procedure(procedure_id).await? else {
            return Ok(ItemReferenceData::default());
        };

        let recipe = self.repository.material_recipe(procedure_id).await?;

        let context = SalesContext {
            category_id: sales.category_id.or(procedure.category_id),
            ..*sales
        };
        let sales_rule = match (context.sales_rep_id, context.clinic_id) {
            (Some(user_id), Some(clinic_id)) => {
                let rules = self.repository.sales_commission_rules(user_id, clinic_id).await?;
                resolve_sales_rule(&rules, &context).cloned()
            }
            _ => None,
        };

        Ok(ItemReferenceData { procedure: Some(procedure), recipe, sales_rule })
    }

    pub async fn compute_item_costs(
        &self,
        procedure_id: Uuid,
        price: Decimal,
        quantity: u32,
        rates: &CostRates,
        sales: &SalesContext,
    ) -> PricingResult<ItemCosts> {
        let reference = self.load_reference_data(procedure_id, sales).await?;
        if reference.procedure.is_none() {
            warn!(procedure_id = %procedure_id, "Procedure not found, returning zero costs");
        }
        Ok(compute_item_costs(&reference, price, quantity, rates))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::InMemoryPricingRepository;
    use rust_decimal_macros::dec;

    fn procedure(commission: CommissionRule) -> Procedure {
        Procedure {
            id: Uuid::new_v4(),
            name: "Root canal".to_string(),
            category_id: None,
            duration_minutes: 60,
            estimated_lab_cost: dec!(20),
            commission,
        }
    }

    fn recipe_worth_50() -> Vec<RecipeLine> {
        vec![
            RecipeLine {
                inventory_item_id: Uuid::new_v4(),
                item_name: "Gutta-percha".to_string(),
                quantity: dec!(2),
                average_unit_cost: dec!(15),
            },
            RecipeLine {
                inventory_item_id: Uuid::new_v4(),
                item_name: "Sealer".to_string(),
                quantity: dec!(1),
                average_unit_cost: dec!(20),
            },
        ]
    }

    fn rates() -> CostRates {
        CostRates {
            cost_per_minute: dec!(2),
            tax_rate_percent: dec!(5),
            card_fee_rate_percent: dec!(3),
        }
    }

    fn rule(user: Uuid, clinic: Uuid, category: Option<Uuid>, kind: SalesCommissionType, value: Decimal) -> SalesCommissionRule {
        SalesCommissionRule {
            id: Uuid::new_v4(),
            user_id: user,
            clinic_id: clinic,
            category_id: category,
            commission_type: kind,
            value,
            minimum_budget_value: Decimal::ZERO,
            is_active: true,
        }
    }

    #[test]
    fn test_reference_waterfall() {
        let reference = ItemReferenceData {
            procedure: Some(procedure(CommissionRule::percentage(dec!(30)))),
            recipe: recipe_worth_50(),
            sales_rule: None,
        };

        let costs = compute_item_costs(&reference, dec!(500), 1, &rates());
        assert_eq!(costs.time_cost, dec!(120));
        assert_eq!(costs.material_cost, dec!(50));
        assert_eq!(costs.lab_cost, dec!(20));
        assert_eq!(costs.tax_cost, dec!(25));
        assert_eq!(costs.card_fee, dec!(15));
        assert_eq!(costs.professional_cost, dec!(150));
        assert_eq!(costs.sales_commission_cost, Decimal::ZERO);
        assert_eq!(costs.total_cost, dec!(380));
        assert!(!costs.degraded);
    }

    #[test]
    fn test_missing_procedure_degrades_to_zero() {
        let costs = compute_item_costs(&ItemReferenceData::default(), dec!(500), 1, &rates());
        assert_eq!(costs.total_cost, Decimal::ZERO);
        assert!(costs.degraded);
    }

    #[test]
    fn test_fixed_professional_commission_scales_with_units() {
        let reference = ItemReferenceData {
            procedure: Some(procedure(CommissionRule::fixed_amount(dec!(80)))),
            recipe: Vec::new(),
            sales_rule: None,
        };
        let costs = compute_item_costs(&reference, dec!(1000), 2, &rates());
        assert_eq!(costs.professional_cost, dec!(160));
        assert_eq!(costs.time_cost, dec!(240));
        assert_eq!(costs.lab_cost, dec!(40));
        assert_eq!(costs.tax_cost, dec!(50));
    }

    #[test]
    fn test_category_rule_beats_clinic_default() {
        let user = Uuid::new_v4();
        let clinic = Uuid::new_v4();
        let category = Uuid::new_v4();
        let rules = vec![
            rule(user, clinic, None, SalesCommissionType::Percentage, dec!(2)),
            rule(user, clinic, Some(category), SalesCommissionType::Percentage, dec!(5)),
        ];

        let context = SalesContext { sales_rep_id: Some(user), clinic_id: Some(clinic), category_id: Some(category) };
        assert_eq!(resolve_sales_rule(&rules, &context).map(|r| r.value), Some(dec!(5)));

        let other_category = SalesContext { category_id: Some(Uuid::new_v4()), ..context };
        assert_eq!(resolve_sales_rule(&rules, &other_category).map(|r| r.value), Some(dec!(2)));

        let no_rep = SalesContext { sales_rep_id: None, ..context };
        assert!(resolve_sales_rule(&rules, &no_rep).is_none());
    }

    #[test]
    fn test_inactive_rules_are_skipped() {
        let user = Uuid::new_v4();
        let clinic = Uuid::new_v4();
        let mut inactive = rule(user, clinic, None, SalesCommissionType::Fixed, dec!(50));
        inactive.is_active = false;
        let context = SalesContext { sales_rep_id: Some(user), clinic_id: Some(clinic), category_id: None };
        assert!(resolve_sales_rule(&[inactive], &context).is_none());
    }

    #[test]
    fn test_sales_commission_minimum_budget_value() {
        let mut r = rule(Uuid::new_v4(), Uuid::new_v4(), None, SalesCommissionType::Percentage, dec!(10));
        r.minimum_budget_value = dec!(500);

        assert_eq!(sales_commission_cost(Some(&r), dec!(499.99)), Decimal::ZERO);
        assert_eq!(sales_commission_cost(Some(&r), dec!(500)), dec!(50));

        r.commission_type = SalesCommissionType::Fixed;
        r.value = dec!(35);
        assert_eq!(sales_commission_cost(Some(&r), dec!(800)), dec!(35));
        assert_eq!(sales_commission_cost(None, dec!(800)), Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_calculator_resolves_reference_data() {
        let repo = InMemoryPricingRepository::shared();
        let category = Uuid::new_v4();
        let mut proc = procedure(CommissionRule::percentage(dec!(30)));
        proc.category_id = Some(category);
        repo.insert_procedure(proc.clone());
        repo.insert_recipe(proc.id, recipe_worth_50());

        let user = Uuid::new_v4();
        let clinic = Uuid::new_v4();
        repo.insert_sales_rule(rule(user, clinic, Some(category), SalesCommissionType::Percentage, dec!(4)));

        let calculator = CostCalculator::new(repo);
        let sales = SalesContext { sales_rep_id: Some(user), clinic_id: Some(clinic), category_id: None };
        let costs = calculator
            .compute_item_costs(proc.id, dec!(500), 1, &rates(), &sales)
            .await
            .unwrap();

        assert_eq!(costs.sales_commission_cost, dec!(20));
        assert_eq!(costs.total_cost, dec!(400));
    }

    #[tokio::test]
    async fn test_calculator_degrades_on_unknown_procedure() {
        let calculator = CostCalculator::new(InMemoryPricingRepository::shared());
        let costs = calculator
            .compute_item_costs(Uuid::new_v4(), dec!(500), 1, &rates(), &SalesContext::default())
            .await
            .unwrap();
        assert!(costs.degraded);
        assert_eq!(costs.total_cost, Decimal::ZERO);
    }
}
