//! Cost-based margin, per item and per budget.
//!
//! This is the informational margin shown while a budget is being quoted. It
//! is independent from the net-receivable margin the approval guard checks.

use crate::cost::{CostCalculator, CostRates, ItemCosts, SalesContext};
use crate::error::PricingResult;
use crate::models::{Budget, CommissionType, Procedure, RecipeLine};
use crate::money::{ceil_currency_unit, ratio_percent, ONE_HUNDRED};
use crate::cost;
use config_engine::{MarginThresholds, PricingConfig};
use futures::future::try_join_all;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

/// Traffic-light classification of a margin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarginStatus {
    Excellent,
    Good,
    Warning,
    Danger,
}

/// Lower-inclusive thresholds: exactly 30 is excellent, exactly 20 good,
/// exactly 15 warning
pub fn classify_margin(margin_percent: Decimal, thresholds: &MarginThresholds) -> MarginStatus {
    if margin_percent >= thresholds.excellent {
        MarginStatus::Excellent
    } else if margin_percent >= thresholds.good {
        MarginStatus::Good
    } else if margin_percent >= thresholds.warning {
        MarginStatus::Warning
    } else {
        MarginStatus::Danger
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemMargin {
    pub price: Decimal,
    pub costs: ItemCosts,
    pub profit: Decimal,
    pub margin_percent: Decimal,
    pub status: MarginStatus,
}

pub fn compute_item_margin(price: Decimal, costs: ItemCosts, thresholds: &MarginThresholds) -> ItemMargin {
    let profit = price - costs.total_cost;
    let margin_percent = ratio_percent(profit, price);
    ItemMargin {
        price,
        costs,
        profit,
        margin_percent,
        status: classify_margin(margin_percent, thresholds),
    }
}

/// Margin of one budget line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetLineMargin {
    pub item_id: Uuid,
    pub procedure_id: Uuid,
    pub margin: ItemMargin,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetMarginAnalysis {
    pub total_price: Decimal,
    pub total_cost: Decimal,
    pub profit: Decimal,
    pub margin_percent: Decimal,
    pub status: MarginStatus,
    pub lines: Vec<BudgetLineMargin>,
    /// Lines under the low-margin alert threshold, a non-blocking caution
    pub low_margin_items: Vec<BudgetLineMargin>,
    /// Lines whose procedure could not be resolved and were priced at zero cost
    pub degraded_items: Vec<Uuid>,
}

/// Aggregate line margins into a budget-level summary
pub fn aggregate_budget_margin(
    lines: Vec<BudgetLineMargin>,
    thresholds: &MarginThresholds,
) -> BudgetMarginAnalysis {
    let total_price: Decimal = lines.iter().map(|line| line.margin.price).sum();
    let total_cost: Decimal = lines.iter().map(|line| line.margin.costs.total_cost).sum();
    let profit = total_price - total_cost;
    let margin_percent = ratio_percent(profit, total_price);

    let low_margin_items = lines
        .iter()
        .filter(|line| line.margin.margin_percent < thresholds.low_margin_alert)
        .cloned()
        .collect();
    let degraded_items = lines
        .iter()
        .filter(|line| line.margin.costs.degraded)
        .map(|line| line.item_id)
        .collect();

    BudgetMarginAnalysis {
        total_price,
        total_cost,
        profit,
        margin_percent,
        status: classify_margin(margin_percent, thresholds),
        lines,
        low_margin_items,
        degraded_items,
    }
}

/// Lowest price reaching `target_margin_percent` on the cost waterfall.
///
/// Percentage commissions join the rate sum in the denominator; a fixed
/// commission joins the fixed costs in the numerator. When the rate sum
/// reaches 100% no price can reach the target and ten times the fixed cost
/// (never less than ten currency units) is returned as an out-of-range marker.
pub fn suggest_minimum_price(
    procedure: &Procedure,
    recipe: &[RecipeLine],
    cost_per_minute: Decimal,
    target_margin_percent: Decimal,
    tax_rate_percent: Decimal,
    card_fee_rate_percent: Decimal,
) -> Decimal {
    let fixed_costs = cost::time_cost(procedure, cost_per_minute)
        + cost::material_cost(recipe)
        + cost::lab_cost(procedure);

    let (numerator, rate_sum) = match procedure.commission.commission_type {
        CommissionType::Percentage => (
            fixed_costs,
            tax_rate_percent + card_fee_rate_percent + procedure.commission.value + target_margin_percent,
        ),
        CommissionType::FixedAmount => (
            fixed_costs + procedure.commission.value,
            tax_rate_percent + card_fee_rate_percent + target_margin_percent,
        ),
    };

    if rate_sum >= ONE_HUNDRED {
        warn!(
            procedure_id = %procedure.id,
            rate_sum = %rate_sum,
            "Target margin unreachable, returning out-of-range price"
        );
        return numerator.max(Decimal::ONE) * Decimal::TEN;
    }

    ceil_currency_unit(numerator / (Decimal::ONE - rate_sum / ONE_HUNDRED))
}

/// Runs the cost waterfall for items and budgets and derives margins
#[derive(Clone)]
pub struct MarginAnalyzer {
    calculator: CostCalculator,
}

impl MarginAnalyzer {
    pub fn new(calculator: CostCalculator) -> Self {
        Self { calculator }
    }

    pub async fn compute_item_margin(
        &self,
        procedure_id: Uuid,
        price: Decimal,
        quantity: u32,
        pricing: &PricingConfig,
        sales: &SalesContext,
    ) -> PricingResult<ItemMargin> {
        let costs = self
            .calculator
            .compute_item_costs(procedure_id, price, quantity, &CostRates::from(pricing), sales)
            .await?;
        Ok(compute_item_margin(price, costs, &pricing.thresholds))
    }

    /// Lines are priced concurrently; each one is independent
    pub async fn compute_budget_margin(
        &self,
        budget: &Budget,
        pricing: &PricingConfig,
    ) -> PricingResult<BudgetMarginAnalysis> {
        let sales = SalesContext {
            sales_rep_id: budget.sales_rep_id,
            clinic_id: Some(budget.clinic_id),
            category_id: None,
        };

        let lines = try_join_all(budget.items.iter().map(|item| {
            let sales = sales;
            async move {
                let margin = self
                    .compute_item_margin(item.procedure_id, item.total, item.quantity, pricing, &sales)
                    .await?;
                Ok::<_, crate::error::PricingError>(BudgetLineMargin {
                    item_id: item.id,
                    procedure_id: item.procedure_id,
                    margin,
                })
            }
        }))
        .await?;

        let analysis = aggregate_budget_margin(lines, &pricing.thresholds);
        if !analysis.low_margin_items.is_empty() {
            warn!(
                budget_id = %budget.id,
                low_margin_items = analysis.low_margin_items.len(),
                "Budget has items under the low-margin threshold"
            );
        }
        debug!(
            budget_id = %budget.id,
            margin_percent = %analysis.margin_percent,
            "Computed budget margin"
        );
        Ok(analysis)
    }
}
