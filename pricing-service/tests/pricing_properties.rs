//! Property tests for the money laws the engine relies on

use chrono::NaiveDate;
use config_engine::MarginThresholds;
use pricing_service::*;
use proptest::prelude::*;
use rust_decimal::Decimal;
use uuid::Uuid;

fn cents(value: u64) -> Decimal {
    Decimal::from(value) / Decimal::from(100)
}

fn draft_budget(total: Decimal) -> Budget {
    let mut budget = Budget::new(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
    budget.total_value = total;
    budget.final_value = total;
    budget
}

proptest! {
    /// Parts always add back to the split amount
    #[test]
    fn prop_split_sums_to_amount(amount in 0u64..10_000_000u64, count in 1u32..36u32) {
        let amount = cents(amount);
        let parts = split_amount(amount, count).unwrap();

        prop_assert_eq!(parts.len(), count as usize);
        prop_assert_eq!(parts.iter().copied().sum::<Decimal>(), amount);

        let base = parts[0];
        let last = *parts.last().unwrap();
        prop_assert!(parts[..parts.len() - 1].iter().all(|p| *p == base));
        prop_assert!(last >= base);
        prop_assert!(last - base < cents(u64::from(count)));
    }

    /// Down payment plus financed rows equal the plan total, due dates never go backwards
    #[test]
    fn prop_schedule_covers_total(
        total in 1u64..5_000_000u64,
        down_share in 0u64..=100u64,
        count in 1u32..24u32,
    ) {
        let total_value = cents(total);
        let down_payment = (total_value * Decimal::from(down_share) / Decimal::from(100)).round_dp(2);
        let budget = draft_budget(total_value);
        let request = ApprovalRequest {
            total_value,
            installments: count,
            card_profile_id: None,
            down_payment,
            clinic_id: budget.clinic_id,
            first_due_date: NaiveDate::from_ymd_opt(2026, 1, 31).unwrap(),
            patient_id: budget.patient_id,
            actor_id: None,
        };
        let today = NaiveDate::from_ymd_opt(2026, 1, 10).unwrap();

        let schedule = build_schedule(&budget, &request, today).unwrap();

        prop_assert_eq!(schedule.iter().map(|i| i.amount).sum::<Decimal>(), total_value);
        prop_assert!(schedule.iter().all(|i| i.amount >= Decimal::ZERO));
        prop_assert!(schedule.windows(2).all(|w| w[0].due_date <= w[1].due_date));
        prop_assert_eq!(schedule.iter().filter(|i| i.is_down_payment).count(), usize::from(down_payment > Decimal::ZERO));
    }

    /// Net value is what remains after fee and tax; the guard blocks exactly the negative ones
    #[test]
    fn prop_net_identity_and_block_rule(
        total in 0u64..5_000_000u64,
        card_rate in 0u32..90u32,
        tax_rate in 0u32..60u32,
    ) {
        let plan = PaymentPlan {
            total_value: cents(total),
            installments: 1,
            card_profile_id: None,
            down_payment: Decimal::ZERO,
            clinic_id: Uuid::new_v4(),
        };
        let profile = CardMachineProfile {
            id: Uuid::new_v4(),
            clinic_id: plan.clinic_id,
            name: "Default".to_string(),
            debit_rate: Decimal::from(card_rate),
            credit_rates: Default::default(),
            is_default: true,
        };

        let sim = simulate(&plan, Some(&profile), Decimal::from(tax_rate)).unwrap();

        prop_assert_eq!(sim.net_value + sim.card_fee_amount + sim.tax_amount, sim.gross_value);
        let decision = evaluate(&sim, Decimal::from(20));
        prop_assert_eq!(!decision.allows_approval(), sim.net_value < Decimal::ZERO);
    }

    /// Total cost is the sum of its terms and profit closes the gap to the price
    #[test]
    fn prop_waterfall_identity(
        price in 0u64..1_000_000u64,
        minutes in 0u32..240u32,
        quantity in 1u32..5u32,
        commission in 0u32..50u32,
    ) {
        let price = cents(price);
        let reference = ItemReferenceData {
            procedure: Some(Procedure {
                id: Uuid::new_v4(),
                name: "Avaliação".to_string(),
                category_id: None,
                duration_minutes: minutes,
                estimated_lab_cost: Decimal::from(15),
                commission: CommissionRule::percentage(Decimal::from(commission)),
            }),
            recipe: Vec::new(),
            sales_rule: None,
        };
        let rates = CostRates {
            cost_per_minute: Decimal::from(2),
            tax_rate_percent: Decimal::from(5),
            card_fee_rate_percent: Decimal::from(3),
        };

        let costs = compute_item_costs(&reference, price, quantity, &rates);
        prop_assert_eq!(costs.total_cost, costs.sum_of_terms());

        let margin = compute_item_margin(price, costs.clone(), &MarginThresholds::default());
        prop_assert_eq!(margin.profit + costs.total_cost, price);
    }
}
