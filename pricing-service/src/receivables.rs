//! Net receivable simulation for a proposed payment plan.
//!
//! The down payment is collected in cash and carries no card fee; only the
//! financed remainder pays the card rate for the chosen installment count.
//! Tax is levied on the whole value at the clinic-level rate. Results are
//! recomputed from scratch on every call.

use crate::error::{PricingError, PricingResult};
use crate::models::CardMachineProfile;
use crate::money::{percent_of, ratio_percent, round_currency};
use crate::repository::ReferenceDataRepository;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// Terms proposed for an approval
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentPlan {
    pub total_value: Decimal,
    pub installments: u32,
    pub card_profile_id: Option<Uuid>,
    pub down_payment: Decimal,
    pub clinic_id: Uuid,
}

/// Longest card plan accepted; card machines stop quoting well before this
pub const MAX_INSTALLMENTS: u32 = 36;

impl PaymentPlan {
    pub fn validate(&self) -> PricingResult<()> {
        if self.total_value < Decimal::ZERO {
            return Err(PricingError::Validation("total value cannot be negative".to_string()));
        }
        if self.installments == 0 {
            return Err(PricingError::Validation("a payment plan needs at least one installment".to_string()));
        }
        if self.installments > MAX_INSTALLMENTS {
            return Err(PricingError::Validation(format!(
                "{} installments exceeds the maximum of {}",
                self.installments, MAX_INSTALLMENTS
            )));
        }
        if self.down_payment < Decimal::ZERO || self.down_payment > self.total_value {
            return Err(PricingError::Validation(format!(
                "down payment {} must be between 0 and the total value {}",
                self.down_payment, self.total_value
            )));
        }
        Ok(())
    }

    /// Portion paid by card
    pub fn financed_value(&self) -> Decimal {
        self.total_value - self.down_payment
    }
}

/// Rates used for a simulation, kept so the UI can show what was applied
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateSnapshot {
    pub card_profile_id: Option<Uuid>,
    pub card_profile_name: Option<String>,
    pub installments: u32,
    pub card_rate_percent: Decimal,
    pub clinic_tax_rate_percent: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovalSimulationResult {
    pub gross_value: Decimal,
    pub card_fee_amount: Decimal,
    pub tax_amount: Decimal,
    pub net_value: Decimal,
    /// `net_value / gross_value * 100`, zero for a zero gross value
    pub net_margin_percent: Decimal,
    pub rates: RateSnapshot,
}

/// Pure simulation over an already resolved profile.
///
/// `None` for the profile means a cash plan with no card fee.
pub fn simulate(
    plan: &PaymentPlan,
    profile: Option<&CardMachineProfile>,
    clinic_tax_rate_percent: Decimal,
) -> PricingResult<ApprovalSimulationResult> {
    plan.validate()?;

    let card_rate_percent = profile
        .map(|p| p.rate_for(plan.installments))
        .unwrap_or(Decimal::ZERO);

    let gross_value = plan.total_value;
    let card_fee_amount = round_currency(percent_of(plan.financed_value(), card_rate_percent));
    let tax_amount = round_currency(percent_of(plan.total_value, clinic_tax_rate_percent));
    let net_value = gross_value - card_fee_amount - tax_amount;

    Ok(ApprovalSimulationResult {
        gross_value,
        card_fee_amount,
        tax_amount,
        net_value,
        net_margin_percent: ratio_percent(net_value, gross_value),
        rates: RateSnapshot {
            card_profile_id: profile.map(|p| p.id),
            card_profile_name: profile.map(|p| p.name.clone()),
            installments: plan.installments,
            card_rate_percent,
            clinic_tax_rate_percent,
        },
    })
}

/// Resolves the card profile and runs [`simulate`]
#[derive(Clone)]
pub struct ReceivablesSimulator {
    repository: Arc<dyn ReferenceDataRepository>,
}

impl ReceivablesSimulator {
    pub fn new(repository: Arc<dyn ReferenceDataRepository>) -> Self {
        Self { repository }
    }

    /// Explicit profile id, else the clinic default, else no card fee.
    /// An explicit id that does not resolve is an error.
    pub async fn resolve_profile(&self, plan: &PaymentPlan) -> PricingResult<Option<CardMachineProfile>> {
        match plan.card_profile_id {
            Some(profile_id) => self
                .repository
                .find_card_profile(profile_id)
                .await?
                .map(Some)
                .ok_or(PricingError::CardProfileNotFound(profile_id)),
            None => {
                let profile = self.repository.default_card_profile(plan.clinic_id).await?;
                if profile.is_none() {
                    debug!(clinic_id = %plan.clinic_id, "No default card profile, simulating without card fee");
                }
                Ok(profile)
            }
        }
    }

    pub async fn simulate_approval(
        &self,
        plan: &PaymentPlan,
        clinic_tax_rate_percent: Decimal,
    ) -> PricingResult<ApprovalSimulationResult> {
        plan.validate()?;
        let profile = self.resolve_profile(plan).await?;
        let result = simulate(plan, profile.as_ref(), clinic_tax_rate_percent)?;

        debug!(
            clinic_id = %plan.clinic_id,
            gross_value = %result.gross_value,
            card_fee = %result.card_fee_amount,
            tax = %result.tax_amount,
            net_value = %result.net_value,
            "Simulated approval"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::InMemoryPricingRepository;
    use rust_decimal_macros::dec;
    use std::collections::BTreeMap;

    fn profile(clinic_id: Uuid, rates: &[(u32, Decimal)], is_default: bool) -> CardMachineProfile {
        CardMachineProfile {
            id: Uuid::new_v4(),
            clinic_id,
            name: "Cielo".to_string(),
            debit_rate: dec!(1.5),
            credit_rates: rates.iter().copied().collect::<BTreeMap<_, _>>(),
            is_default,
        }
    }

    fn plan(total: Decimal, down: Decimal, installments: u32, profile_id: Option<Uuid>, clinic_id: Uuid) -> PaymentPlan {
        PaymentPlan {
            total_value: total,
            installments,
            card_profile_id: profile_id,
            down_payment: down,
            clinic_id,
        }
    }

    #[test]
    fn test_down_payment_is_fee_free() {
        let clinic = Uuid::new_v4();
        let p = profile(clinic, &[(3, dec!(4))], true);
        let result = simulate(&plan(dec!(1000), dec!(200), 3, Some(p.id), clinic), Some(&p), dec!(2)).unwrap();

        assert_eq!(result.gross_value, dec!(1000));
        assert_eq!(result.card_fee_amount, dec!(32));
        assert_eq!(result.tax_amount, dec!(20));
        assert_eq!(result.net_value, dec!(948));
        assert_eq!(result.net_margin_percent, dec!(94.8));
        assert_eq!(result.rates.card_rate_percent, dec!(4));
    }

    #[test]
    fn test_fees_can_exceed_value() {
        let clinic = Uuid::new_v4();
        let p = profile(clinic, &[(1, dec!(70))], true);
        let result = simulate(&plan(dec!(100), dec!(0), 1, Some(p.id), clinic), Some(&p), dec!(40)).unwrap();
        assert_eq!(result.net_value, dec!(-10));
    }

    #[test]
    fn test_cash_plan_without_profile() {
        let result = simulate(&plan(dec!(500), dec!(500), 1, None, Uuid::new_v4()), None, dec!(6)).unwrap();
        assert_eq!(result.card_fee_amount, Decimal::ZERO);
        assert_eq!(result.tax_amount, dec!(30));
        assert_eq!(result.net_value, dec!(470));
    }

    #[test]
    fn test_plan_validation() {
        let clinic = Uuid::new_v4();
        assert!(plan(dec!(100), dec!(0), 0, None, clinic).validate().is_err());
        assert!(plan(dec!(100), dec!(101), 1, None, clinic).validate().is_err());
        assert!(plan(dec!(100), dec!(-1), 1, None, clinic).validate().is_err());
        assert!(plan(dec!(100), dec!(100), 1, None, clinic).validate().is_ok());
    }

    #[test]
    fn test_plan_installments_are_capped() {
        let clinic = Uuid::new_v4();
        assert!(plan(dec!(100), dec!(0), MAX_INSTALLMENTS, None, clinic).validate().is_ok());
        let err = plan(dec!(100), dec!(0), MAX_INSTALLMENTS + 1, None, clinic).validate().unwrap_err();
        assert!(matches!(err, PricingError::Validation(_)));
        assert!(plan(dec!(100), dec!(0), 2_000_000_000, None, clinic).validate().is_err());
    }

    #[tokio::test]
    async fn test_simulator_uses_clinic_default_profile() {
        let repo = InMemoryPricingRepository::shared();
        let clinic = Uuid::new_v4();
        repo.insert_card_profile(profile(clinic, &[(2, dec!(5))], true));
        let simulator = ReceivablesSimulator::new(repo);

        let result = simulator
            .simulate_approval(&plan(dec!(1000), dec!(0), 2, None, clinic), dec!(0))
            .await
            .unwrap();
        assert_eq!(result.card_fee_amount, dec!(50));
        assert!(result.rates.card_profile_id.is_some());
    }

    #[tokio::test]
    async fn test_simulator_rejects_unknown_profile() {
        let simulator = ReceivablesSimulator::new(InMemoryPricingRepository::shared());
        let missing = Uuid::new_v4();
        let result = simulator
            .simulate_approval(&plan(dec!(1000), dec!(0), 2, Some(missing), Uuid::new_v4()), dec!(0))
            .await;
        assert!(matches!(result, Err(PricingError::CardProfileNotFound(id)) if id == missing));
    }

    #[tokio::test]
    async fn test_each_parameter_change_recomputes() {
        let repo = InMemoryPricingRepository::shared();
        let clinic = Uuid::new_v4();
        let p = profile(clinic, &[(2, dec!(4)), (6, dec!(8))], true);
        let profile_id = p.id;
        repo.insert_card_profile(p);
        let simulator = ReceivablesSimulator::new(repo);

        let two = simulator
            .simulate_approval(&plan(dec!(1000), dec!(0), 2, Some(profile_id), clinic), dec!(0))
            .await
            .unwrap();
        let six = simulator
            .simulate_approval(&plan(dec!(1000), dec!(0), 6, Some(profile_id), clinic), dec!(0))
            .await
            .unwrap();
        let six_with_down = simulator
            .simulate_approval(&plan(dec!(1000), dec!(500), 6, Some(profile_id), clinic), dec!(0))
            .await
            .unwrap();

        assert_eq!(two.card_fee_amount, dec!(40));
        assert_eq!(six.card_fee_amount, dec!(80));
        assert_eq!(six_with_down.card_fee_amount, dec!(40));
    }
}
