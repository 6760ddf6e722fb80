// Currency and percentage helpers
use rust_decimal::{Decimal, RoundingStrategy};

pub const ONE_HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// `amount * rate_percent / 100`
pub fn percent_of(amount: Decimal, rate_percent: Decimal) -> Decimal {
    amount * rate_percent / ONE_HUNDRED
}

/// `part / whole * 100`, zero when `whole` is zero
pub fn ratio_percent(part: Decimal, whole: Decimal) -> Decimal {
    if whole.is_zero() {
        return Decimal::ZERO;
    }
    part / whole * ONE_HUNDRED
}

/// Round to cents, midpoint away from zero
pub fn round_currency(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Drop fractions of a cent
pub fn truncate_cents(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::ToZero)
}

/// Round up to the next whole currency unit
pub fn ceil_currency_unit(value: Decimal) -> Decimal {
    value.ceil()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_percent_of() {
        assert_eq!(percent_of(dec!(500), dec!(5)), dec!(25));
        assert_eq!(percent_of(dec!(800), dec!(4)), dec!(32));
    }

    #[test]
    fn test_ratio_percent_zero_whole() {
        assert_eq!(ratio_percent(dec!(10), Decimal::ZERO), Decimal::ZERO);
        assert_eq!(ratio_percent(dec!(120), dec!(500)), dec!(24));
    }

    #[test]
    fn test_rounding_helpers() {
        assert_eq!(round_currency(dec!(10.005)), dec!(10.01));
        assert_eq!(truncate_cents(dec!(33.3333)), dec!(33.33));
        assert_eq!(ceil_currency_unit(dec!(571.42)), dec!(572));
    }
}
