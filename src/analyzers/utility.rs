use rust_decimal::{Decimal, RoundingStrategy};

/// Rounds to cents, halves away from zero.
pub fn round_cents(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Mean of `count` values summing to `sum`, rounded to cents. Returns zero
/// for an empty set.
pub fn average(sum: Decimal, count: u64) -> Decimal {
    if count == 0 {
        return Decimal::ZERO;
    }
    sum.checked_div(Decimal::from(count))
        .map(round_cents)
        .unwrap_or_default()
}

/// `part` as a percentage of `total`, rounded to two places. Zero when
/// `total` is zero.
pub fn percentage(part: u64, total: u64) -> Decimal {
    if total == 0 {
        return Decimal::ZERO;
    }
    (Decimal::from(part) * Decimal::ONE_HUNDRED)
        .checked_div(Decimal::from(total))
        .map(round_cents)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_average_of_empty_set() {
        assert_eq!(average(dec!(100), 0), Decimal::ZERO);
    }

    #[test]
    fn test_average_rounds_half_away_from_zero() {
        assert_eq!(average(dec!(10), 3), dec!(3.33));
        assert_eq!(average(dec!(0.05), 2), dec!(0.03));
        assert_eq!(average(dec!(1500.50), 2), dec!(750.25));
    }

    #[test]
    fn test_percentage() {
        assert_eq!(percentage(1, 4), dec!(25));
        assert_eq!(percentage(2, 3), dec!(66.67));
        assert_eq!(percentage(5, 0), Decimal::ZERO);
    }
}
