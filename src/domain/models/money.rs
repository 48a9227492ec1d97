//! Monetary amount helpers.
//!
//! Amounts are `rust_decimal::Decimal` in the domain and integer cents in the
//! store. Keeping the stored side integral makes every balance delta an exact
//! relative update in SQL; rounding to 2 fractional digits happens only here,
//! at the storage boundary.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

/// Round an amount to the 2 fractional digits kept in the store.
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Convert a decimal amount to integer cents.
///
/// Returns `None` when the rounded value does not fit an `i64`.
pub fn to_cents(amount: Decimal) -> Option<i64> {
    (round_money(amount) * Decimal::ONE_HUNDRED).to_i64()
}

/// Convert integer cents back to a 2-dp decimal amount.
pub fn from_cents(cents: i64) -> Decimal {
    Decimal::new(cents, 2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_round_money_two_places() {
        let d = Decimal::from_str("333.333333").unwrap();
        assert_eq!(round_money(d), Decimal::from_str("333.33").unwrap());

        let d = Decimal::from_str("0.005").unwrap();
        assert_eq!(round_money(d), Decimal::from_str("0.01").unwrap());

        let d = Decimal::from_str("-0.005").unwrap();
        assert_eq!(round_money(d), Decimal::from_str("-0.01").unwrap());
    }

    #[test]
    fn test_cents_round_trip() {
        let d = Decimal::from_str("250.75").unwrap();
        let cents = to_cents(d).unwrap();
        assert_eq!(cents, 25075);
        assert_eq!(from_cents(cents), d);
    }

    #[test]
    fn test_to_cents_rounds_at_boundary() {
        let d = Decimal::from_str("10.999").unwrap();
        assert_eq!(to_cents(d), Some(1100));
    }

    #[test]
    fn test_from_cents_negative() {
        assert_eq!(from_cents(-7500), Decimal::from_str("-75.00").unwrap());
    }
}
