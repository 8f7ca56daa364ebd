use rust_decimal::{Decimal, RoundingStrategy};

use crate::constants::{COST_PRICE_DECIMAL_PRECISION, DISPLAY_DECIMAL_PRECISION};

/// Rounds a money or share value to display precision (half away from zero).
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(
        DISPLAY_DECIMAL_PRECISION,
        RoundingStrategy::MidpointAwayFromZero,
    )
}

/// Rounds a unit cost price to its display precision (half away from zero).
pub fn round_price(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(
        COST_PRICE_DECIMAL_PRECISION,
        RoundingStrategy::MidpointAwayFromZero,
    )
}

/// Returns the value only if it is strictly positive.
pub fn positive(value: Option<Decimal>) -> Option<Decimal> {
    value.filter(|v| v.is_sign_positive() && !v.is_zero())
}
