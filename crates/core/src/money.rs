//! Currency rounding shared by the pricing engine and the quote aggregator.
//!
//! All media, production, and creative amounts stay unrounded `Decimal`s
//! through intermediate arithmetic; rounding to two decimal places happens
//! once per final figure: each item total, the quote total, and the VAT
//! amounts derived from them.

use rust_decimal::{Decimal, RoundingStrategy};

/// Round to 2 decimal places, half away from zero.
pub fn round2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Interpret a percentage figure (e.g. `10` for 10%) as a multiplier.
pub fn pct(value: Decimal) -> Decimal {
    value / Decimal::ONE_HUNDRED
}
