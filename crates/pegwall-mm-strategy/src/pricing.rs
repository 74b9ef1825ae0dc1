/*
[INPUT]:  Reference price, side, spread, available balance
[OUTPUT]: Truncated wall prices, order sizes, relative price deviation
[POS]:    Strategy layer - pure pricing math shared by placement and the control loop
[UPDATE]: When changing price precision or sizing rules
*/

use rust_decimal::{Decimal, RoundingStrategy};

use pegwall_adapter::Side;

/// Decimal places kept on submitted prices and sizes.
pub const PRICE_DECIMALS: u32 = 8;

/// Drop everything past the 8th decimal, never rounding up.
pub fn truncate_price(price: Decimal) -> Decimal {
    price.round_dp_with_strategy(PRICE_DECIMALS, RoundingStrategy::ToZero)
}

/// Wall price for `side`, truncated at construction.
pub fn side_price(reference_price: Decimal, side: Side, spread: Decimal) -> Decimal {
    let raw = match side {
        Side::Bid => reference_price * (Decimal::ONE - spread),
        Side::Ask => reference_price * (Decimal::ONE + spread),
    };
    truncate_price(raw)
}

/// Order size for the available balance.
///
/// The ask is funded in the pegged unit, so the balance is the size. The bid
/// balance is in the quote unit and is converted at the order price.
pub fn order_size(side: Side, balance: Decimal, price: Decimal) -> Decimal {
    let size = match side {
        Side::Ask => balance,
        Side::Bid if price > Decimal::ZERO => balance / price,
        Side::Bid => Decimal::ZERO,
    };
    size.round_dp_with_strategy(PRICE_DECIMALS, RoundingStrategy::ToZero)
}

/// Relative difference `1 - min / max`.
pub fn deviation(a: Decimal, b: Decimal) -> Decimal {
    let (low, high) = if a <= b { (a, b) } else { (b, a) };
    if high <= Decimal::ZERO {
        // Nothing meaningful to compare against.
        return Decimal::ONE;
    }
    Decimal::ONE - low / high
}
