//! Liquidation price math.

use crate::domain::OrderSide;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Maintenance-margin rate assumed when the exchange publishes none.
pub const DEFAULT_MAINTENANCE_RATE: Decimal = dec!(0.004);

/// Computes the liquidation price for a position.
///
/// Long:  entry * (1 - 1/leverage + maintenance_rate)
/// Short: entry * (1 + 1/leverage - maintenance_rate)
///
/// Non-positive leverage degrades to the conservative fallback instead of
/// dividing by zero; this function never fails.
pub fn liquidation_price(
    side: OrderSide,
    entry_price: Decimal,
    leverage: Decimal,
    maintenance_rate: Decimal,
) -> Decimal {
    if leverage <= Decimal::ZERO {
        return fallback_liquidation_price(side, entry_price);
    }
    let inverse_leverage = Decimal::ONE / leverage;
    match side {
        OrderSide::Buy => entry_price * (Decimal::ONE - inverse_leverage + maintenance_rate),
        OrderSide::Sell => entry_price * (Decimal::ONE + inverse_leverage - maintenance_rate),
    }
}

/// Conservative estimate used when the metadata lookup itself fails:
/// 10% below entry for longs, 10% above for shorts.
pub fn fallback_liquidation_price(side: OrderSide, entry_price: Decimal) -> Decimal {
    match side {
        OrderSide::Buy => entry_price * dec!(0.9),
        OrderSide::Sell => entry_price * dec!(1.1),
    }
}

/// Fractional distance between the liquidation price and the current price.
/// A zero or negative current price reads as zero distance, the most
/// conservative interpretation.
pub fn liquidation_distance(liquidation_price: Decimal, current_price: Decimal) -> Decimal {
    if current_price <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    ((liquidation_price - current_price) / current_price).abs()
}
