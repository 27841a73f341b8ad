//! Slippage estimation from orderbook depth.

use crate::domain::{OrderSide, Orderbook};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;

/// Conservative estimate returned when the book cannot be priced.
pub const FALLBACK_SLIPPAGE_BPS: Decimal = dec!(5);

const HISTORY_CAP: usize = 100;
const HISTORY_KEEP: usize = 50;

/// Estimates expected fill slippage in basis points for a market order.
///
/// Walks the relevant side of the ladder (asks for buys, bids for sells)
/// consuming the quantity, computes the volume-weighted fill price and
/// compares it to the book midpoint, then applies the adjustment factor.
/// Returns [`FALLBACK_SLIPPAGE_BPS`] on an empty book or zero quantity.
pub fn estimate_bps(
    side: OrderSide,
    quantity: Decimal,
    book: &Orderbook,
    adjustment: Decimal,
) -> Decimal {
    let quantity = quantity.abs();
    if quantity.is_zero() {
        return FALLBACK_SLIPPAGE_BPS;
    }
    let Some(mid_price) = book.mid_price() else {
        return FALLBACK_SLIPPAGE_BPS;
    };
    if mid_price <= Decimal::ZERO {
        return FALLBACK_SLIPPAGE_BPS;
    }

    let ladder = match side {
        OrderSide::Buy => &book.asks,
        OrderSide::Sell => &book.bids,
    };

    let mut remaining = quantity;
    let mut total_cost = Decimal::ZERO;
    for level in ladder {
        if remaining <= Decimal::ZERO {
            break;
        }
        let fill = remaining.min(level.size);
        total_cost += fill * level.price;
        remaining -= fill;
    }

    if total_cost <= Decimal::ZERO {
        return FALLBACK_SLIPPAGE_BPS;
    }

    // Unfilled remainder means the book is thinner than the order; price the
    // filled part only, which still reflects the walk through the ladder.
    let filled = quantity - remaining;
    let avg_price = total_cost / filled;
    let slippage_bps = ((avg_price - mid_price) / mid_price).abs() * dec!(10000);

    slippage_bps * adjustment
}

/// Per-symbol rolling history of slippage estimates.
#[derive(Debug, Default)]
pub struct SlippageTracker {
    history: HashMap<String, Vec<Decimal>>,
}

impl SlippageTracker {
    /// Appends an estimate, truncating to the most recent entries once the
    /// cap is exceeded.
    pub fn record(&mut self, symbol: &str, bps: Decimal) {
        let entries = self.history.entry(symbol.to_string()).or_default();
        entries.push(bps);
        if entries.len() > HISTORY_CAP {
            let start = entries.len() - HISTORY_KEEP;
            entries.drain(..start);
        }
    }

    /// Returns the recorded estimates for a symbol, oldest first.
    pub fn history(&self, symbol: &str) -> &[Decimal] {
        self.history.get(symbol).map(Vec::as_slice).unwrap_or(&[])
    }
}
