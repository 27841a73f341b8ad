//! Trade candidates proposed by the strategy collaborator.

use super::OrderSide;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// EntryCandidate is a proposed trade awaiting risk validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryCandidate {
    /// Futures symbol (e.g. "BTCUSDT").
    pub symbol: String,
    /// Direction of the proposed position.
    pub side: OrderSide,
    /// Quantity in base units, always positive.
    pub quantity: Decimal,
    /// Requested leverage multiplier.
    pub leverage: Decimal,
    /// Optional limit price; when absent the current mark price is used.
    pub price: Option<Decimal>,
}
