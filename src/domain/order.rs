//! Order entities for protective exits issued by the risk engine.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// OrderSide represents the direction of a position or order (buy or sell).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    /// OrderSideBuy indicates a long position or a buy order.
    Buy,
    /// OrderSideSell indicates a short position or a sell order.
    Sell,
}

impl OrderSide {
    /// Returns the side that closes a position opened on this side.
    pub fn closing(self) -> OrderSide {
        match self {
            OrderSide::Buy => OrderSide::Sell,
            OrderSide::Sell => OrderSide::Buy,
        }
    }

    /// Returns true for long positions.
    pub fn is_long(self) -> bool {
        matches!(self, OrderSide::Buy)
    }
}

/// ExitOrderType represents how a protective exit is executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExitOrderType {
    /// Immediate market exit, used when liquidation is close.
    Market,
    /// Stop-market placed just inside the current price.
    StopMarket,
    /// Market exit issued by the global kill switch.
    Emergency,
}

/// OrderStatus represents the state reported by the gateway after placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Order is accepted and resting on the exchange.
    Open,
    /// Order has been completely filled.
    Filled,
    /// Order was cancelled before being filled.
    Cancelled,
    /// Order was rejected or failed.
    Failed,
}

/// ExitOrder is a protective close for a single tracked position.
///
/// Exits are always reduce-only: they may shrink or close a position but
/// never open exposure in the opposite direction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExitOrder {
    /// Symbol of the position being closed (e.g. "BTCUSDT").
    pub symbol: String,
    /// Side of the exit order (opposite of the position side).
    pub side: OrderSide,
    /// Execution type for the exit.
    #[serde(rename = "type")]
    pub order_type: ExitOrderType,
    /// Quantity to close, in base units, always positive.
    pub quantity: Decimal,
    /// Stop price for stop-market exits, absent for plain market exits.
    pub stop_price: Option<Decimal>,
    /// Reduce-only flag, always set by the engine.
    pub reduce_only: bool,
}

/// OrderAck is the gateway's response to an exit-order placement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderAck {
    /// Identifier assigned by the exchange.
    pub order_id: String,
    /// State of the order at acknowledgement time.
    pub status: OrderStatus,
    /// Fill price when the order executed immediately (market exits).
    pub fill_price: Option<Decimal>,
}
