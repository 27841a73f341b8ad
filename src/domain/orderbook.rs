//! Orderbook data structures.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::SystemTime;

/// PriceLevel represents a single price level in the orderbook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceLevel {
    pub price: Decimal,
    pub size: Decimal,
}

/// Orderbook represents the current depth snapshot for a futures symbol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Orderbook {
    /// The futures symbol (e.g. "BTCUSDT").
    pub symbol: String,
    /// Sorted list of bid price levels (highest to lowest).
    pub bids: Vec<PriceLevel>,
    /// Sorted list of ask price levels (lowest to highest).
    pub asks: Vec<PriceLevel>,
    /// Timestamp when this snapshot was captured.
    pub timestamp: SystemTime,
}

impl Orderbook {
    /// Returns the best bid price level, if available.
    pub fn best_bid(&self) -> Option<&PriceLevel> {
        self.bids.first()
    }

    /// Returns the best ask price level, if available.
    pub fn best_ask(&self) -> Option<&PriceLevel> {
        self.asks.first()
    }

    /// Returns the midpoint between best bid and best ask.
    pub fn mid_price(&self) -> Option<Decimal> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => Some((bid.price + ask.price) / Decimal::TWO),
            _ => None,
        }
    }
}
