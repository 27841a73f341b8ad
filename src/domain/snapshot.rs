//! Read-only snapshots pulled from the exchange gateway.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// AccountSnapshot is the account state as reported by the exchange.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountSnapshot {
    /// Total wallet balance in quote currency.
    pub total_balance: Decimal,
    /// Balance available for new positions.
    pub available_balance: Decimal,
    /// Sum of unrealized PnL across all open positions.
    pub unrealized_pnl: Decimal,
}

/// PositionSnapshot is the live state of one open position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionSnapshot {
    pub symbol: String,
    /// Unrealized PnL in quote currency.
    pub unrealized_pnl: Decimal,
    /// Fraction of maintenance margin currently consumed (0..1).
    pub margin_ratio: Decimal,
    /// Current mark price used for liquidation checks.
    pub mark_price: Decimal,
}

/// FundingSnapshot is the funding schedule for one perpetual symbol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FundingSnapshot {
    pub symbol: String,
    /// Current funding rate as a decimal (0.0001 = 0.01%).
    pub rate: Decimal,
    /// When the next funding payment settles.
    pub next_funding_time: DateTime<Utc>,
}

/// SymbolMeta is static exchange metadata for one symbol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymbolMeta {
    pub symbol: String,
    /// Maintenance-margin rate for the lowest bracket, when published.
    pub maintenance_margin_rate: Option<Decimal>,
}
