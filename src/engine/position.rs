//! Risk records for open positions and the account.

use super::levels::RiskLevel;
use crate::domain::OrderSide;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// PositionRisk tracks the risk state of one open position.
///
/// Created on registration, refreshed every monitor cycle, removed exactly
/// once when its exit order is issued.
#[derive(Debug, Clone)]
pub struct PositionRisk {
    pub symbol: String,
    pub side: OrderSide,
    pub entry_price: Decimal,
    pub quantity: Decimal,
    pub leverage: Decimal,
    pub unrealized_pnl: Decimal,
    pub liquidation_price: Decimal,
    /// Fraction of maintenance margin currently consumed (0..1).
    pub margin_ratio: Decimal,
    /// Seconds since entry, refreshed each cycle.
    pub time_held: i64,
    pub risk_level: RiskLevel,
    /// Human-readable triggers, append-only until removal.
    pub exit_reasons: Vec<String>,
    pub opened_at: DateTime<Utc>,
}

impl PositionRisk {
    /// Creates a freshly registered position record.
    pub fn new(
        symbol: String,
        side: OrderSide,
        quantity: Decimal,
        entry_price: Decimal,
        leverage: Decimal,
        liquidation_price: Decimal,
    ) -> Self {
        PositionRisk {
            symbol,
            side,
            entry_price,
            quantity,
            leverage,
            unrealized_pnl: Decimal::ZERO,
            liquidation_price,
            margin_ratio: Decimal::ZERO,
            time_held: 0,
            risk_level: RiskLevel::Low,
            exit_reasons: Vec::new(),
            opened_at: Utc::now(),
        }
    }
}

/// AccountRisk is the single process-wide account risk record.
#[derive(Debug, Clone)]
pub struct AccountRisk {
    pub total_balance: Decimal,
    pub available_balance: Decimal,
    pub total_unrealized_pnl: Decimal,
    /// (total_balance + total_unrealized_pnl) - day_start_balance.
    pub daily_pnl: Decimal,
    pub daily_trades: u32,
    pub consecutive_losses: u32,
    pub risk_level: RiskLevel,
    pub circuit_breaker_active: bool,
    pub last_funding_check: DateTime<Utc>,
}

impl AccountRisk {
    /// Seeds the record from an exchange account snapshot at engine start.
    pub fn from_snapshot(snapshot: &crate::domain::AccountSnapshot) -> Self {
        AccountRisk {
            total_balance: snapshot.total_balance,
            available_balance: snapshot.available_balance,
            total_unrealized_pnl: snapshot.unrealized_pnl,
            daily_pnl: Decimal::ZERO,
            daily_trades: 0,
            consecutive_losses: 0,
            risk_level: RiskLevel::Low,
            circuit_breaker_active: false,
            last_funding_check: Utc::now(),
        }
    }
}
