//! Serializable risk summary exposed to the orchestrator.

use super::levels::RiskLevel;
use super::params::RiskParameters;
use super::stats::DailyStats;
use crate::domain::OrderSide;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

/// Account-level portion of the risk summary.
#[derive(Debug, Clone, Serialize)]
pub struct AccountSummary {
    pub total_balance: Decimal,
    pub daily_pnl: Decimal,
    /// Daily PnL as a percentage of total balance.
    pub daily_pnl_pct: Decimal,
    pub risk_level: RiskLevel,
    pub circuit_breaker: bool,
    pub consecutive_losses: u32,
    pub emergency_stop: bool,
}

/// Per-position line in the risk summary.
#[derive(Debug, Clone, Serialize)]
pub struct PositionSummary {
    pub symbol: String,
    pub side: OrderSide,
    pub unrealized_pnl: Decimal,
    pub risk_level: RiskLevel,
    pub liquidation_price: Decimal,
    pub time_held: i64,
}

/// Open-positions portion of the risk summary.
#[derive(Debug, Clone, Serialize)]
pub struct PositionsSummary {
    pub count: usize,
    pub details: Vec<PositionSummary>,
}

/// Full point-in-time risk report.
#[derive(Debug, Clone, Serialize)]
pub struct RiskSummary {
    pub account_risk: AccountSummary,
    pub daily_stats: DailyStats,
    pub positions: PositionsSummary,
    pub next_funding_time: Option<DateTime<Utc>>,
    pub risk_parameters: RiskParameters,
}
