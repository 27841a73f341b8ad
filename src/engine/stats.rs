//! Daily performance statistics.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

/// Daily trading statistics, reset at calendar-day rollover.
#[derive(Debug, Clone, Serialize)]
pub struct DailyStats {
    pub trades: u32,
    pub wins: u32,
    pub losses: u32,
    pub total_pnl: Decimal,
    /// Most negative daily PnL observed today (always <= 0).
    pub max_drawdown: Decimal,
    /// Balance (wallet + unrealized) at the start of the day.
    pub start_balance: Decimal,
    pub last_reset: NaiveDate,
}

impl DailyStats {
    /// Fresh stats for a new trading day.
    pub fn fresh(start_balance: Decimal, today: NaiveDate) -> Self {
        DailyStats {
            trades: 0,
            wins: 0,
            losses: 0,
            total_pnl: Decimal::ZERO,
            max_drawdown: Decimal::ZERO,
            start_balance,
            last_reset: today,
        }
    }
}
