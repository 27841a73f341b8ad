//! Risk-level classification for positions and the account.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;

/// RiskLevel grades how close a position or the account is to forced action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
    Critical,
    Emergency,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RiskLevel::Low => "low",
            RiskLevel::Moderate => "moderate",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
            RiskLevel::Emergency => "emergency",
        };
        f.write_str(s)
    }
}

/// Classifies a single position from its distance to liquidation and the
/// fraction of maintenance margin consumed.
pub fn position_risk_level(liquidation_distance: Decimal, margin_ratio: Decimal) -> RiskLevel {
    if liquidation_distance < dec!(0.10) || margin_ratio > dec!(0.90) {
        RiskLevel::Critical
    } else if liquidation_distance < dec!(0.20) || margin_ratio > dec!(0.70) {
        RiskLevel::High
    } else if liquidation_distance < dec!(0.30) || margin_ratio > dec!(0.50) {
        RiskLevel::Moderate
    } else {
        RiskLevel::Low
    }
}

/// Classifies the whole account from the circuit-breaker flag, the daily
/// loss ratio against the configured limit, and the losing streak.
pub fn account_risk_level(
    circuit_breaker_active: bool,
    loss_ratio: Decimal,
    daily_loss_limit: Decimal,
    consecutive_losses: u32,
) -> RiskLevel {
    if circuit_breaker_active {
        RiskLevel::Emergency
    } else if loss_ratio > daily_loss_limit * dec!(0.8) {
        RiskLevel::Critical
    } else if loss_ratio > daily_loss_limit * dec!(0.6) {
        RiskLevel::High
    } else if consecutive_losses > 3 {
        RiskLevel::Moderate
    } else {
        RiskLevel::Low
    }
}
