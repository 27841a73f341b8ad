//! Risk limit configuration.
//!
//! Raw YAML values; decimals are strings to avoid float rounding. The typed
//! form lives in `engine::RiskParameters`, built via
//! `RiskParameters::from_config`.

use super::ConfigError;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::time::Duration;

/// Risk limit settings. Every field is optional; defaults are tuned for
/// high-frequency scalping.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RiskConfig {
    /// Maximum leverage accepted for any entry (e.g. "10").
    pub max_leverage: Option<String>,
    /// Minimum fractional distance from liquidation (e.g. "0.15" for 15%).
    pub liquidation_buffer: Option<String>,
    /// Fraction of margin kept in reserve (e.g. "0.25").
    pub safe_margin_ratio: Option<String>,
    /// Hard cap on notional position value in USD (e.g. "10000").
    pub max_position_size_usd: Option<String>,
    /// Fraction of available balance risked per trade (e.g. "0.02").
    pub position_size_percent: Option<String>,
    /// Maximum simultaneous open positions.
    pub max_concurrent_positions: Option<usize>,
    /// Daily loss limit as a fraction of balance (e.g. "0.05" for 5%).
    pub daily_loss_limit: Option<String>,
    /// Consecutive losses that trip the circuit breaker.
    pub max_consecutive_losses: Option<u32>,
    /// Loss fraction over a short window considered rapid (e.g. "0.02").
    pub rapid_loss_threshold: Option<String>,
    /// Maximum acceptable expected slippage in basis points (e.g. "5").
    pub max_slippage_bps: Option<String>,
    /// Multiplier applied to raw slippage estimates (e.g. "1.2").
    pub slippage_adjustment: Option<String>,
    /// Funding rate magnitude considered critical (e.g. "0.01" for 1%).
    pub funding_rate_threshold: Option<String>,
    /// How close to a funding settlement positions are force-closed ("5m").
    #[serde(default, deserialize_with = "super::duration::deserialize")]
    pub funding_time_buffer: Duration,
}

impl RiskConfig {
    /// Checks that every present decimal field parses; ranges are enforced
    /// when the typed parameters are built.
    pub(super) fn validate(&self) -> Result<(), ConfigError> {
        for (name, raw) in [
            ("max_leverage", &self.max_leverage),
            ("liquidation_buffer", &self.liquidation_buffer),
            ("safe_margin_ratio", &self.safe_margin_ratio),
            ("max_position_size_usd", &self.max_position_size_usd),
            ("position_size_percent", &self.position_size_percent),
            ("daily_loss_limit", &self.daily_loss_limit),
            ("rapid_loss_threshold", &self.rapid_loss_threshold),
            ("max_slippage_bps", &self.max_slippage_bps),
            ("slippage_adjustment", &self.slippage_adjustment),
            ("funding_rate_threshold", &self.funding_rate_threshold),
        ] {
            if let Some(s) = raw {
                if s.trim().parse::<Decimal>().is_err() {
                    return Err(ConfigError::Validation(format!(
                        "risk.{}: invalid decimal \"{}\"",
                        name, s
                    )));
                }
            }
        }
        Ok(())
    }
}
