//! Risk parameters for scalping operations.

use crate::config::{ConfigError, RiskConfig};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;
use std::time::Duration;

/// Immutable risk limits the engine enforces.
///
/// Defaults are tuned for 20-50 trades/day with 1-5 minute holds.
#[derive(Debug, Clone, Serialize)]
pub struct RiskParameters {
    // Liquidation prevention
    /// Maximum leverage accepted for any entry.
    pub max_leverage: Decimal,
    /// Minimum fractional distance from liquidation required at entry.
    pub liquidation_buffer: Decimal,
    /// Fraction of margin kept in reserve.
    pub safe_margin_ratio: Decimal,

    // Position sizing
    /// Hard cap on notional position value in USD.
    pub max_position_size_usd: Decimal,
    /// Fraction of available balance risked per trade.
    pub position_size_percent: Decimal,
    /// Maximum simultaneous open positions.
    pub max_concurrent_positions: usize,

    // Drawdown control
    /// Daily loss limit as a fraction of balance.
    pub daily_loss_limit: Decimal,
    /// Consecutive losses that trip the circuit breaker.
    pub max_consecutive_losses: u32,
    /// Loss fraction over a short window considered rapid.
    pub rapid_loss_threshold: Decimal,

    // Slippage management
    /// Maximum acceptable expected slippage in basis points.
    pub max_slippage_bps: Decimal,
    /// Multiplier applied to raw slippage estimates.
    pub slippage_adjustment: Decimal,

    // Funding rate
    /// Funding rate magnitude considered critical.
    pub funding_rate_threshold: Decimal,
    /// How close to a funding settlement positions are force-closed.
    #[serde(serialize_with = "crate::config::duration::serialize_secs")]
    pub funding_time_buffer: Duration,
}

impl Default for RiskParameters {
    fn default() -> Self {
        RiskParameters {
            max_leverage: dec!(10),
            liquidation_buffer: dec!(0.15),
            safe_margin_ratio: dec!(0.25),
            max_position_size_usd: dec!(10000),
            position_size_percent: dec!(0.02),
            max_concurrent_positions: 3,
            daily_loss_limit: dec!(0.05),
            max_consecutive_losses: 5,
            rapid_loss_threshold: dec!(0.02),
            max_slippage_bps: dec!(5),
            slippage_adjustment: dec!(1.2),
            funding_rate_threshold: dec!(0.01),
            funding_time_buffer: Duration::from_secs(300),
        }
    }
}

impl RiskParameters {
    /// Builds parameters from the optional config section, falling back to
    /// defaults for absent fields. Fails on unparsable or non-positive values.
    pub fn from_config(cfg: Option<&RiskConfig>) -> Result<Self, ConfigError> {
        let defaults = RiskParameters::default();
        let Some(cfg) = cfg else {
            return Ok(defaults);
        };

        let params = RiskParameters {
            max_leverage: parse_decimal("max_leverage", &cfg.max_leverage, defaults.max_leverage)?,
            liquidation_buffer: parse_decimal(
                "liquidation_buffer",
                &cfg.liquidation_buffer,
                defaults.liquidation_buffer,
            )?,
            safe_margin_ratio: parse_decimal(
                "safe_margin_ratio",
                &cfg.safe_margin_ratio,
                defaults.safe_margin_ratio,
            )?,
            max_position_size_usd: parse_decimal(
                "max_position_size_usd",
                &cfg.max_position_size_usd,
                defaults.max_position_size_usd,
            )?,
            position_size_percent: parse_decimal(
                "position_size_percent",
                &cfg.position_size_percent,
                defaults.position_size_percent,
            )?,
            max_concurrent_positions: cfg
                .max_concurrent_positions
                .unwrap_or(defaults.max_concurrent_positions),
            daily_loss_limit: parse_decimal(
                "daily_loss_limit",
                &cfg.daily_loss_limit,
                defaults.daily_loss_limit,
            )?,
            max_consecutive_losses: cfg
                .max_consecutive_losses
                .unwrap_or(defaults.max_consecutive_losses),
            rapid_loss_threshold: parse_decimal(
                "rapid_loss_threshold",
                &cfg.rapid_loss_threshold,
                defaults.rapid_loss_threshold,
            )?,
            max_slippage_bps: parse_decimal(
                "max_slippage_bps",
                &cfg.max_slippage_bps,
                defaults.max_slippage_bps,
            )?,
            slippage_adjustment: parse_decimal(
                "slippage_adjustment",
                &cfg.slippage_adjustment,
                defaults.slippage_adjustment,
            )?,
            funding_rate_threshold: parse_decimal(
                "funding_rate_threshold",
                &cfg.funding_rate_threshold,
                defaults.funding_rate_threshold,
            )?,
            funding_time_buffer: if cfg.funding_time_buffer.as_secs() > 0 {
                cfg.funding_time_buffer
            } else {
                defaults.funding_time_buffer
            },
        };

        params.validate()?;
        Ok(params)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_leverage <= Decimal::ZERO {
            return Err(ConfigError::Validation(
                "risk.max_leverage must be positive".into(),
            ));
        }
        if self.liquidation_buffer <= Decimal::ZERO || self.liquidation_buffer >= Decimal::ONE {
            return Err(ConfigError::Validation(
                "risk.liquidation_buffer must be between 0 and 1".into(),
            ));
        }
        if self.daily_loss_limit <= Decimal::ZERO || self.daily_loss_limit >= Decimal::ONE {
            return Err(ConfigError::Validation(
                "risk.daily_loss_limit must be between 0 and 1".into(),
            ));
        }
        if self.max_concurrent_positions == 0 {
            return Err(ConfigError::Validation(
                "risk.max_concurrent_positions must be positive".into(),
            ));
        }
        if self.max_consecutive_losses == 0 {
            return Err(ConfigError::Validation(
                "risk.max_consecutive_losses must be positive".into(),
            ));
        }
        Ok(())
    }
}

fn parse_decimal(
    name: &str,
    raw: &Option<String>,
    default: Decimal,
) -> Result<Decimal, ConfigError> {
    match raw {
        Some(s) => s.trim().parse().map_err(|_| {
            ConfigError::Validation(format!("risk.{}: invalid decimal \"{}\"", name, s))
        }),
        None => Ok(default),
    }
}
