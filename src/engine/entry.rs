//! Entry validation: the sequential gate pipeline.

use super::levels::{RiskLevel, position_risk_level};
use super::{RiskEngine, funding, liquidation, slippage};
use crate::domain::EntryCandidate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::warn;

/// Metrics attached to an accepted entry decision.
#[derive(Debug, Clone)]
pub struct EntryMetrics {
    pub liquidation_price: Decimal,
    /// Fractional distance between entry and liquidation price.
    pub liquidation_distance: Decimal,
    /// Notional value of the proposed position in quote currency.
    pub position_value: Decimal,
    pub expected_slippage_bps: Decimal,
    pub funding_risk: RiskLevel,
    /// Risk level the position would start at.
    pub risk_level: RiskLevel,
}

/// Outcome of `validate_entry`. Rejection is an expected, non-exceptional
/// result and always carries a reason.
#[derive(Debug, Clone)]
pub struct EntryDecision {
    pub accepted: bool,
    pub reason: String,
    pub metrics: Option<EntryMetrics>,
}

impl EntryDecision {
    fn rejected(reason: impl Into<String>) -> Self {
        EntryDecision {
            accepted: false,
            reason: reason.into(),
            metrics: None,
        }
    }

    fn accepted(metrics: EntryMetrics) -> Self {
        EntryDecision {
            accepted: true,
            reason: "Entry validated".to_string(),
            metrics: Some(metrics),
        }
    }
}

/// In-memory values captured under the lock for the gates that need I/O.
struct GateSnapshot {
    available_balance: Decimal,
    funding_rate: Option<Decimal>,
}

impl RiskEngine {
    /// Validates a proposed trade against all risk gates, in order,
    /// short-circuiting on the first failure.
    ///
    /// Gate order: emergency stop, circuit breaker, daily loss limit,
    /// concurrent positions, leverage, position size, liquidation distance,
    /// funding risk, slippage. Rejection has no side effects on the ledger
    /// or account state; acceptance does not create a ledger entry either,
    /// that happens in `register_position` after the fill confirms.
    pub async fn validate_entry(&self, candidate: &EntryCandidate) -> EntryDecision {
        let params = &self.params;

        // Gates 1-5 only need in-memory state; run them under one short
        // lock and capture what the remaining gates need.
        let snapshot = {
            let state = self.state.lock().await;

            if state.emergency_stop {
                return EntryDecision::rejected("Emergency stop active");
            }

            if state.account.circuit_breaker_active {
                return EntryDecision::rejected("Circuit breaker active - excessive losses");
            }

            let loss_floor = -(params.daily_loss_limit * state.account.total_balance);
            if state.account.daily_pnl <= loss_floor {
                return EntryDecision::rejected(format!(
                    "Daily loss limit reached: {:.2}",
                    state.account.daily_pnl
                ));
            }

            if state.ledger.len() >= params.max_concurrent_positions {
                return EntryDecision::rejected(format!(
                    "Maximum concurrent positions ({}) reached",
                    params.max_concurrent_positions
                ));
            }

            if candidate.leverage > params.max_leverage {
                return EntryDecision::rejected(format!(
                    "Leverage {}x exceeds maximum {}x",
                    candidate.leverage, params.max_leverage
                ));
            }

            GateSnapshot {
                available_balance: state.account.available_balance,
                funding_rate: state.funding.get(&candidate.symbol).map(|f| f.rate),
            }
        };

        let current_price = match candidate.price {
            Some(price) => price,
            None => match self.gateway.mark_price(&candidate.symbol).await {
                Ok(price) if price > Decimal::ZERO => price,
                Ok(_) => {
                    return EntryDecision::rejected(format!(
                        "No price available for {}",
                        candidate.symbol
                    ));
                }
                Err(e) => {
                    return EntryDecision::rejected(format!(
                        "Price unavailable for {}: {}",
                        candidate.symbol, e
                    ));
                }
            },
        };

        // Gate 6: position size against the hard cap and the
        // balance-proportional cap.
        let position_value = candidate.quantity * current_price;
        let max_position = params.max_position_size_usd.min(
            snapshot.available_balance * params.position_size_percent * candidate.leverage,
        );
        if position_value > max_position {
            return EntryDecision::rejected(format!(
                "Position size ${:.2} exceeds maximum ${:.2}",
                position_value, max_position
            ));
        }

        // Gate 7: liquidation distance.
        let liquidation_price = self
            .liquidation_price_for(&candidate.symbol, candidate.side, current_price, candidate.leverage)
            .await;
        let liquidation_distance =
            liquidation::liquidation_distance(liquidation_price, current_price);
        if liquidation_distance < params.liquidation_buffer {
            return EntryDecision::rejected(format!(
                "Too close to liquidation: {:.2}% buffer",
                liquidation_distance * dec!(100)
            ));
        }

        // Gate 8: funding cost.
        let funding_risk = funding::assess(
            snapshot.funding_rate,
            candidate.side,
            params.funding_rate_threshold,
        );
        if funding_risk.level == RiskLevel::Critical {
            return EntryDecision::rejected(format!(
                "High funding rate risk: {}",
                funding_risk.message
            ));
        }

        // Gate 9: expected slippage from current depth.
        let expected_slippage = match self.gateway.order_book(&candidate.symbol).await {
            Ok(book) => slippage::estimate_bps(
                candidate.side,
                candidate.quantity,
                &book,
                params.slippage_adjustment,
            ),
            Err(e) => {
                warn!(
                    symbol = %candidate.symbol,
                    error = %e,
                    "Orderbook unavailable, using conservative slippage estimate"
                );
                slippage::FALLBACK_SLIPPAGE_BPS
            }
        };
        {
            let mut state = self.state.lock().await;
            state.slippage.record(&candidate.symbol, expected_slippage);
        }
        if expected_slippage > params.max_slippage_bps {
            return EntryDecision::rejected(format!(
                "Expected slippage {:.1}bps exceeds limit",
                expected_slippage
            ));
        }

        EntryDecision::accepted(EntryMetrics {
            liquidation_price,
            liquidation_distance,
            position_value,
            expected_slippage_bps: expected_slippage,
            funding_risk: funding_risk.level,
            // No margin consumed yet at entry time.
            risk_level: position_risk_level(liquidation_distance, Decimal::ZERO),
        })
    }
}
