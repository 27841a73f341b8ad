//! High-frequency scalping risk engine.
//!
//! Gates every trade entry, supervises open positions, and force-closes
//! anything drifting toward liquidation. Designed for 20-50 trades/day with
//! 1-5 minute holds: aggressive sizing, real-time liquidation prevention,
//! circuit breaker on losing streaks, and a global emergency stop.

mod entry;
mod exit;
pub mod funding;
mod levels;
pub mod liquidation;
mod params;
mod position;
pub mod slippage;
mod state;
mod stats;
mod summary;

pub use entry::{EntryDecision, EntryMetrics};
pub use funding::FundingAssessment;
pub use levels::{RiskLevel, account_risk_level, position_risk_level};
pub use params::RiskParameters;
pub use position::{AccountRisk, PositionRisk};
pub use state::{AuditEvent, AuditRecord};
pub use stats::DailyStats;
pub use summary::{AccountSummary, PositionSummary, PositionsSummary, RiskSummary};

use crate::domain::{ExitOrder, ExitOrderType, OrderSide};
use crate::gateway::ExchangeGateway;
use chrono::Utc;
use rust_decimal::Decimal;
use state::EngineState;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

/// Real-time risk management engine.
///
/// Constructed once at process start and passed by reference into the
/// orchestrator; there is no ambient global state. All mutable state lives
/// behind a single async mutex that is never held across a gateway call.
pub struct RiskEngine {
    gateway: Arc<dyn ExchangeGateway>,
    params: RiskParameters,
    state: Mutex<EngineState>,
}

impl RiskEngine {
    /// Creates the engine, seeding account state from a fresh exchange
    /// snapshot and warming the funding cache (best effort).
    pub async fn connect(
        gateway: Arc<dyn ExchangeGateway>,
        params: RiskParameters,
    ) -> crate::gateway::Result<Self> {
        let snapshot = gateway.account_snapshot().await?;
        let account = AccountRisk::from_snapshot(&snapshot);
        let start_balance = snapshot.total_balance + snapshot.unrealized_pnl;
        let stats = DailyStats::fresh(start_balance, Utc::now().date_naive());

        let engine = RiskEngine {
            gateway,
            params,
            state: Mutex::new(EngineState::new(account, stats)),
        };

        if let Err(e) = engine.refresh_funding().await {
            warn!(error = %e, "Initial funding refresh failed, continuing without funding data");
        }

        info!(
            balance = %snapshot.total_balance,
            exchange = engine.gateway.name(),
            "Risk engine initialized"
        );
        Ok(engine)
    }

    /// Returns the immutable risk limits the engine enforces.
    pub fn params(&self) -> &RiskParameters {
        &self.params
    }

    /// Registers a filled entry for risk tracking.
    ///
    /// Called by the orchestrator after the exchange confirms the fill;
    /// acceptance by `validate_entry` alone never creates a ledger entry.
    pub async fn register_position(
        &self,
        symbol: &str,
        side: OrderSide,
        quantity: Decimal,
        entry_price: Decimal,
        leverage: Decimal,
        order_id: &str,
    ) {
        let liquidation_price = self
            .liquidation_price_for(symbol, side, entry_price, leverage)
            .await;

        let mut state = self.state.lock().await;
        let position = PositionRisk::new(
            symbol.to_string(),
            side,
            quantity,
            entry_price,
            leverage,
            liquidation_price,
        );
        state.ledger.insert(order_id.to_string(), position);
        state.stats.trades += 1;
        state.account.daily_trades += 1;

        info!(
            symbol,
            side = ?side,
            %quantity,
            %entry_price,
            %liquidation_price,
            order_id,
            "Position registered"
        );
    }

    /// Computes the liquidation price using exchange metadata, degrading to
    /// a conservative estimate when the lookup fails. Never errors.
    pub(crate) async fn liquidation_price_for(
        &self,
        symbol: &str,
        side: OrderSide,
        entry_price: Decimal,
        leverage: Decimal,
    ) -> Decimal {
        match self.gateway.symbol_meta(symbol).await {
            Ok(meta) => {
                let rate = meta
                    .maintenance_margin_rate
                    .unwrap_or(liquidation::DEFAULT_MAINTENANCE_RATE);
                liquidation::liquidation_price(side, entry_price, leverage, rate)
            }
            Err(e) => {
                warn!(
                    symbol,
                    error = %e,
                    "Symbol metadata unavailable, using conservative liquidation estimate"
                );
                liquidation::fallback_liquidation_price(side, entry_price)
            }
        }
    }

    /// Refreshes the funding-rate cache from the gateway.
    pub async fn refresh_funding(&self) -> crate::gateway::Result<()> {
        let schedule = self.gateway.funding_schedule().await?;
        let symbols = schedule.len();

        let mut state = self.state.lock().await;
        state.apply_funding(schedule, Utc::now());
        debug!(symbols, "Funding rates updated");
        Ok(())
    }

    /// Rotates daily stats when the calendar date has changed.
    ///
    /// This is the only automatic recovery path from a circuit-breaker trip:
    /// the rollover clears the flag and the losing streak. Returns whether a
    /// rotation happened.
    pub async fn maybe_rotate_daily_stats(&self) -> crate::gateway::Result<bool> {
        let today = Utc::now().date_naive();
        {
            let state = self.state.lock().await;
            if state.stats.last_reset == today {
                return Ok(false);
            }
        }

        let snapshot = self.gateway.account_snapshot().await?;
        let start_balance = snapshot.total_balance + snapshot.unrealized_pnl;

        let mut state = self.state.lock().await;
        state.stats = DailyStats::fresh(start_balance, today);
        state.account.circuit_breaker_active = false;
        state.account.consecutive_losses = 0;
        state.account.daily_pnl = Decimal::ZERO;
        state.account.daily_trades = 0;
        state.account.risk_level = RiskLevel::Low;

        info!(%start_balance, "Daily stats reset");
        Ok(true)
    }

    /// Global kill switch: force-closes every open position and blocks all
    /// new entries until `reset_emergency_stop`.
    pub async fn emergency_stop_all(&self, reason: &str) {
        error!(reason, "EMERGENCY STOP ACTIVATED");

        let (drained, daily_pnl) = {
            let mut state = self.state.lock().await;
            state.emergency_stop = true;
            let drained: Vec<(String, PositionRisk)> = state.ledger.drain().collect();
            (drained, state.account.daily_pnl)
        };

        let closed = self.close_all(&drained, ExitOrderType::Emergency).await;

        let mut state = self.state.lock().await;
        let consecutive_losses = state.account.consecutive_losses;
        state.audit.push(AuditRecord {
            at: Utc::now(),
            event: AuditEvent::EmergencyStop,
            reason: reason.to_string(),
            consecutive_losses,
            positions_closed: closed,
            daily_pnl,
        });
    }

    /// Clears the emergency-stop flag so trading can resume. Idempotent.
    pub async fn reset_emergency_stop(&self) {
        let mut state = self.state.lock().await;
        state.emergency_stop = false;
        info!("Emergency stop reset - trading can resume");
    }

    /// Returns true while the kill switch is set.
    pub async fn is_emergency_stopped(&self) -> bool {
        self.state.lock().await.emergency_stop
    }

    /// Number of positions currently tracked in the ledger.
    pub async fn open_position_count(&self) -> usize {
        self.state.lock().await.ledger.len()
    }

    /// Audit records for circuit-breaker trips and emergency stops.
    pub async fn audit_log(&self) -> Vec<AuditRecord> {
        self.state.lock().await.audit.clone()
    }

    /// Builds a point-in-time risk report.
    pub async fn get_risk_summary(&self) -> RiskSummary {
        let state = self.state.lock().await;
        let account = &state.account;

        let daily_pnl_pct = if account.total_balance > Decimal::ZERO {
            account.daily_pnl / account.total_balance * Decimal::ONE_HUNDRED
        } else {
            Decimal::ZERO
        };

        let details: Vec<PositionSummary> = state
            .ledger
            .values()
            .map(|p| PositionSummary {
                symbol: p.symbol.clone(),
                side: p.side,
                unrealized_pnl: p.unrealized_pnl,
                risk_level: p.risk_level,
                liquidation_price: p.liquidation_price,
                time_held: p.time_held,
            })
            .collect();

        RiskSummary {
            account_risk: AccountSummary {
                total_balance: account.total_balance,
                daily_pnl: account.daily_pnl,
                daily_pnl_pct,
                risk_level: account.risk_level,
                circuit_breaker: account.circuit_breaker_active,
                consecutive_losses: account.consecutive_losses,
                emergency_stop: state.emergency_stop,
            },
            daily_stats: state.stats.clone(),
            positions: PositionsSummary {
                count: details.len(),
                details,
            },
            next_funding_time: state.next_funding_time(),
            risk_parameters: self.params.clone(),
        }
    }

    /// Runs the periodic risk monitor until the emergency stop is set.
    ///
    /// Each tick refreshes positions and the account, refreshes funding
    /// rates on the slower cadence, and rotates daily stats at midnight.
    /// Transient gateway errors are logged and retried on the next tick.
    pub async fn run_monitor(&self, update_interval: Duration, funding_refresh: Duration) {
        info!(?update_interval, ?funding_refresh, "Starting risk monitor");

        let mut interval = tokio::time::interval(update_interval);
        let mut cycles: u64 = 0;

        loop {
            interval.tick().await;

            // Cooperative cancellation: the flag is only checked at tick
            // boundaries, so an in-flight cycle always completes.
            if self.is_emergency_stopped().await {
                warn!("Emergency stop set, risk monitor exiting");
                break;
            }
            cycles += 1;

            if let Err(e) = self.update_positions().await {
                warn!(error = %e, "Position update failed, retrying next tick");
                continue;
            }

            let funding_due = {
                let state = self.state.lock().await;
                let elapsed = (Utc::now() - state.account.last_funding_check).num_seconds();
                elapsed >= funding_refresh.as_secs() as i64
            };
            if funding_due {
                if let Err(e) = self.refresh_funding().await {
                    warn!(error = %e, "Funding refresh failed");
                }
            }

            if let Err(e) = self.maybe_rotate_daily_stats().await {
                warn!(error = %e, "Daily stats rotation failed");
            }

            if cycles % 30 == 0 {
                let summary = self.get_risk_summary().await;
                info!(
                    daily_pnl = %summary.account_risk.daily_pnl,
                    daily_pnl_pct = %summary.account_risk.daily_pnl_pct,
                    positions = summary.positions.count,
                    risk_level = %summary.account_risk.risk_level,
                    "Risk status"
                );
            }
        }
    }

    /// Places market-style exits for an already-drained set of positions.
    /// Best effort: failures are logged, the count of accepted orders is
    /// returned.
    async fn close_all(
        &self,
        positions: &[(String, PositionRisk)],
        order_type: ExitOrderType,
    ) -> usize {
        let mut closed = 0;
        for (entry_order_id, position) in positions {
            let order = ExitOrder {
                symbol: position.symbol.clone(),
                side: position.side.closing(),
                order_type,
                quantity: position.quantity.abs(),
                stop_price: None,
                reduce_only: true,
            };
            match self.gateway.place_exit_order(order).await {
                Ok(ack) => {
                    info!(
                        symbol = %position.symbol,
                        exit_order = %ack.order_id,
                        "Position flattened"
                    );
                    closed += 1;
                }
                Err(e) => {
                    warn!(
                        symbol = %position.symbol,
                        entry_order = %entry_order_id,
                        error = %e,
                        "Flatten order failed"
                    );
                }
            }
        }
        closed
    }
}

#[cfg(test)]
mod tests;
