//! Position refresh, exit-trigger evaluation, and the circuit breaker.

use super::levels::{RiskLevel, account_risk_level, position_risk_level};
use super::position::PositionRisk;
use super::state::{AuditEvent, AuditRecord};
use super::{RiskEngine, liquidation};
use crate::domain::{ExitOrder, ExitOrderType, FundingSnapshot};
use crate::engine::RiskParameters;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;
use tracing::{error, info, warn};

/// Margin-ratio ceiling that forces an exit.
const MARGIN_EXIT_RATIO: Decimal = dec!(0.8);
/// Hold-time ceiling for this strategy class, in seconds.
const MAX_HOLD_SECS: i64 = 300;
/// Relative offset for stop-market exits, placed just inside the mark.
const STOP_OFFSET: Decimal = dec!(0.001);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum TriggerKind {
    Liquidation,
    Margin,
    HoldTime,
    Funding,
}

#[derive(Debug, Clone)]
pub(super) struct ExitTrigger {
    pub(super) kind: TriggerKind,
    pub(super) message: String,
}

/// A position whose triggers fired, captured under the lock and closed
/// outside it.
struct PendingExit {
    entry_order_id: String,
    position: PositionRisk,
    mark_price: Decimal,
    triggers: Vec<ExitTrigger>,
}

/// Evaluates all exit triggers for one position. Triggers are OR-combined;
/// any subset may fire in the same cycle.
pub(super) fn evaluate_exit_triggers(
    position: &PositionRisk,
    liquidation_distance: Decimal,
    funding: Option<&FundingSnapshot>,
    params: &RiskParameters,
    now: DateTime<Utc>,
) -> Vec<ExitTrigger> {
    let mut triggers = Vec::new();

    if liquidation_distance < params.liquidation_buffer {
        triggers.push(ExitTrigger {
            kind: TriggerKind::Liquidation,
            message: format!(
                "Liquidation risk: {:.2}% from liquidation",
                liquidation_distance * dec!(100)
            ),
        });
    }

    if position.margin_ratio > MARGIN_EXIT_RATIO {
        triggers.push(ExitTrigger {
            kind: TriggerKind::Margin,
            message: format!("High margin ratio: {:.1}%", position.margin_ratio * dec!(100)),
        });
    }

    if position.time_held > MAX_HOLD_SECS {
        triggers.push(ExitTrigger {
            kind: TriggerKind::HoldTime,
            message: format!("Position held too long: {}s", position.time_held),
        });
    }

    if let Some(funding) = funding {
        let to_funding = (funding.next_funding_time - now).num_seconds();
        if to_funding < params.funding_time_buffer.as_secs() as i64
            && funding.rate.abs() > params.funding_rate_threshold
        {
            triggers.push(ExitTrigger {
                kind: TriggerKind::Funding,
                message: format!(
                    "High funding rate approaching: {:.3}%",
                    funding.rate * dec!(100)
                ),
            });
        }
    }

    triggers
}

impl RiskEngine {
    /// Refreshes every tracked position from a fresh exchange snapshot,
    /// fires emergency exits for any position whose triggers match, then
    /// refreshes account-level risk. Idempotent per call.
    pub async fn update_positions(&self) -> crate::gateway::Result<()> {
        let has_positions = !self.state.lock().await.ledger.is_empty();
        if has_positions {
            let snapshots = self.gateway.position_snapshots().await?;
            let by_symbol: HashMap<&str, &crate::domain::PositionSnapshot> =
                snapshots.iter().map(|s| (s.symbol.as_str(), s)).collect();

            let pending = {
                let mut guard = self.state.lock().await;
                let state = &mut *guard;
                let now = Utc::now();
                let mut pending = Vec::new();

                for (order_id, position) in state.ledger.iter_mut() {
                    let Some(snap) = by_symbol.get(position.symbol.as_str()) else {
                        // No live snapshot this cycle; keep the stale record
                        // and retry next tick.
                        continue;
                    };

                    position.unrealized_pnl = snap.unrealized_pnl;
                    position.margin_ratio = snap.margin_ratio;
                    position.time_held = (now - position.opened_at).num_seconds().max(0);

                    let distance = liquidation::liquidation_distance(
                        position.liquidation_price,
                        snap.mark_price,
                    );
                    position.risk_level = position_risk_level(distance, position.margin_ratio);

                    let triggers = evaluate_exit_triggers(
                        position,
                        distance,
                        state.funding.get(&position.symbol),
                        &self.params,
                        now,
                    );
                    if !triggers.is_empty() {
                        // Reasons are recorded on the outgoing copy only; a
                        // failed exit leaves the ledger record clean for
                        // re-evaluation instead of accumulating duplicates.
                        let mut closing = position.clone();
                        closing
                            .exit_reasons
                            .extend(triggers.iter().map(|t| t.message.clone()));
                        pending.push(PendingExit {
                            entry_order_id: order_id.clone(),
                            position: closing,
                            mark_price: snap.mark_price,
                            triggers,
                        });
                    }
                }
                pending
            };

            for exit in pending {
                // Failures are isolated per position; a failed exit leaves
                // the position in the ledger for the next cycle.
                self.execute_position_exit(exit).await;
            }
        }

        self.refresh_account_risk().await
    }

    /// Closes a single triggered position: market order when liquidation is
    /// the concern, stop-market just inside the price otherwise. On an
    /// accepted exit the position is removed, the result is classified as a
    /// win or loss, and the circuit-breaker condition is evaluated.
    async fn execute_position_exit(&self, exit: PendingExit) {
        let PendingExit {
            entry_order_id,
            position,
            mark_price,
            triggers,
        } = exit;

        warn!(
            symbol = %position.symbol,
            reasons = ?position.exit_reasons,
            "Emergency exit triggered"
        );

        let liquidation_driven = triggers.iter().any(|t| t.kind == TriggerKind::Liquidation);
        let order = if liquidation_driven {
            ExitOrder {
                symbol: position.symbol.clone(),
                side: position.side.closing(),
                order_type: ExitOrderType::Market,
                quantity: position.quantity.abs(),
                stop_price: None,
                reduce_only: true,
            }
        } else {
            let stop_price = if position.side.is_long() {
                mark_price * (Decimal::ONE - STOP_OFFSET)
            } else {
                mark_price * (Decimal::ONE + STOP_OFFSET)
            };
            ExitOrder {
                symbol: position.symbol.clone(),
                side: position.side.closing(),
                order_type: ExitOrderType::StopMarket,
                quantity: position.quantity.abs(),
                stop_price: Some(stop_price),
                reduce_only: true,
            }
        };

        let ack = match self.gateway.place_exit_order(order).await {
            Ok(ack) => ack,
            Err(e) => {
                warn!(
                    symbol = %position.symbol,
                    error = %e,
                    "Exit order failed, position kept for retry"
                );
                return;
            }
        };
        info!(
            symbol = %position.symbol,
            exit_order = %ack.order_id,
            pnl = %position.unrealized_pnl,
            "Exit order accepted"
        );

        let tripped = {
            let mut state = self.state.lock().await;
            state.ledger.remove(&entry_order_id);

            if position.unrealized_pnl < Decimal::ZERO {
                state.account.consecutive_losses += 1;
                state.stats.losses += 1;
            } else {
                state.account.consecutive_losses = 0;
                state.stats.wins += 1;
            }

            if state.account.consecutive_losses >= self.params.max_consecutive_losses
                && !state.account.circuit_breaker_active
            {
                state.account.circuit_breaker_active = true;
                state.account.risk_level = RiskLevel::Emergency;
                let consecutive_losses = state.account.consecutive_losses;
                let daily_pnl = state.account.daily_pnl;
                let drained: Vec<(String, PositionRisk)> = state.ledger.drain().collect();
                state.audit.push(AuditRecord {
                    at: Utc::now(),
                    event: AuditEvent::CircuitBreakerTripped,
                    reason: "Maximum consecutive losses exceeded".to_string(),
                    consecutive_losses,
                    positions_closed: drained.len(),
                    daily_pnl,
                });
                Some(drained)
            } else {
                None
            }
        };

        if let Some(drained) = tripped {
            error!(
                consecutive_losses = self.params.max_consecutive_losses,
                flattening = drained.len(),
                "CIRCUIT BREAKER ACTIVATED"
            );
            self.close_all(&drained, ExitOrderType::Market).await;
        }
    }

    /// Refreshes account-level risk from a fresh exchange snapshot.
    pub(super) async fn refresh_account_risk(&self) -> crate::gateway::Result<()> {
        let snapshot = self.gateway.account_snapshot().await?;

        let mut state = self.state.lock().await;
        state.account.total_balance = snapshot.total_balance;
        state.account.available_balance = snapshot.available_balance;
        state.account.total_unrealized_pnl = snapshot.unrealized_pnl;

        let current = snapshot.total_balance + snapshot.unrealized_pnl;
        state.account.daily_pnl = current - state.stats.start_balance;
        state.stats.total_pnl = state.account.daily_pnl;

        let drawdown = state.account.daily_pnl.min(Decimal::ZERO);
        state.stats.max_drawdown = state.stats.max_drawdown.min(drawdown);

        let loss_ratio = if state.account.total_balance > Decimal::ZERO {
            (state.account.daily_pnl / state.account.total_balance).abs()
        } else {
            Decimal::ZERO
        };
        state.account.risk_level = account_risk_level(
            state.account.circuit_breaker_active,
            loss_ratio,
            self.params.daily_loss_limit,
            state.account.consecutive_losses,
        );
        Ok(())
    }
}
