//! Shared mutable engine state, serialized by a single async mutex.

use super::position::{AccountRisk, PositionRisk};
use super::slippage::SlippageTracker;
use super::stats::DailyStats;
use crate::domain::FundingSnapshot;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;

/// Audit event kinds recorded for policy actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEvent {
    CircuitBreakerTripped,
    EmergencyStop,
}

/// One append-only audit record for a trip or an emergency stop.
#[derive(Debug, Clone, Serialize)]
pub struct AuditRecord {
    pub at: DateTime<Utc>,
    pub event: AuditEvent,
    pub reason: String,
    pub consecutive_losses: u32,
    pub positions_closed: usize,
    pub daily_pnl: Decimal,
}

/// All mutable engine state.
///
/// Every field is owned here and only touched while holding the engine's
/// mutex. The lock is never held across a gateway call; callers read or
/// mutate, drop the guard, await I/O, then re-acquire to apply results.
pub struct EngineState {
    /// Open positions keyed by entry order id.
    pub ledger: HashMap<String, PositionRisk>,
    pub account: AccountRisk,
    pub stats: DailyStats,
    /// Funding schedule cache keyed by symbol, refreshed periodically.
    pub funding: HashMap<String, FundingSnapshot>,
    pub slippage: SlippageTracker,
    /// Global kill switch, checked at gate and loop boundaries only.
    pub emergency_stop: bool,
    pub audit: Vec<AuditRecord>,
}

impl EngineState {
    pub fn new(account: AccountRisk, stats: DailyStats) -> Self {
        EngineState {
            ledger: HashMap::new(),
            account,
            stats,
            funding: HashMap::new(),
            slippage: SlippageTracker::default(),
            emergency_stop: false,
            audit: Vec::new(),
        }
    }

    /// Replaces the funding cache with a fresh schedule.
    pub fn apply_funding(&mut self, schedule: Vec<FundingSnapshot>, now: DateTime<Utc>) {
        self.funding = schedule
            .into_iter()
            .map(|f| (f.symbol.clone(), f))
            .collect();
        self.account.last_funding_check = now;
    }

    /// Earliest upcoming funding settlement across cached symbols.
    pub fn next_funding_time(&self) -> Option<DateTime<Utc>> {
        self.funding.values().map(|f| f.next_funding_time).min()
    }
}
