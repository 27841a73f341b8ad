//! Tests for the risk engine.

use super::*;
use crate::domain::{
    AccountSnapshot, EntryCandidate, ExitOrder, FundingSnapshot, OrderAck, Orderbook, OrderSide,
    PositionSnapshot, PriceLevel, SymbolMeta,
};
use crate::gateway::{ExchangeGateway, GatewayError, SimulatedGateway};
use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::SystemTime;

fn btc_marks() -> HashMap<String, Decimal> {
    HashMap::from([
        ("BTCUSDT".to_string(), dec!(50000)),
        ("ETHUSDT".to_string(), dec!(3000)),
    ])
}

async fn engine_with_balance(balance: Decimal) -> (Arc<SimulatedGateway>, RiskEngine) {
    let gw = Arc::new(SimulatedGateway::new(balance, btc_marks()));
    let engine = RiskEngine::connect(gw.clone(), RiskParameters::default())
        .await
        .unwrap();
    (gw, engine)
}

fn btc_long(leverage: Decimal) -> EntryCandidate {
    EntryCandidate {
        symbol: "BTCUSDT".to_string(),
        side: OrderSide::Buy,
        quantity: dec!(0.01),
        leverage,
        price: Some(dec!(50000)),
    }
}

fn book(bids: &[(Decimal, Decimal)], asks: &[(Decimal, Decimal)]) -> Orderbook {
    Orderbook {
        symbol: "BTCUSDT".to_string(),
        bids: bids
            .iter()
            .map(|&(price, size)| PriceLevel { price, size })
            .collect(),
        asks: asks
            .iter()
            .map(|&(price, size)| PriceLevel { price, size })
            .collect(),
        timestamp: SystemTime::now(),
    }
}

/// Gateway wrapper that fails selected calls, for fallback and retry tests.
struct FlakyGateway {
    inner: SimulatedGateway,
    fail_meta: bool,
    fail_positions: bool,
    fail_exits: bool,
}

impl FlakyGateway {
    fn new(fail_meta: bool, fail_positions: bool, fail_exits: bool) -> Self {
        FlakyGateway {
            inner: SimulatedGateway::new(dec!(10000), btc_marks()),
            fail_meta,
            fail_positions,
            fail_exits,
        }
    }
}

#[async_trait]
impl ExchangeGateway for FlakyGateway {
    async fn account_snapshot(&self) -> crate::gateway::Result<AccountSnapshot> {
        self.inner.account_snapshot().await
    }

    async fn position_snapshots(&self) -> crate::gateway::Result<Vec<PositionSnapshot>> {
        if self.fail_positions {
            return Err(GatewayError::Connection("position feed down".into()));
        }
        self.inner.position_snapshots().await
    }

    async fn order_book(&self, symbol: &str) -> crate::gateway::Result<Orderbook> {
        self.inner.order_book(symbol).await
    }

    async fn mark_price(&self, symbol: &str) -> crate::gateway::Result<Decimal> {
        self.inner.mark_price(symbol).await
    }

    async fn funding_schedule(&self) -> crate::gateway::Result<Vec<FundingSnapshot>> {
        self.inner.funding_schedule().await
    }

    async fn symbol_meta(&self, symbol: &str) -> crate::gateway::Result<SymbolMeta> {
        if self.fail_meta {
            return Err(GatewayError::Api("exchange info unavailable".into()));
        }
        self.inner.symbol_meta(symbol).await
    }

    async fn place_exit_order(&self, order: ExitOrder) -> crate::gateway::Result<OrderAck> {
        if self.fail_exits {
            return Err(GatewayError::OrderRejected("order gateway down".into()));
        }
        self.inner.place_exit_order(order).await
    }

    fn name(&self) -> &str {
        "flaky"
    }
}

// ==================== Liquidation calculator ====================

#[test]
fn test_liquidation_price_long() {
    let price = liquidation::liquidation_price(OrderSide::Buy, dec!(50000), dec!(10), dec!(0.004));
    assert_eq!(price, dec!(45200));
}

#[test]
fn test_liquidation_price_short() {
    let price = liquidation::liquidation_price(OrderSide::Sell, dec!(50000), dec!(10), dec!(0.004));
    assert_eq!(price, dec!(54800));
}

#[test]
fn test_liquidation_monotonic_in_leverage() {
    // Higher leverage pulls the liquidation price closer to entry.
    let entry = dec!(50000);
    let low = liquidation::liquidation_price(OrderSide::Buy, entry, dec!(3), dec!(0.004));
    let high = liquidation::liquidation_price(OrderSide::Buy, entry, dec!(10), dec!(0.004));
    assert!((entry - high).abs() < (entry - low).abs());

    let low = liquidation::liquidation_price(OrderSide::Sell, entry, dec!(3), dec!(0.004));
    let high = liquidation::liquidation_price(OrderSide::Sell, entry, dec!(10), dec!(0.004));
    assert!((high - entry).abs() < (low - entry).abs());
}

#[test]
fn test_liquidation_fallback_prices() {
    assert_eq!(
        liquidation::fallback_liquidation_price(OrderSide::Buy, dec!(50000)),
        dec!(45000)
    );
    assert_eq!(
        liquidation::fallback_liquidation_price(OrderSide::Sell, dec!(50000)),
        dec!(55000)
    );
}

#[test]
fn test_liquidation_zero_leverage_uses_fallback() {
    // Degenerate leverage must degrade, never divide by zero.
    let long = liquidation::liquidation_price(OrderSide::Buy, dec!(50000), Decimal::ZERO, dec!(0.004));
    assert_eq!(long, dec!(45000));
    let short = liquidation::liquidation_price(OrderSide::Sell, dec!(50000), dec!(-1), dec!(0.004));
    assert_eq!(short, dec!(55000));
}

#[test]
fn test_liquidation_distance_degenerate_price() {
    assert_eq!(
        liquidation::liquidation_distance(dec!(45200), Decimal::ZERO),
        Decimal::ZERO
    );
}

// ==================== Slippage estimator ====================

#[test]
fn test_slippage_walks_the_ladder() {
    // Mid is 100; buying 1.0 fills 0.5 @ 101 and 0.5 @ 102, avg 101.5.
    let book = book(&[(dec!(99), dec!(5))], &[(dec!(101), dec!(0.5)), (dec!(102), dec!(10))]);
    let bps = slippage::estimate_bps(OrderSide::Buy, dec!(1), &book, dec!(1));
    assert_eq!(bps, dec!(150));
}

#[test]
fn test_slippage_applies_adjustment() {
    let book = book(&[(dec!(99), dec!(5))], &[(dec!(101), dec!(10))]);
    let raw = slippage::estimate_bps(OrderSide::Buy, dec!(1), &book, dec!(1));
    let adjusted = slippage::estimate_bps(OrderSide::Buy, dec!(1), &book, dec!(1.2));
    assert_eq!(adjusted, raw * dec!(1.2));
}

#[test]
fn test_slippage_sell_walks_bids() {
    let book = book(&[(dec!(99), dec!(10))], &[(dec!(101), dec!(10))]);
    let bps = slippage::estimate_bps(OrderSide::Sell, dec!(1), &book, dec!(1));
    // Mid 100, fill at 99: 1% = 100 bps.
    assert_eq!(bps, dec!(100));
}

#[test]
fn test_slippage_zero_quantity_falls_back() {
    let book = book(&[(dec!(99), dec!(5))], &[(dec!(101), dec!(5))]);
    let bps = slippage::estimate_bps(OrderSide::Buy, Decimal::ZERO, &book, dec!(1.2));
    assert_eq!(bps, slippage::FALLBACK_SLIPPAGE_BPS);
}

#[test]
fn test_slippage_empty_book_falls_back() {
    let book = book(&[], &[]);
    let bps = slippage::estimate_bps(OrderSide::Buy, dec!(1), &book, dec!(1.2));
    assert_eq!(bps, slippage::FALLBACK_SLIPPAGE_BPS);
}

#[test]
fn test_slippage_history_truncates() {
    let mut tracker = slippage::SlippageTracker::default();
    for i in 0..101 {
        tracker.record("BTCUSDT", Decimal::from(i));
    }
    let history = tracker.history("BTCUSDT");
    assert_eq!(history.len(), 50);
    // Only the most recent estimates survive.
    assert_eq!(history[0], Decimal::from(51));
    assert_eq!(history[49], Decimal::from(100));
}

// ==================== Funding assessor ====================

#[test]
fn test_funding_long_paying_critical() {
    let a = funding::assess(Some(dec!(0.02)), OrderSide::Buy, dec!(0.01));
    assert_eq!(a.level, RiskLevel::Critical);
}

#[test]
fn test_funding_long_paying_high() {
    let a = funding::assess(Some(dec!(0.006)), OrderSide::Buy, dec!(0.01));
    assert_eq!(a.level, RiskLevel::High);
}

#[test]
fn test_funding_long_paying_low() {
    let a = funding::assess(Some(dec!(0.004)), OrderSide::Buy, dec!(0.01));
    assert_eq!(a.level, RiskLevel::Low);
}

#[test]
fn test_funding_receiving_side_is_low() {
    // A short with a positive rate receives funding, whatever the magnitude.
    let a = funding::assess(Some(dec!(0.05)), OrderSide::Sell, dec!(0.01));
    assert_eq!(a.level, RiskLevel::Low);
}

#[test]
fn test_funding_short_paying_negative_rate() {
    let a = funding::assess(Some(dec!(-0.02)), OrderSide::Sell, dec!(0.01));
    assert_eq!(a.level, RiskLevel::Critical);
}

#[test]
fn test_funding_missing_data_is_low() {
    let a = funding::assess(None, OrderSide::Buy, dec!(0.01));
    assert_eq!(a.level, RiskLevel::Low);
    assert_eq!(a.message, "No funding data");
}

// ==================== Risk-level classification ====================

#[test]
fn test_position_risk_levels() {
    assert_eq!(position_risk_level(dec!(0.05), dec!(0.2)), RiskLevel::Critical);
    assert_eq!(position_risk_level(dec!(0.5), dec!(0.95)), RiskLevel::Critical);
    assert_eq!(position_risk_level(dec!(0.15), dec!(0.2)), RiskLevel::High);
    assert_eq!(position_risk_level(dec!(0.25), dec!(0.2)), RiskLevel::Moderate);
    assert_eq!(position_risk_level(dec!(0.35), dec!(0.2)), RiskLevel::Low);
}

#[test]
fn test_account_risk_levels() {
    let limit = dec!(0.05);
    assert_eq!(
        account_risk_level(true, Decimal::ZERO, limit, 0),
        RiskLevel::Emergency
    );
    assert_eq!(
        account_risk_level(false, dec!(0.045), limit, 0),
        RiskLevel::Critical
    );
    assert_eq!(
        account_risk_level(false, dec!(0.035), limit, 0),
        RiskLevel::High
    );
    assert_eq!(
        account_risk_level(false, dec!(0.01), limit, 4),
        RiskLevel::Moderate
    );
    assert_eq!(
        account_risk_level(false, dec!(0.01), limit, 2),
        RiskLevel::Low
    );
}

// ==================== Exit triggers ====================

fn open_position(time_held: i64, margin_ratio: Decimal) -> PositionRisk {
    let mut position = PositionRisk::new(
        "BTCUSDT".to_string(),
        OrderSide::Buy,
        dec!(0.01),
        dec!(50000),
        dec!(3),
        dec!(33533),
    );
    position.time_held = time_held;
    position.margin_ratio = margin_ratio;
    position
}

#[test]
fn test_hold_time_trigger() {
    let position = open_position(301, dec!(0.1));
    let triggers = exit::evaluate_exit_triggers(
        &position,
        dec!(0.5),
        None,
        &RiskParameters::default(),
        Utc::now(),
    );
    assert_eq!(triggers.len(), 1);
    assert!(triggers[0].message.contains("held too long"));
}

#[test]
fn test_margin_and_liquidation_triggers_combine() {
    let position = open_position(10, dec!(0.85));
    let triggers = exit::evaluate_exit_triggers(
        &position,
        dec!(0.05),
        None,
        &RiskParameters::default(),
        Utc::now(),
    );
    let kinds: Vec<_> = triggers.iter().map(|t| t.kind).collect();
    assert!(kinds.contains(&exit::TriggerKind::Liquidation));
    assert!(kinds.contains(&exit::TriggerKind::Margin));
}

#[test]
fn test_funding_proximity_trigger() {
    let position = open_position(10, dec!(0.1));
    let now = Utc::now();
    let soon = FundingSnapshot {
        symbol: "BTCUSDT".to_string(),
        rate: dec!(0.02),
        next_funding_time: now + ChronoDuration::seconds(100),
    };
    let triggers = exit::evaluate_exit_triggers(
        &position,
        dec!(0.5),
        Some(&soon),
        &RiskParameters::default(),
        now,
    );
    assert_eq!(triggers.len(), 1);
    assert!(triggers[0].message.contains("funding rate approaching"));

    // Same timing but a benign rate: no trigger.
    let mild = FundingSnapshot {
        rate: dec!(0.005),
        ..soon
    };
    let triggers = exit::evaluate_exit_triggers(
        &position,
        dec!(0.5),
        Some(&mild),
        &RiskParameters::default(),
        now,
    );
    assert!(triggers.is_empty());
}

// ==================== Entry validation scenarios ====================

#[tokio::test]
async fn test_reject_too_close_to_liquidation() {
    // 10x long at 50000 with maintenance 0.004: liquidation ~45200,
    // distance ~9.6% against a 15% buffer.
    let (_gw, engine) = engine_with_balance(dec!(10000)).await;
    let decision = engine.validate_entry(&btc_long(dec!(10))).await;
    assert!(!decision.accepted);
    assert!(decision.reason.contains("Too close to liquidation"));
}

#[tokio::test]
async fn test_accept_low_leverage_entry() {
    // Same setup at 3x: liquidation ~33533, distance ~32.9%.
    let (_gw, engine) = engine_with_balance(dec!(10000)).await;
    let decision = engine.validate_entry(&btc_long(dec!(3))).await;
    assert!(decision.accepted, "rejected: {}", decision.reason);

    let metrics = decision.metrics.unwrap();
    assert!(metrics.liquidation_price > dec!(33533) && metrics.liquidation_price < dec!(33534));
    assert!(metrics.liquidation_distance >= engine.params().liquidation_buffer);
    assert_eq!(metrics.position_value, dec!(500));
    assert!(metrics.expected_slippage_bps <= engine.params().max_slippage_bps);
    assert_eq!(metrics.funding_risk, RiskLevel::Low);
}

#[tokio::test]
async fn test_reject_excess_leverage() {
    let (_gw, engine) = engine_with_balance(dec!(10000)).await;
    let decision = engine.validate_entry(&btc_long(dec!(12))).await;
    assert!(!decision.accepted);
    assert!(decision.reason.contains("exceeds maximum"));
}

#[tokio::test]
async fn test_reject_oversized_position() {
    let (_gw, engine) = engine_with_balance(dec!(10000)).await;
    let candidate = EntryCandidate {
        quantity: dec!(1),
        ..btc_long(dec!(3))
    };
    let decision = engine.validate_entry(&candidate).await;
    assert!(!decision.accepted);
    assert!(decision.reason.contains("Position size"));
}

#[tokio::test]
async fn test_reject_max_concurrent_positions() {
    let (_gw, engine) = engine_with_balance(dec!(10000)).await;
    for i in 0..3 {
        engine
            .register_position(
                "BTCUSDT",
                OrderSide::Buy,
                dec!(0.01),
                dec!(50000),
                dec!(3),
                &format!("order-{}", i),
            )
            .await;
    }
    assert_eq!(engine.open_position_count().await, 3);

    let decision = engine.validate_entry(&btc_long(dec!(3))).await;
    assert!(!decision.accepted);
    assert!(decision.reason.contains("Maximum concurrent positions"));
}

#[tokio::test]
async fn test_reject_daily_loss_limit() {
    // Balance drops from 10000 to 9450: daily PnL -550 against a -500 floor.
    let (gw, engine) = engine_with_balance(dec!(10000)).await;
    gw.set_account(AccountSnapshot {
        total_balance: dec!(9450),
        available_balance: dec!(9450),
        unrealized_pnl: Decimal::ZERO,
    })
    .await;
    engine.update_positions().await.unwrap();

    let decision = engine.validate_entry(&btc_long(dec!(3))).await;
    assert!(!decision.accepted);
    assert!(decision.reason.contains("Daily loss limit reached"));
}

#[tokio::test]
async fn test_reject_critical_funding() {
    let (gw, engine) = engine_with_balance(dec!(10000)).await;
    gw.set_funding(vec![FundingSnapshot {
        symbol: "BTCUSDT".to_string(),
        rate: dec!(0.02),
        next_funding_time: Utc::now() + ChronoDuration::hours(8),
    }])
    .await;
    engine.refresh_funding().await.unwrap();

    let decision = engine.validate_entry(&btc_long(dec!(3))).await;
    assert!(!decision.accepted);
    assert!(decision.reason.contains("High funding rate risk"));
}

#[tokio::test]
async fn test_rejection_has_no_metrics() {
    let (_gw, engine) = engine_with_balance(dec!(10000)).await;
    let decision = engine.validate_entry(&btc_long(dec!(12))).await;
    assert!(decision.metrics.is_none());
}

#[tokio::test]
async fn test_meta_failure_uses_fallback_liquidation() {
    let gw = Arc::new(FlakyGateway::new(true, false, false));
    let engine = RiskEngine::connect(gw, RiskParameters::default())
        .await
        .unwrap();
    engine
        .register_position("BTCUSDT", OrderSide::Buy, dec!(0.01), dec!(50000), dec!(3), "f-1")
        .await;

    let summary = engine.get_risk_summary().await;
    assert_eq!(summary.positions.details[0].liquidation_price, dec!(45000));
}

#[tokio::test]
async fn test_register_zero_leverage_uses_fallback() {
    let (_gw, engine) = engine_with_balance(dec!(10000)).await;
    engine
        .register_position("BTCUSDT", OrderSide::Buy, dec!(0.01), dec!(50000), Decimal::ZERO, "z-1")
        .await;

    let summary = engine.get_risk_summary().await;
    assert_eq!(summary.positions.details[0].liquidation_price, dec!(45000));
}

// ==================== Position lifecycle ====================

#[tokio::test]
async fn test_update_refreshes_position_metrics() {
    let (gw, engine) = engine_with_balance(dec!(10000)).await;
    engine
        .register_position("BTCUSDT", OrderSide::Buy, dec!(0.01), dec!(50000), dec!(3), "p-1")
        .await;
    gw.set_positions(vec![PositionSnapshot {
        symbol: "BTCUSDT".to_string(),
        unrealized_pnl: dec!(-5),
        margin_ratio: dec!(0.6),
        mark_price: dec!(49000),
    }])
    .await;

    engine.update_positions().await.unwrap();

    let summary = engine.get_risk_summary().await;
    assert_eq!(summary.positions.count, 1);
    let detail = &summary.positions.details[0];
    assert_eq!(detail.unrealized_pnl, dec!(-5));
    // Distance ~31.6% but 60% margin consumed: Moderate.
    assert_eq!(detail.risk_level, RiskLevel::Moderate);
}

#[tokio::test]
async fn test_margin_exhaustion_exits_position() {
    let (gw, engine) = engine_with_balance(dec!(10000)).await;
    engine
        .register_position("BTCUSDT", OrderSide::Buy, dec!(0.01), dec!(50000), dec!(3), "p-1")
        .await;
    gw.set_positions(vec![PositionSnapshot {
        symbol: "BTCUSDT".to_string(),
        unrealized_pnl: dec!(4),
        margin_ratio: dec!(0.85),
        mark_price: dec!(50000),
    }])
    .await;

    engine.update_positions().await.unwrap();

    // Exited and classified as a win: streak stays at zero.
    let summary = engine.get_risk_summary().await;
    assert_eq!(summary.positions.count, 0);
    assert_eq!(summary.daily_stats.wins, 1);
    assert_eq!(summary.account_risk.consecutive_losses, 0);
}

#[tokio::test]
async fn test_missing_snapshot_keeps_position() {
    let (gw, engine) = engine_with_balance(dec!(10000)).await;
    engine
        .register_position("BTCUSDT", OrderSide::Buy, dec!(0.01), dec!(50000), dec!(3), "p-1")
        .await;
    // Snapshot for a different symbol only.
    gw.set_positions(vec![PositionSnapshot {
        symbol: "ETHUSDT".to_string(),
        unrealized_pnl: Decimal::ZERO,
        margin_ratio: dec!(0.1),
        mark_price: dec!(3000),
    }])
    .await;

    engine.update_positions().await.unwrap();
    assert_eq!(engine.open_position_count().await, 1);
}

#[tokio::test]
async fn test_position_feed_failure_is_transient() {
    let gw = Arc::new(FlakyGateway::new(false, true, false));
    let engine = RiskEngine::connect(gw, RiskParameters::default())
        .await
        .unwrap();
    engine
        .register_position("BTCUSDT", OrderSide::Buy, dec!(0.01), dec!(50000), dec!(3), "p-1")
        .await;

    let result = engine.update_positions().await;
    assert!(result.is_err());
    // No state corruption: the position is still tracked.
    assert_eq!(engine.open_position_count().await, 1);
}

#[tokio::test]
async fn test_failed_exit_does_not_accumulate_reasons() {
    let gw = Arc::new(FlakyGateway::new(false, false, true));
    let engine = RiskEngine::connect(gw.clone(), RiskParameters::default())
        .await
        .unwrap();
    engine
        .register_position("BTCUSDT", OrderSide::Buy, dec!(0.01), dec!(50000), dec!(3), "p-1")
        .await;
    gw.inner
        .set_positions(vec![PositionSnapshot {
            symbol: "BTCUSDT".to_string(),
            unrealized_pnl: dec!(-5),
            margin_ratio: dec!(0.85),
            mark_price: dec!(50000),
        }])
        .await;

    // Every cycle triggers an exit that the gateway refuses.
    for _ in 0..3 {
        engine.update_positions().await.unwrap();
    }

    assert_eq!(engine.open_position_count().await, 1);
    let state = engine.state.lock().await;
    let position = state.ledger.get("p-1").unwrap();
    assert!(position.exit_reasons.is_empty());
}

#[tokio::test]
async fn test_daily_pnl_and_drawdown_tracking() {
    let (gw, engine) = engine_with_balance(dec!(10000)).await;

    gw.set_account(AccountSnapshot {
        total_balance: dec!(10200),
        available_balance: dec!(10200),
        unrealized_pnl: Decimal::ZERO,
    })
    .await;
    engine.update_positions().await.unwrap();
    let summary = engine.get_risk_summary().await;
    assert_eq!(summary.account_risk.daily_pnl, dec!(200));
    assert_eq!(summary.daily_stats.max_drawdown, Decimal::ZERO);

    gw.set_account(AccountSnapshot {
        total_balance: dec!(9900),
        available_balance: dec!(9900),
        unrealized_pnl: Decimal::ZERO,
    })
    .await;
    engine.update_positions().await.unwrap();
    let summary = engine.get_risk_summary().await;
    assert_eq!(summary.account_risk.daily_pnl, dec!(-100));
    assert_eq!(summary.daily_stats.max_drawdown, dec!(-100));
    assert_eq!(summary.daily_stats.total_pnl, dec!(-100));
}

// ==================== Circuit breaker ====================

async fn losing_close(gw: &SimulatedGateway, engine: &RiskEngine, order_id: &str) {
    engine
        .register_position("BTCUSDT", OrderSide::Buy, dec!(0.01), dec!(50000), dec!(3), order_id)
        .await;
    gw.set_positions(vec![PositionSnapshot {
        symbol: "BTCUSDT".to_string(),
        unrealized_pnl: dec!(-10),
        margin_ratio: dec!(0.85),
        mark_price: dec!(50000),
    }])
    .await;
    engine.update_positions().await.unwrap();
}

#[tokio::test]
async fn test_circuit_breaker_trips_after_consecutive_losses() {
    let (gw, engine) = engine_with_balance(dec!(10000)).await;
    for i in 0..5 {
        losing_close(&gw, &engine, &format!("loss-{}", i)).await;
    }

    let summary = engine.get_risk_summary().await;
    assert!(summary.account_risk.circuit_breaker);
    assert_eq!(summary.account_risk.consecutive_losses, 5);
    assert_eq!(summary.account_risk.risk_level, RiskLevel::Emergency);
    assert_eq!(summary.positions.count, 0);

    let decision = engine.validate_entry(&btc_long(dec!(3))).await;
    assert!(!decision.accepted);
    assert!(decision.reason.contains("Circuit breaker active"));

    let audit = engine.audit_log().await;
    assert_eq!(audit.len(), 1);
    assert_eq!(audit[0].event, AuditEvent::CircuitBreakerTripped);
    assert_eq!(audit[0].consecutive_losses, 5);
    assert_eq!(audit[0].positions_closed, 0);
}

#[tokio::test]
async fn test_circuit_breaker_flattens_remaining_positions() {
    let (gw, engine) = engine_with_balance(dec!(10000)).await;
    // A healthy position on another symbol stays open through the streak.
    engine
        .register_position("ETHUSDT", OrderSide::Buy, dec!(0.1), dec!(3000), dec!(3), "eth-1")
        .await;

    for i in 0..5 {
        engine
            .register_position("BTCUSDT", OrderSide::Buy, dec!(0.01), dec!(50000), dec!(3), &format!("loss-{}", i))
            .await;
        gw.set_positions(vec![
            PositionSnapshot {
                symbol: "BTCUSDT".to_string(),
                unrealized_pnl: dec!(-10),
                margin_ratio: dec!(0.85),
                mark_price: dec!(50000),
            },
            PositionSnapshot {
                symbol: "ETHUSDT".to_string(),
                unrealized_pnl: dec!(2),
                margin_ratio: dec!(0.1),
                mark_price: dec!(3000),
            },
        ])
        .await;
        engine.update_positions().await.unwrap();
    }

    // The fifth loss tripped the breaker and flattened the ETH position too.
    let summary = engine.get_risk_summary().await;
    assert!(summary.account_risk.circuit_breaker);
    assert_eq!(summary.positions.count, 0);

    let audit = engine.audit_log().await;
    assert_eq!(audit[0].positions_closed, 1);
}

#[tokio::test]
async fn test_win_resets_losing_streak() {
    let (gw, engine) = engine_with_balance(dec!(10000)).await;
    for i in 0..3 {
        losing_close(&gw, &engine, &format!("loss-{}", i)).await;
    }
    assert_eq!(
        engine.get_risk_summary().await.account_risk.consecutive_losses,
        3
    );

    engine
        .register_position("BTCUSDT", OrderSide::Buy, dec!(0.01), dec!(50000), dec!(3), "win-1")
        .await;
    gw.set_positions(vec![PositionSnapshot {
        symbol: "BTCUSDT".to_string(),
        unrealized_pnl: dec!(8),
        margin_ratio: dec!(0.85),
        mark_price: dec!(50000),
    }])
    .await;
    engine.update_positions().await.unwrap();

    let summary = engine.get_risk_summary().await;
    assert_eq!(summary.account_risk.consecutive_losses, 0);
    assert!(!summary.account_risk.circuit_breaker);
}

// ==================== Emergency stop ====================

#[tokio::test]
async fn test_emergency_stop_flattens_and_blocks() {
    let (_gw, engine) = engine_with_balance(dec!(10000)).await;
    engine
        .register_position("BTCUSDT", OrderSide::Buy, dec!(0.01), dec!(50000), dec!(3), "p-1")
        .await;

    engine.emergency_stop_all("test").await;

    assert_eq!(engine.open_position_count().await, 0);
    assert!(engine.is_emergency_stopped().await);

    let decision = engine.validate_entry(&btc_long(dec!(3))).await;
    assert!(!decision.accepted);
    assert_eq!(decision.reason, "Emergency stop active");

    let audit = engine.audit_log().await;
    assert_eq!(audit.len(), 1);
    assert_eq!(audit[0].event, AuditEvent::EmergencyStop);
    assert_eq!(audit[0].reason, "test");
    assert_eq!(audit[0].positions_closed, 1);

    engine.reset_emergency_stop().await;
    let decision = engine.validate_entry(&btc_long(dec!(3))).await;
    assert!(decision.accepted, "rejected: {}", decision.reason);
}

#[tokio::test]
async fn test_reset_emergency_stop_is_idempotent() {
    let (_gw, engine) = engine_with_balance(dec!(10000)).await;
    engine.reset_emergency_stop().await;
    engine.reset_emergency_stop().await;
    assert!(!engine.is_emergency_stopped().await);
}

// ==================== Daily rotation ====================

#[tokio::test]
async fn test_daily_rotation_clears_circuit_breaker() {
    let (gw, engine) = engine_with_balance(dec!(10000)).await;
    for i in 0..5 {
        losing_close(&gw, &engine, &format!("loss-{}", i)).await;
    }
    assert!(engine.get_risk_summary().await.account_risk.circuit_breaker);

    // Force the last reset date into the past.
    {
        let mut state = engine.state.lock().await;
        state.stats.last_reset = Utc::now().date_naive() - ChronoDuration::days(1);
    }
    let rotated = engine.maybe_rotate_daily_stats().await.unwrap();
    assert!(rotated);

    let summary = engine.get_risk_summary().await;
    assert!(!summary.account_risk.circuit_breaker);
    assert_eq!(summary.account_risk.consecutive_losses, 0);
    assert_eq!(summary.account_risk.risk_level, RiskLevel::Low);
    assert_eq!(summary.daily_stats.trades, 0);
    assert_eq!(summary.daily_stats.losses, 0);
}

#[tokio::test]
async fn test_rotation_is_noop_same_day() {
    let (_gw, engine) = engine_with_balance(dec!(10000)).await;
    assert!(!engine.maybe_rotate_daily_stats().await.unwrap());
}

// ==================== Risk summary ====================

#[tokio::test]
async fn test_summary_stable_without_mutation() {
    let (gw, engine) = engine_with_balance(dec!(10000)).await;
    engine
        .register_position("BTCUSDT", OrderSide::Buy, dec!(0.01), dec!(50000), dec!(3), "p-1")
        .await;
    gw.set_positions(vec![PositionSnapshot {
        symbol: "BTCUSDT".to_string(),
        unrealized_pnl: dec!(1),
        margin_ratio: dec!(0.2),
        mark_price: dec!(50000),
    }])
    .await;
    engine.update_positions().await.unwrap();

    let first = serde_json::to_value(engine.get_risk_summary().await).unwrap();
    let second = serde_json::to_value(engine.get_risk_summary().await).unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_summary_serializes_to_json() {
    let (_gw, engine) = engine_with_balance(dec!(10000)).await;
    let summary = engine.get_risk_summary().await;
    let json = serde_json::to_string(&summary).unwrap();
    assert!(json.contains("\"account_risk\""));
    assert!(json.contains("\"risk_parameters\""));
}
