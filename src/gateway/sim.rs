//! In-memory simulated gateway for dry runs.

use super::{ExchangeGateway, GatewayError, Result};
use crate::domain::{
    AccountSnapshot, ExitOrder, FundingSnapshot, OrderAck, Orderbook, OrderStatus, PositionSnapshot,
    PriceLevel, SymbolMeta,
};
use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::SystemTime;
use tokio::sync::Mutex;

/// SimulatedGateway serves static market data and accepts every exit order.
///
/// Used by the binary's dry-run mode and by engine tests as a base to build
/// on. It never fails unless asked about an unknown symbol.
pub struct SimulatedGateway {
    account: Mutex<AccountSnapshot>,
    positions: Mutex<Vec<PositionSnapshot>>,
    marks: HashMap<String, Decimal>,
    funding: Mutex<Vec<FundingSnapshot>>,
    order_seq: AtomicU64,
}

impl SimulatedGateway {
    /// Creates a gateway with the given balance and per-symbol mark prices.
    pub fn new(balance: Decimal, marks: HashMap<String, Decimal>) -> Self {
        let funding = marks
            .keys()
            .map(|symbol| FundingSnapshot {
                symbol: symbol.clone(),
                rate: Decimal::ZERO,
                next_funding_time: Utc::now() + ChronoDuration::hours(8),
            })
            .collect();

        SimulatedGateway {
            account: Mutex::new(AccountSnapshot {
                total_balance: balance,
                available_balance: balance,
                unrealized_pnl: Decimal::ZERO,
            }),
            positions: Mutex::new(Vec::new()),
            marks,
            funding: Mutex::new(funding),
            order_seq: AtomicU64::new(1),
        }
    }

    /// Replaces the account snapshot returned by subsequent calls.
    pub async fn set_account(&self, account: AccountSnapshot) {
        *self.account.lock().await = account;
    }

    /// Replaces the open-position snapshots returned by subsequent calls.
    pub async fn set_positions(&self, positions: Vec<PositionSnapshot>) {
        *self.positions.lock().await = positions;
    }

    /// Replaces the funding schedule returned by subsequent calls.
    pub async fn set_funding(&self, funding: Vec<FundingSnapshot>) {
        *self.funding.lock().await = funding;
    }

    fn mark_for(&self, symbol: &str) -> Result<Decimal> {
        self.marks
            .get(symbol)
            .copied()
            .ok_or_else(|| GatewayError::SymbolNotSupported(symbol.to_string()))
    }

    /// Builds a symmetric 20-level book around the mark with deep liquidity.
    fn book_around(&self, symbol: &str, mark: Decimal) -> Orderbook {
        let tick = mark * dec!(0.0001);
        let size = dec!(50);
        let mut bids = Vec::with_capacity(20);
        let mut asks = Vec::with_capacity(20);
        for i in 1..=20u32 {
            let offset = tick * Decimal::from(i);
            bids.push(PriceLevel {
                price: mark - offset,
                size,
            });
            asks.push(PriceLevel {
                price: mark + offset,
                size,
            });
        }
        Orderbook {
            symbol: symbol.to_string(),
            bids,
            asks,
            timestamp: SystemTime::now(),
        }
    }
}

#[async_trait]
impl ExchangeGateway for SimulatedGateway {
    async fn account_snapshot(&self) -> Result<AccountSnapshot> {
        Ok(self.account.lock().await.clone())
    }

    async fn position_snapshots(&self) -> Result<Vec<PositionSnapshot>> {
        Ok(self.positions.lock().await.clone())
    }

    async fn order_book(&self, symbol: &str) -> Result<Orderbook> {
        let mark = self.mark_for(symbol)?;
        Ok(self.book_around(symbol, mark))
    }

    async fn mark_price(&self, symbol: &str) -> Result<Decimal> {
        self.mark_for(symbol)
    }

    async fn funding_schedule(&self) -> Result<Vec<FundingSnapshot>> {
        Ok(self.funding.lock().await.clone())
    }

    async fn symbol_meta(&self, symbol: &str) -> Result<SymbolMeta> {
        self.mark_for(symbol)?;
        Ok(SymbolMeta {
            symbol: symbol.to_string(),
            maintenance_margin_rate: Some(dec!(0.004)),
        })
    }

    async fn place_exit_order(&self, order: ExitOrder) -> Result<OrderAck> {
        let seq = self.order_seq.fetch_add(1, Ordering::Relaxed);
        let fill_price = self.mark_for(&order.symbol).ok();
        Ok(OrderAck {
            order_id: format!("sim-{}", seq),
            status: OrderStatus::Filled,
            fill_price,
        })
    }

    fn name(&self) -> &str {
        "simulated"
    }
}
