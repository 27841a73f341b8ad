//! Exchange gateway abstraction consumed by the risk engine.
//!
//! Real connectivity (REST/WebSocket clients) lives outside this crate; the
//! engine only depends on this trait. A simulated in-memory implementation is
//! provided for dry runs and tests.

mod sim;

use crate::domain::{
    AccountSnapshot, ExitOrder, FundingSnapshot, OrderAck, Orderbook, PositionSnapshot, SymbolMeta,
};
use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;

pub use sim::SimulatedGateway;

/// Gateway errors.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Symbol is not available on this exchange.
    #[error("symbol {0} is not supported")]
    SymbolNotSupported(String),

    /// Order was rejected by the exchange.
    #[error("order rejected: {0}")]
    OrderRejected(String),

    /// Connection error, expected to be transient.
    #[error("connection error: {0}")]
    Connection(String),

    /// API error from the exchange.
    #[error("API error: {0}")]
    Api(String),

    /// Internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type for gateway operations.
pub type Result<T> = std::result::Result<T, GatewayError>;

/// ExchangeGateway defines the exchange surface the risk engine consumes.
///
/// Every method may suspend on network I/O; the engine never holds its state
/// lock across a call into this trait.
#[async_trait]
pub trait ExchangeGateway: Send + Sync {
    /// Fetches the current account snapshot (balances and unrealized PnL).
    async fn account_snapshot(&self) -> Result<AccountSnapshot>;

    /// Fetches live state for all open positions.
    /// Symbols with no open position are absent from the result.
    async fn position_snapshots(&self) -> Result<Vec<PositionSnapshot>>;

    /// Fetches the current orderbook depth for a symbol.
    /// At least 10-20 levels per side are expected for slippage estimation.
    async fn order_book(&self, symbol: &str) -> Result<Orderbook>;

    /// Fetches the current mark price for a symbol.
    async fn mark_price(&self, symbol: &str) -> Result<Decimal>;

    /// Fetches the funding schedule for all perpetual symbols.
    async fn funding_schedule(&self) -> Result<Vec<FundingSnapshot>>;

    /// Fetches static metadata for a symbol, including the
    /// maintenance-margin rate when the exchange publishes it.
    async fn symbol_meta(&self, symbol: &str) -> Result<SymbolMeta>;

    /// Places a protective exit order.
    /// Returns GatewayError::OrderRejected if the exchange refuses it.
    async fn place_exit_order(&self, order: ExitOrder) -> Result<OrderAck>;

    /// Name returns the unique identifier of this gateway (e.g. "binance").
    fn name(&self) -> &str;
}
