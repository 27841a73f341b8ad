//! Core business entities shared between the risk engine and the exchange gateway.

mod candidate;
mod order;
mod orderbook;
mod snapshot;

pub use candidate::EntryCandidate;
pub use order::{ExitOrder, ExitOrderType, OrderAck, OrderSide, OrderStatus};
pub use orderbook::{Orderbook, PriceLevel};
pub use snapshot::{AccountSnapshot, FundingSnapshot, PositionSnapshot, SymbolMeta};
