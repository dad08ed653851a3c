//! Order types
//!
//! An order's identity is immutable; `size` is the only field the matcher
//! mutates as fills are produced.

use crate::ids::{MarketId, OrderId, UserId};
use crate::numeric::{Price, Size};
use serde::{Deserialize, Serialize};

/// Order side (buyer or seller)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    /// Buy order (bid)
    BUY,
    /// Sell order (ask)
    SELL,
}

impl Side {
    /// Get the opposite side
    pub fn opposite(&self) -> Self {
        match self {
            Side::BUY => Side::SELL,
            Side::SELL => Side::BUY,
        }
    }
}

/// Order type determining matching behavior
///
/// Cancellation is not an order type: it travels as its own command and
/// never reaches the matcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderType {
    /// Match what crosses, rest the remainder
    #[serde(rename = "limit")]
    Limit,
    /// Consume liquidity by quote amount; never rests
    #[serde(rename = "market")]
    Market,
    /// Immediate-or-cancel: match what crosses, cancel the remainder
    #[serde(rename = "ioc")]
    IOC,
    /// Fill-or-kill: full match or reject entirely
    #[serde(rename = "fok")]
    FOK,
    /// Maker only: rejected if it would take
    #[serde(rename = "post_only")]
    PostOnly,
}

/// An order submitted to the matching core.
///
/// `size` is a base-asset quantity, except for `Market` orders where it is
/// a QUOTE-asset amount (e.g. the USDT side of BTC-USDT). Callers routinely
/// get this wrong; the outer shell must enforce the convention.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub market_id: MarketId,
    pub side: Side,
    pub order_type: OrderType,
    pub price: Price,
    pub size: Size,
    pub user_id: UserId,
    pub created_at: i64, // Unix nanos
}

impl Order {
    /// Create a new order
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: OrderId,
        market_id: MarketId,
        side: Side,
        order_type: OrderType,
        price: Price,
        size: Size,
        user_id: UserId,
        created_at: i64,
    ) -> Self {
        Self {
            id,
            market_id,
            side,
            order_type,
            price,
            size,
            user_id,
            created_at,
        }
    }

    /// Check whether this order consumes by quote amount
    pub fn is_market(&self) -> bool {
        self.order_type == OrderType::Market
    }
}
