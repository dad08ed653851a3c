//! Trade events emitted by the matching core
//!
//! A trade event is either a fill between a taker and a maker, or a
//! synthetic terminal record (`is_cancel = true`) reporting that an order
//! ended unfilled: an IOC remainder, an infeasible FOK, a post-only order
//! that would cross, or a market order that exhausted the book.

use crate::ids::{MarketId, OrderId, TradeId, UserId};
use crate::numeric::{Price, Size};
use crate::order::{Order, OrderType, Side};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One record in a book's trade stream.
///
/// Header fields are fully populated on both the fill and the terminal
/// paths; consumers never have to join against order storage to learn who
/// traded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeEvent {
    pub trade_id: TradeId,
    pub market_id: MarketId,

    // Taker (the incoming order)
    pub taker_order_id: OrderId,
    pub taker_side: Side,
    pub taker_order_type: OrderType,
    pub taker_user_id: UserId,

    // Maker (the resting order)
    pub maker_order_id: OrderId,
    pub maker_user_id: UserId,

    pub price: Price,
    pub size: Size,
    /// Terminal marker: the order ended unfilled for this `size`
    pub is_cancel: bool,
    pub created_at: i64, // Unix nanos
}

impl TradeEvent {
    /// Build a fill between `taker` and `maker`.
    ///
    /// `price` is the maker's price (price improvement goes to the taker),
    /// `size` the base quantity exchanged.
    pub fn fill(taker: &Order, maker: &Order, price: Price, size: Size, created_at: i64) -> Self {
        Self {
            trade_id: TradeId::new(),
            market_id: taker.market_id.clone(),
            taker_order_id: taker.id.clone(),
            taker_side: taker.side,
            taker_order_type: taker.order_type,
            taker_user_id: taker.user_id,
            maker_order_id: maker.id.clone(),
            maker_user_id: maker.user_id,
            price,
            size,
            is_cancel: false,
            created_at,
        }
    }

    /// Build the terminal record for an order that ends unfilled.
    ///
    /// By convention the order appears as both taker and maker, signalling
    /// "no counterparty". `size` is the unfilled remainder (a quote amount
    /// for market orders).
    pub fn unfilled_cancel(order: &Order, size: Size, created_at: i64) -> Self {
        Self {
            trade_id: TradeId::new(),
            market_id: order.market_id.clone(),
            taker_order_id: order.id.clone(),
            taker_side: order.side,
            taker_order_type: order.order_type,
            taker_user_id: order.user_id,
            maker_order_id: order.id.clone(),
            maker_user_id: order.user_id,
            price: order.price,
            size,
            is_cancel: true,
            created_at,
        }
    }

    /// Check the taker-equals-maker terminal convention
    pub fn is_unfilled_cancel(&self) -> bool {
        self.is_cancel
    }

    /// Trade value in the quote asset (price × size)
    pub fn notional(&self) -> Decimal {
        self.size * self.price
    }
}
