//! Matching engine router
//!
//! Holds one order book per market and routes commands to the owning
//! book's loop. Books run independently, so distinct markets match in
//! parallel while each book stays single-writer.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tracing::info;

use types::depth::Depth;
use types::errors::EngineError;
use types::ids::{MarketId, OrderId};
use types::order::Order;

use crate::book::{BookConfig, OrderBook};
use crate::clock::{Clock, MonotonicClock};
use crate::publisher::TradePublisher;

/// Registry of per-market order books.
///
/// Books are created explicitly (lazily or eagerly, the shell's choice)
/// and live for the process lifetime; there is no deletion on the hot
/// path.
pub struct MatchingEngine {
    books: DashMap<MarketId, OrderBook>,
    clock: Arc<dyn Clock>,
    config: BookConfig,
}

impl MatchingEngine {
    /// Create an engine with the production clock and default config
    pub fn new() -> Self {
        Self::with_clock(Arc::new(MonotonicClock::new()), BookConfig::default())
    }

    /// Create an engine with an injected clock and config
    pub fn with_clock(clock: Arc<dyn Clock>, config: BookConfig) -> Self {
        Self {
            books: DashMap::new(),
            clock,
            config,
        }
    }

    /// Create the book for `market_id` and start its command loop.
    ///
    /// Idempotent: a duplicate id returns the existing book untouched (the
    /// supplied publisher is ignored in that case).
    pub fn create_book(
        &self,
        market_id: MarketId,
        publisher: Arc<dyn TradePublisher>,
    ) -> OrderBook {
        self.books
            .entry(market_id.clone())
            .or_insert_with(|| {
                info!(market = %market_id, "creating order book");
                OrderBook::open(
                    market_id.clone(),
                    publisher,
                    Arc::clone(&self.clock),
                    self.config.clone(),
                )
            })
            .clone()
    }

    /// Route an order to its market's book.
    pub fn add_order(&self, order: Order, deadline: Duration) -> Result<(), EngineError> {
        let book = self.book(&order.market_id)?;
        book.add_order(order, deadline)
    }

    /// Route a cancel to its market's book. Unknown order ids are a
    /// silent no-op; an unknown market is an error.
    pub fn cancel_order(
        &self,
        market_id: &MarketId,
        id: OrderId,
        deadline: Duration,
    ) -> Result<(), EngineError> {
        let book = self.book(market_id)?;
        book.cancel_order(id, deadline)
    }

    /// Snapshot up to `limit` levels per side of a market's book.
    pub fn depth(
        &self,
        market_id: &MarketId,
        limit: usize,
        deadline: Duration,
    ) -> Result<Depth, EngineError> {
        let book = self.book(market_id)?;
        book.depth(limit, deadline)
    }

    /// Number of live books
    pub fn book_count(&self) -> usize {
        self.books.len()
    }

    /// Stop every book's loop and wait for them to finish.
    pub fn shutdown(&self) {
        for entry in self.books.iter() {
            entry.value().stop();
        }
        info!(books = self.books.len(), "matching engine shut down");
    }

    fn book(&self, market_id: &MarketId) -> Result<OrderBook, EngineError> {
        self.books
            .get(market_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| EngineError::unknown_market(market_id.as_str()))
    }
}

impl Default for MatchingEngine {
    fn default() -> Self {
        Self::new()
    }
}
