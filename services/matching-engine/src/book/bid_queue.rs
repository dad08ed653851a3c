//! Bid (buy-side) queue
//!
//! Maintains buy orders sorted by price descending (best bid first).
//! Uses BTreeMap for deterministic iteration order, plus an id index so a
//! cancel command needs nothing but the order id.

use std::collections::{BTreeMap, HashMap};
use types::depth::DepthItem;
use types::ids::OrderId;
use types::numeric::Price;
use types::order::Order;

use super::price_level::PriceLevel;
use super::SideQueue;

/// Bid (buy) side of an order book
///
/// Price levels are sorted descending, so the highest bid is first.
/// At each price level, orders are maintained in FIFO order.
#[derive(Debug, Clone, Default)]
pub struct BidQueue {
    /// Price levels; iterated back-to-front for priority order
    levels: BTreeMap<Price, PriceLevel>,
    /// Order id → price, for cancel-by-id without scanning the tree
    index: HashMap<OrderId, Price>,
}

impl BidQueue {
    /// Create a new empty bid queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an order to its price level, creating the level if absent
    pub fn insert(&mut self, order: Order) {
        self.index.insert(order.id.clone(), order.price);
        self.levels
            .entry(order.price)
            .or_default()
            .push_back(order);
    }

    /// Re-insert an order at the head of its price level.
    ///
    /// Used to put back the best order after the matcher popped it and
    /// could not (fully) consume it.
    pub fn push_front(&mut self, order: Order) {
        self.index.insert(order.id.clone(), order.price);
        self.levels
            .entry(order.price)
            .or_default()
            .push_front(order);
    }

    /// Remove and return the first order of the best (highest) level.
    ///
    /// The level is dropped once emptied.
    pub fn pop_head(&mut self) -> Option<Order> {
        let price = *self.levels.keys().next_back()?;
        let level = self.levels.get_mut(&price)?;
        let order = level.pop_front()?;
        if level.is_empty() {
            self.levels.remove(&price);
        }
        self.index.remove(&order.id);
        Some(order)
    }

    /// Remove an order by id, returning it if present
    pub fn remove(&mut self, id: &OrderId) -> Option<Order> {
        let price = self.index.remove(id)?;
        let level = self.levels.get_mut(&price)?;
        let order = level.remove(id);
        if level.is_empty() {
            self.levels.remove(&price);
        }
        order
    }

    /// Look up a resting order by id
    pub fn lookup(&self, id: &OrderId) -> Option<&Order> {
        let price = self.index.get(id)?;
        self.levels.get(price)?.iter().find(|order| &order.id == id)
    }

    /// Get the best (highest) bid price
    pub fn best_price(&self) -> Option<Price> {
        self.levels.keys().next_back().copied()
    }

    /// Get up to `limit` aggregated levels, highest price first
    pub fn depth(&self, limit: usize) -> Vec<DepthItem> {
        self.levels
            .iter()
            .rev()
            .take(limit)
            .map(|(price, level)| DepthItem { price: *price, size: level.total_size() })
            .collect()
    }

    /// Iterate levels in priority order (highest price first)
    pub fn iter_levels(&self) -> impl Iterator<Item = (&Price, &PriceLevel)> {
        self.levels.iter().rev()
    }

    /// Check if the bid queue is empty
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Get the number of resting orders across all levels
    pub fn order_count(&self) -> usize {
        self.index.len()
    }

    /// Get the total number of price levels
    pub fn level_count(&self) -> usize {
        self.levels.len()
    }
}

impl SideQueue for BidQueue {
    fn insert(&mut self, order: Order) {
        BidQueue::insert(self, order);
    }

    fn push_front(&mut self, order: Order) {
        BidQueue::push_front(self, order);
    }

    fn pop_head(&mut self) -> Option<Order> {
        BidQueue::pop_head(self)
    }
}
