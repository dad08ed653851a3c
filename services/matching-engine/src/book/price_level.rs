//! Price level implementation with FIFO queue
//!
//! A price level holds every resting order at one price, in arrival order,
//! with a cached total so depth queries never walk the list. The matcher
//! re-inserts a partially consumed head via `push_front`, preserving its
//! time priority.

use std::collections::VecDeque;
use types::ids::OrderId;
use types::numeric::Size;
use types::order::Order;

/// A price level containing resting orders at a specific price
///
/// Maintains strict FIFO ordering for time-priority matching.
#[derive(Debug, Clone)]
pub struct PriceLevel {
    /// Resting orders at this price (front matches first)
    orders: VecDeque<Order>,
    /// Cached total: always Σ size over `orders`
    total_size: Size,
}

impl PriceLevel {
    /// Create a new empty price level
    pub fn new() -> Self {
        Self {
            orders: VecDeque::new(),
            total_size: Size::zero(),
        }
    }

    /// Append an order at the back of the queue (time priority)
    pub fn push_back(&mut self, order: Order) {
        self.total_size = self.total_size + order.size;
        self.orders.push_back(order);
    }

    /// Re-insert an order at the head of the queue.
    ///
    /// Used to put back the best order after the matcher popped it and
    /// could not (fully) consume it.
    pub fn push_front(&mut self, order: Order) {
        self.total_size = self.total_size + order.size;
        self.orders.push_front(order);
    }

    /// Remove and return the first order
    pub fn pop_front(&mut self) -> Option<Order> {
        let order = self.orders.pop_front()?;
        self.total_size = Size::try_new(self.total_size.as_decimal() - order.size.as_decimal())
            .unwrap_or(Size::zero());
        Some(order)
    }

    /// Remove an order by id, returning it if present
    pub fn remove(&mut self, id: &OrderId) -> Option<Order> {
        let position = self.orders.iter().position(|order| &order.id == id)?;
        let order = self.orders.remove(position)?;
        self.total_size = Size::try_new(self.total_size.as_decimal() - order.size.as_decimal())
            .unwrap_or(Size::zero());
        Some(order)
    }

    /// Peek at the first order without removing it
    pub fn front(&self) -> Option<&Order> {
        self.orders.front()
    }

    /// Iterate resting orders in priority order
    pub fn iter(&self) -> impl Iterator<Item = &Order> {
        self.orders.iter()
    }

    /// Check if the price level is empty
    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// Get the number of orders at this level
    pub fn len(&self) -> usize {
        self.orders.len()
    }

    /// Get the total resting size at this level
    pub fn total_size(&self) -> Size {
        self.total_size
    }
}

impl Default for PriceLevel {
    fn default() -> Self {
        Self::new()
    }
}
