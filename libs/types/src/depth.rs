//! Aggregated depth snapshots
//!
//! Depth exposes `(price, total size)` per level, best prices first. The
//! number of orders behind a level is intentionally not part of the
//! public shape.

use crate::numeric::{Price, Size};
use serde::{Deserialize, Serialize};

/// One aggregated price level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepthItem {
    pub price: Price,
    pub size: Size,
}

/// Snapshot of both sides of a book, up to a caller-requested limit.
///
/// Consistent with every command processed before the query and none
/// processed after it.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Depth {
    /// Bid levels, highest price first
    pub bids: Vec<DepthItem>,
    /// Ask levels, lowest price first
    pub asks: Vec<DepthItem>,
}

impl Depth {
    /// Best (highest) bid level, if any
    pub fn best_bid(&self) -> Option<&DepthItem> {
        self.bids.first()
    }

    /// Best (lowest) ask level, if any
    pub fn best_ask(&self) -> Option<&DepthItem> {
        self.asks.first()
    }

    /// Check whether both sides are empty
    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }
}
