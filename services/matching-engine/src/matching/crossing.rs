//! Crossing detection logic
//!
//! Determines when an incoming order meets or beats the opposite side's
//! head. Market orders never consult this: they cross whenever the
//! opposite side is non-empty.

use types::numeric::Price;
use types::order::Side;

/// Check if an incoming order crosses a resting order.
///
/// A buy crosses when its price is at or above the maker's; a sell crosses
/// when its price is at or below the maker's.
pub fn crosses(taker_side: Side, taker_price: Price, maker_price: Price) -> bool {
    match taker_side {
        Side::BUY => taker_price >= maker_price,
        Side::SELL => taker_price <= maker_price,
    }
}
