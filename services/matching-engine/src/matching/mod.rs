//! Matching state machine
//!
//! Turns one incoming order into an ordered sequence of trade events and a
//! book mutation. Fills execute at the maker's price; a remainder either
//! rests (Limit, PostOnly) or ends in a terminal cancel event (IOC
//! remainder, infeasible FOK, crossing PostOnly, exhausted Market).
//!
//! The matcher raises no errors: a well-formed order always resolves into
//! trades, a rest, or a terminal event.

pub mod crossing;

use types::numeric::{Price, Size};
use types::order::{Order, OrderType, Side};
use types::trade::TradeEvent;

use crate::book::price_level::PriceLevel;
use crate::book::{BookState, SideQueue};

/// Run one incoming order against the book.
///
/// `now` is sampled once per command by the command loop, so every event of
/// one order shares a timestamp and the stream stays non-decreasing.
pub(crate) fn match_order(state: &mut BookState, order: Order, now: i64) -> Vec<TradeEvent> {
    if order.is_market() {
        return match order.side {
            Side::BUY => match_market(&mut state.asks, order, now),
            Side::SELL => match_market(&mut state.bids, order, now),
        };
    }

    if order.order_type == OrderType::FOK {
        // Dry run: no mutation until the full size is known to be matchable
        let feasible = match order.side {
            Side::BUY => covers(state.asks.iter_levels(), &order),
            Side::SELL => covers(state.bids.iter_levels(), &order),
        };
        if !feasible {
            return vec![TradeEvent::unfilled_cancel(&order, order.size, now)];
        }
    }

    match order.side {
        Side::BUY => match_limit(&mut state.asks, &mut state.bids, order, now),
        Side::SELL => match_limit(&mut state.bids, &mut state.asks, order, now),
    }
}

/// Walk `levels` best-first and decide whether crossing volume covers the
/// order's full size. Stops at the first non-crossing level.
fn covers<'a>(
    levels: impl Iterator<Item = (&'a Price, &'a PriceLevel)>,
    order: &Order,
) -> bool {
    let mut needed = order.size.as_decimal();
    for (price, level) in levels {
        if !crossing::crosses(order.side, order.price, *price) {
            return false;
        }
        let available = level.total_size().as_decimal();
        if available >= needed {
            return true;
        }
        needed -= available;
    }
    false
}

/// The limit-family loop: Limit, IOC, FOK (execute phase) and PostOnly.
fn match_limit<O, S>(opposite: &mut O, own: &mut S, mut order: Order, now: i64) -> Vec<TradeEvent>
where
    O: SideQueue,
    S: SideQueue,
{
    let mut trades = Vec::new();

    loop {
        let Some(mut head) = opposite.pop_head() else {
            rest_or_cancel(own, order, now, &mut trades);
            return trades;
        };

        if !crossing::crosses(order.side, order.price, head.price) {
            opposite.push_front(head);
            rest_or_cancel(own, order, now, &mut trades);
            return trades;
        }

        if order.order_type == OrderType::PostOnly {
            // The head crosses: taking is forbidden
            opposite.push_front(head);
            trades.push(TradeEvent::unfilled_cancel(&order, order.size, now));
            return trades;
        }

        if order.size >= head.size {
            // Consume the whole head
            trades.push(TradeEvent::fill(&order, &head, head.price, head.size, now));
            order.size = order.size - head.size;
            if order.size.is_zero() {
                return trades;
            }
        } else {
            // Reduce the head and put it back at the front of its level
            trades.push(TradeEvent::fill(&order, &head, head.price, order.size, now));
            head.size = head.size - order.size;
            opposite.push_front(head);
            return trades;
        }
    }
}

/// Terminal handling for an unmatched remainder: Limit and PostOnly rest at
/// their limit price, everything else reports a terminal cancel event.
fn rest_or_cancel<S: SideQueue>(
    own: &mut S,
    order: Order,
    now: i64,
    trades: &mut Vec<TradeEvent>,
) {
    match order.order_type {
        OrderType::Limit | OrderType::PostOnly => own.insert(order),
        _ => trades.push(TradeEvent::unfilled_cancel(&order, order.size, now)),
    }
}

/// The market loop. A market order's `size` is a QUOTE-asset amount: whole
/// heads are consumed while the remaining quote covers `price × size`, then
/// the remainder converts at the head price with truncating division.
fn match_market<O: SideQueue>(opposite: &mut O, mut order: Order, now: i64) -> Vec<TradeEvent> {
    let mut trades = Vec::new();

    loop {
        let Some(mut head) = opposite.pop_head() else {
            // Book exhausted: terminal event for the remaining quote amount
            trades.push(TradeEvent::unfilled_cancel(&order, order.size, now));
            return trades;
        };

        let amount = head.size * head.price;

        if order.size.as_decimal() >= amount {
            trades.push(TradeEvent::fill(&order, &head, head.price, head.size, now));
            order.size =
                Size::try_new(order.size.as_decimal() - amount).unwrap_or(Size::zero());
            if order.size.is_zero() {
                return trades;
            }
        } else {
            let t_size = Size::quote_div(order.size.as_decimal(), head.price);
            if t_size.is_zero() {
                // Remaining quote cannot buy one quantum at this price
                opposite.push_front(head);
                trades.push(TradeEvent::unfilled_cancel(&order, order.size, now));
            } else {
                trades.push(TradeEvent::fill(&order, &head, head.price, t_size, now));
                head.size = head.size - t_size;
                opposite.push_front(head);
            }
            return trades;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use types::ids::{MarketId, OrderId, UserId};
    use types::numeric::Price;

    const T0: i64 = 1708123456789000000;

    fn state() -> BookState {
        BookState::new(MarketId::new("BTC-USDT"))
    }

    fn order(id: &str, side: Side, order_type: OrderType, price: u64, size: &str) -> Order {
        let price = if order_type == OrderType::Market && price == 0 {
            Price::zero()
        } else {
            Price::from_u64(price)
        };
        Order::new(
            OrderId::new(id),
            MarketId::new("BTC-USDT"),
            side,
            order_type,
            price,
            Size::from_str(size).unwrap(),
            UserId::new(1),
            T0,
        )
    }

    fn rest_ask(state: &mut BookState, id: &str, price: u64, size: &str) {
        state.asks.insert(order(id, Side::SELL, OrderType::Limit, price, size));
    }

    fn rest_bid(state: &mut BookState, id: &str, price: u64, size: &str) {
        state.bids.insert(order(id, Side::BUY, OrderType::Limit, price, size));
    }

    #[test]
    fn test_limit_basic_cross() {
        let mut state = state();
        rest_ask(&mut state, "s1", 50000, "1.0");

        let trades = match_order(
            &mut state,
            order("b1", Side::BUY, OrderType::Limit, 50000, "1.0"),
            T0,
        );

        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].price, Price::from_u64(50000));
        assert_eq!(trades[0].size, Size::from_str("1.0").unwrap());
        assert!(!trades[0].is_cancel);
        assert!(state.asks.is_empty());
        assert!(state.bids.is_empty());
    }

    #[test]
    fn test_limit_price_improvement_for_taker() {
        let mut state = state();
        rest_ask(&mut state, "s1", 50000, "1.0");

        let trades = match_order(
            &mut state,
            order("b1", Side::BUY, OrderType::Limit, 50100, "1.0"),
            T0,
        );

        // Executed at the maker's price
        assert_eq!(trades[0].price, Price::from_u64(50000));
    }

    #[test]
    fn test_limit_partial_fill_rests_remainder() {
        let mut state = state();
        rest_ask(&mut state, "s1", 100, "2.0");

        let trades = match_order(
            &mut state,
            order("b1", Side::BUY, OrderType::Limit, 100, "5.0"),
            T0,
        );

        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].size, Size::from_str("2.0").unwrap());
        assert!(state.asks.is_empty());

        let bid_depth = state.bids.depth(1);
        assert_eq!(bid_depth[0].price, Price::from_u64(100));
        assert_eq!(bid_depth[0].size, Size::from_str("3.0").unwrap());
    }

    #[test]
    fn test_limit_reduces_larger_maker_in_place() {
        let mut state = state();
        rest_ask(&mut state, "s1", 100, "5.0");

        let trades = match_order(
            &mut state,
            order("b1", Side::BUY, OrderType::Limit, 100, "2.0"),
            T0,
        );

        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].size, Size::from_str("2.0").unwrap());
        // Maker stays at the head with the reduced size
        let head = state.asks.lookup(&OrderId::new("s1")).unwrap();
        assert_eq!(head.size, Size::from_str("3.0").unwrap());
        assert!(state.bids.is_empty());
    }

    #[test]
    fn test_limit_walks_levels_in_priority_order() {
        let mut state = state();
        rest_ask(&mut state, "s1", 101, "1.0");
        rest_ask(&mut state, "s2", 100, "1.0");

        let trades = match_order(
            &mut state,
            order("b1", Side::BUY, OrderType::Limit, 101, "2.0"),
            T0,
        );

        assert_eq!(trades.len(), 2);
        assert_eq!(trades[0].price, Price::from_u64(100));
        assert_eq!(trades[1].price, Price::from_u64(101));
    }

    #[test]
    fn test_limit_fifo_within_level() {
        let mut state = state();
        rest_ask(&mut state, "s1", 100, "1.0");
        rest_ask(&mut state, "s2", 100, "1.0");

        let trades = match_order(
            &mut state,
            order("b1", Side::BUY, OrderType::Limit, 100, "1.0"),
            T0,
        );

        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].maker_order_id, OrderId::new("s1"));
        assert!(state.asks.lookup(&OrderId::new("s2")).is_some());
    }

    #[test]
    fn test_limit_sell_side_mirror() {
        let mut state = state();
        rest_bid(&mut state, "b1", 100, "1.0");

        let trades = match_order(
            &mut state,
            order("s1", Side::SELL, OrderType::Limit, 99, "1.0"),
            T0,
        );

        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].price, Price::from_u64(100));
        assert!(state.bids.is_empty());
    }

    #[test]
    fn test_ioc_unfilled_remainder_cancels() {
        let mut state = state();
        rest_ask(&mut state, "s1", 100, "1.0");

        let trades = match_order(
            &mut state,
            order("i1", Side::BUY, OrderType::IOC, 100, "3.0"),
            T0,
        );

        assert_eq!(trades.len(), 2);
        assert!(!trades[0].is_cancel);
        assert!(trades[1].is_cancel);
        assert_eq!(trades[1].size, Size::from_str("2.0").unwrap());
        assert_eq!(trades[1].taker_order_id, trades[1].maker_order_id);
        // Nothing rested
        assert!(state.bids.is_empty());
    }

    #[test]
    fn test_ioc_empty_book_cancels_full_size() {
        let mut state = state();

        let trades = match_order(
            &mut state,
            order("i1", Side::BUY, OrderType::IOC, 100, "1.0"),
            T0,
        );

        assert_eq!(trades.len(), 1);
        assert!(trades[0].is_cancel);
        assert_eq!(trades[0].size, Size::from_str("1.0").unwrap());
    }

    #[test]
    fn test_ioc_fully_filled_emits_no_cancel() {
        let mut state = state();
        rest_ask(&mut state, "s1", 100, "2.0");

        let trades = match_order(
            &mut state,
            order("i1", Side::BUY, OrderType::IOC, 100, "2.0"),
            T0,
        );

        assert_eq!(trades.len(), 1);
        assert!(!trades[0].is_cancel);
    }

    #[test]
    fn test_fok_infeasible_leaves_book_untouched() {
        let mut state = state();
        rest_ask(&mut state, "s1", 100, "1.0");
        rest_ask(&mut state, "s2", 101, "2.0");

        let trades = match_order(
            &mut state,
            order("f1", Side::BUY, OrderType::FOK, 101, "5.0"),
            T0,
        );

        assert_eq!(trades.len(), 1);
        assert!(trades[0].is_cancel);
        assert_eq!(trades[0].size, Size::from_str("5.0").unwrap());
        assert_eq!(state.asks.order_count(), 2);
        assert_eq!(state.asks.depth(2)[0].size, Size::from_str("1.0").unwrap());
    }

    #[test]
    fn test_fok_stops_at_non_crossing_level() {
        let mut state = state();
        rest_ask(&mut state, "s1", 100, "1.0");
        rest_ask(&mut state, "s2", 102, "9.0"); // beyond the limit price

        let trades = match_order(
            &mut state,
            order("f1", Side::BUY, OrderType::FOK, 101, "2.0"),
            T0,
        );

        assert_eq!(trades.len(), 1);
        assert!(trades[0].is_cancel);
        assert_eq!(state.asks.order_count(), 2);
    }

    #[test]
    fn test_fok_feasible_fills_across_levels() {
        let mut state = state();
        rest_ask(&mut state, "s1", 100, "1.0");
        rest_ask(&mut state, "s2", 101, "2.0");

        let trades = match_order(
            &mut state,
            order("f1", Side::BUY, OrderType::FOK, 101, "3.0"),
            T0,
        );

        assert_eq!(trades.len(), 2);
        assert_eq!(trades[0].price, Price::from_u64(100));
        assert_eq!(trades[0].size, Size::from_str("1.0").unwrap());
        assert_eq!(trades[1].price, Price::from_u64(101));
        assert_eq!(trades[1].size, Size::from_str("2.0").unwrap());
        assert!(state.asks.is_empty());
        assert!(state.bids.is_empty());
    }

    #[test]
    fn test_fok_feasible_partial_level() {
        let mut state = state();
        rest_ask(&mut state, "s1", 100, "5.0");

        let trades = match_order(
            &mut state,
            order("f1", Side::BUY, OrderType::FOK, 100, "2.0"),
            T0,
        );

        assert_eq!(trades.len(), 1);
        assert!(!trades[0].is_cancel);
        let head = state.asks.lookup(&OrderId::new("s1")).unwrap();
        assert_eq!(head.size, Size::from_str("3.0").unwrap());
    }

    #[test]
    fn test_post_only_rejects_on_cross() {
        let mut state = state();
        rest_ask(&mut state, "s1", 100, "1.0");

        let trades = match_order(
            &mut state,
            order("p1", Side::BUY, OrderType::PostOnly, 100, "1.0"),
            T0,
        );

        assert_eq!(trades.len(), 1);
        assert!(trades[0].is_cancel);
        assert_eq!(trades[0].size, Size::from_str("1.0").unwrap());
        // Ask side unchanged, nothing rested
        assert_eq!(state.asks.order_count(), 1);
        assert!(state.bids.is_empty());
    }

    #[test]
    fn test_post_only_rests_when_not_crossing() {
        let mut state = state();
        rest_ask(&mut state, "s1", 101, "1.0");

        let trades = match_order(
            &mut state,
            order("p1", Side::BUY, OrderType::PostOnly, 100, "1.0"),
            T0,
        );

        assert!(trades.is_empty());
        let bid_depth = state.bids.depth(1);
        assert_eq!(bid_depth[0].price, Price::from_u64(100));
        assert_eq!(bid_depth[0].size, Size::from_str("1.0").unwrap());
    }

    #[test]
    fn test_post_only_rests_on_empty_book() {
        let mut state = state();

        let trades = match_order(
            &mut state,
            order("p1", Side::BUY, OrderType::PostOnly, 100, "1.0"),
            T0,
        );

        assert!(trades.is_empty());
        assert_eq!(state.bids.order_count(), 1);
    }

    #[test]
    fn test_market_quote_amount_walks_levels() {
        let mut state = state();
        rest_ask(&mut state, "s1", 100, "1.0");
        rest_ask(&mut state, "s2", 200, "1.0");

        // 150 quote: 100 consumes the first head, 50 buys 0.25 at 200
        let trades = match_order(
            &mut state,
            order("m1", Side::BUY, OrderType::Market, 0, "150"),
            T0,
        );

        assert_eq!(trades.len(), 2);
        assert_eq!(trades[0].price, Price::from_u64(100));
        assert_eq!(trades[0].size, Size::from_str("1.0").unwrap());
        assert_eq!(trades[1].price, Price::from_u64(200));
        assert_eq!(trades[1].size, Size::from_str("0.25").unwrap());

        let head = state.asks.lookup(&OrderId::new("s2")).unwrap();
        assert_eq!(head.size, Size::from_str("0.75").unwrap());
        assert!(state.bids.is_empty());
    }

    #[test]
    fn test_market_exact_quote_consumes_and_stops() {
        let mut state = state();
        rest_ask(&mut state, "s1", 100, "1.0");
        rest_ask(&mut state, "s2", 200, "1.0");

        let trades = match_order(
            &mut state,
            order("m1", Side::BUY, OrderType::Market, 0, "100"),
            T0,
        );

        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].size, Size::from_str("1.0").unwrap());
        assert_eq!(state.asks.order_count(), 1);
    }

    #[test]
    fn test_market_exhausts_book_cancels_remaining_quote() {
        let mut state = state();
        rest_ask(&mut state, "s1", 100, "1.0");

        let trades = match_order(
            &mut state,
            order("m1", Side::BUY, OrderType::Market, 0, "250"),
            T0,
        );

        assert_eq!(trades.len(), 2);
        assert!(!trades[0].is_cancel);
        assert!(trades[1].is_cancel);
        // 250 - 100 quote left unfilled
        assert_eq!(trades[1].size, Size::from_str("150").unwrap());
    }

    #[test]
    fn test_market_empty_book_cancels_full_quote() {
        let mut state = state();

        let trades = match_order(
            &mut state,
            order("m1", Side::BUY, OrderType::Market, 0, "50"),
            T0,
        );

        assert_eq!(trades.len(), 1);
        assert!(trades[0].is_cancel);
        assert_eq!(trades[0].size, Size::from_str("50").unwrap());
    }

    #[test]
    fn test_market_sell_consumes_bids() {
        let mut state = state();
        rest_bid(&mut state, "b1", 100, "2.0");

        // Sell 150 quote: consumes 1.5 base at 100
        let trades = match_order(
            &mut state,
            order("m1", Side::SELL, OrderType::Market, 0, "150"),
            T0,
        );

        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].size, Size::from_str("1.5").unwrap());
        let head = state.bids.lookup(&OrderId::new("b1")).unwrap();
        assert_eq!(head.size, Size::from_str("0.5").unwrap());
    }

    #[test]
    fn test_market_dust_quote_ends_in_cancel() {
        let mut state = state();
        rest_ask(&mut state, "s1", 1000000000, "1.0");

        // 1e-9 quote at price 1e9 buys < 1e-8 base: truncates to zero
        let trades = match_order(
            &mut state,
            order("m1", Side::BUY, OrderType::Market, 0, "0.000000001"),
            T0,
        );

        assert_eq!(trades.len(), 1);
        assert!(trades[0].is_cancel);
        assert_eq!(state.asks.order_count(), 1);
    }

    #[test]
    fn test_volume_conservation_over_mixed_flow() {
        let mut state = state();
        let submitted = ["3.0", "1.5", "2.5"];
        for (i, size) in submitted.iter().enumerate() {
            rest_ask(&mut state, &format!("s{i}"), 100 + i as u64, size);
        }

        let trades = match_order(
            &mut state,
            order("b1", Side::BUY, OrderType::Limit, 101, "4.0"),
            T0,
        );

        let traded: Decimal = trades.iter().map(|t| t.size.as_decimal()).sum();
        let resting_asks: Decimal = state
            .asks
            .iter_levels()
            .map(|(_, level)| level.total_size().as_decimal())
            .sum();
        let submitted_total: Decimal = submitted
            .iter()
            .map(|s| Size::from_str(s).unwrap().as_decimal())
            .sum();

        assert_eq!(traded + resting_asks, submitted_total);
        assert!(state.bids.is_empty(), "taker fully filled, nothing rests");
    }
}
