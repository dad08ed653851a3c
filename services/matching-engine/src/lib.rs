//! Matching Engine Service
//!
//! Limit-order matching core for a spot exchange: per-market order books
//! with price-time priority, a per-type matching state machine (Limit,
//! Market, IOC, FOK, PostOnly) and a single-writer command loop per book.
//!
//! **Key Invariants:**
//! - Price-time priority strictly enforced (FIFO within a level)
//! - One writer per book; the trade stream is the command order
//! - No resting order with zero size; empty levels are removed eagerly
//! - Every order ends in fills, a rest, or one terminal cancel event
//! - Trade timestamps are non-decreasing per book
//!
//! Everything outside the book (transport, persistence, balances, fees)
//! plugs in through [`publisher::TradePublisher`] and [`clock::Clock`].

pub mod book;
pub mod clock;
pub mod engine;
pub mod matching;
pub mod publisher;

pub use book::{BookConfig, OrderBook};
pub use clock::{Clock, ManualClock, MonotonicClock};
pub use engine::MatchingEngine;
pub use publisher::{ChannelPublisher, MemoryPublisher, TradePublisher};
