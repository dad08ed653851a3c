//! Error taxonomy for the matching core
//!
//! Only submission-side failures surface as errors. Inside the matcher an
//! order always resolves into trades or a terminal cancel event; "no
//! liquidity" is never an error.

use thiserror::Error;

/// Errors returned by the engine's synchronous surface.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Caller-supplied data violates a precondition; nothing was enqueued
    #[error("invalid parameter: {reason}")]
    InvalidParam { reason: String },

    /// No order book exists for the given market id
    #[error("unknown market: {market}")]
    UnknownMarket { market: String },

    /// Command not enqueued, or depth reply not received, within deadline
    #[error("operation timed out")]
    Timeout,

    /// The book's command loop has terminated (shutdown only)
    #[error("order book stopped")]
    BookStopped,
}

impl EngineError {
    /// Shorthand for an `InvalidParam` with the given reason
    pub fn invalid_param(reason: impl Into<String>) -> Self {
        Self::InvalidParam { reason: reason.into() }
    }

    /// Shorthand for an `UnknownMarket` for the given market
    pub fn unknown_market(market: impl Into<String>) -> Self {
        Self::UnknownMarket { market: market.into() }
    }
}
