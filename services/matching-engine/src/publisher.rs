//! Trade publisher seam
//!
//! The command loop hands each command's full trade batch to the publisher
//! synchronously, so a publisher must return promptly: matching stalls for
//! exactly as long as `publish_trades` runs. Publisher failures are the
//! publisher's to handle; the core never sees them.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use crossbeam_channel::{bounded, Receiver, Sender};
use tracing::warn;

use types::trade::TradeEvent;

/// Sink for the trade stream of one or more books.
///
/// Called from every book loop that was created with it, so
/// implementations must be safe under concurrent calls. Ordering within
/// one book is the loop's command order; across books none is defined.
pub trait TradePublisher: Send + Sync {
    fn publish_trades(&self, trades: &[TradeEvent]);
}

/// Buffering publisher backed by a mutex-guarded vector.
///
/// The in-process sink wired up at server start, and the sink of choice in
/// tests: `take()` drains everything published so far.
#[derive(Debug, Default)]
pub struct MemoryPublisher {
    trades: Mutex<Vec<TradeEvent>>,
}

impl MemoryPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain and return everything published so far
    pub fn take(&self) -> Vec<TradeEvent> {
        std::mem::take(&mut *self.lock())
    }

    /// Copy of the buffer without draining it
    pub fn snapshot(&self) -> Vec<TradeEvent> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<TradeEvent>> {
        self.trades.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl TradePublisher for MemoryPublisher {
    fn publish_trades(&self, trades: &[TradeEvent]) {
        self.lock().extend_from_slice(trades);
    }
}

/// Non-blocking publisher over a bounded channel.
///
/// Events are forwarded with `try_send`; when the consumer lags, events
/// are dropped and counted rather than stalling the book loop.
#[derive(Debug)]
pub struct ChannelPublisher {
    tx: Sender<TradeEvent>,
    dropped: AtomicU64,
}

impl ChannelPublisher {
    /// Create a publisher and the receiver its consumer reads from.
    pub fn new(capacity: usize) -> (Self, Receiver<TradeEvent>) {
        let (tx, rx) = bounded(capacity);
        (
            Self {
                tx,
                dropped: AtomicU64::new(0),
            },
            rx,
        )
    }

    /// Events dropped because the consumer lagged or disconnected
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl TradePublisher for ChannelPublisher {
    fn publish_trades(&self, trades: &[TradeEvent]) {
        for trade in trades {
            if self.tx.try_send(trade.clone()).is_err() {
                let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                warn!(
                    market = %trade.market_id,
                    dropped,
                    "trade consumer lagging; event dropped"
                );
            }
        }
    }
}
