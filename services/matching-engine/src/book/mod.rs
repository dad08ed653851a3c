//! Per-market order book and its single-writer command loop
//!
//! Each book owns a dedicated OS thread that dequeues commands one at a
//! time and runs the matching state machine to completion before the next
//! dequeue, so the book structures need no locks. Producers talk to the
//! loop over one bounded FIFO channel, which is what makes command order
//! (and therefore the trade stream) deterministic; depth replies travel on
//! per-call reply channels so callers never see the loop's internals.

pub mod ask_queue;
pub mod bid_queue;
pub mod price_level;

pub use ask_queue::AskQueue;
pub use bid_queue::BidQueue;
pub use price_level::PriceLevel;

use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, select, Receiver, RecvTimeoutError, SendTimeoutError, Sender};
use tracing::debug;

use types::depth::Depth;
use types::errors::EngineError;
use types::ids::{MarketId, OrderId};
use types::order::Order;

use crate::clock::Clock;
use crate::matching;
use crate::publisher::TradePublisher;

/// Mutating queue operations the matching loop needs from either side.
pub(crate) trait SideQueue {
    fn insert(&mut self, order: Order);
    fn push_front(&mut self, order: Order);
    fn pop_head(&mut self) -> Option<Order>;
}

/// Tuning knobs for one book's command loop.
#[derive(Debug, Clone)]
pub struct BookConfig {
    /// Capacity of the bounded command channel. The buffer is allocated up
    /// front, so this bounds memory per book.
    pub command_capacity: usize,
    /// How long a depth caller waits for its reply once enqueued.
    pub depth_reply_timeout: Duration,
}

impl Default for BookConfig {
    fn default() -> Self {
        Self {
            command_capacity: 65_536,
            depth_reply_timeout: Duration::from_secs(1),
        }
    }
}

/// A command accepted by the book's loop.
///
/// All kinds share one FIFO channel: a cancel enqueued after an add is
/// processed strictly after it, and a depth query observes exactly the
/// commands enqueued before it.
pub(crate) enum Command {
    Add(Order),
    Cancel(OrderId),
    Depth { limit: usize, reply: Sender<Depth> },
}

/// The book structures owned by the loop thread: the single writer.
pub(crate) struct BookState {
    pub(crate) market_id: MarketId,
    pub(crate) bids: BidQueue,
    pub(crate) asks: AskQueue,
}

impl BookState {
    pub(crate) fn new(market_id: MarketId) -> Self {
        Self {
            market_id,
            bids: BidQueue::new(),
            asks: AskQueue::new(),
        }
    }

    /// Remove a resting order wherever it sits. Unknown ids are a no-op:
    /// callers race cancel against fill, so idempotence is the contract.
    fn cancel(&mut self, id: &OrderId) {
        if self.asks.remove(id).is_none() {
            self.bids.remove(id);
        }
    }

    fn depth(&self, limit: usize) -> Depth {
        Depth {
            bids: self.bids.depth(limit),
            asks: self.asks.depth(limit),
        }
    }
}

/// Handle to one market's order book.
///
/// Cheap to clone; all clones feed the same command loop. The loop runs
/// until [`OrderBook::stop`] or until every handle is dropped.
#[derive(Clone)]
pub struct OrderBook {
    market_id: MarketId,
    config: BookConfig,
    command_tx: Sender<Command>,
    stop_tx: Sender<()>,
    worker: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl OrderBook {
    /// Create the book and start its command loop on a dedicated thread.
    pub fn open(
        market_id: MarketId,
        publisher: Arc<dyn TradePublisher>,
        clock: Arc<dyn Clock>,
        config: BookConfig,
    ) -> Self {
        let (command_tx, command_rx) = bounded(config.command_capacity);
        let (stop_tx, stop_rx) = bounded(1);
        let state = BookState::new(market_id.clone());

        let worker = thread::Builder::new()
            .name(format!("book-{market_id}"))
            .spawn(move || run_loop(state, command_rx, stop_rx, publisher, clock))
            .expect("failed to spawn order book thread");

        Self {
            market_id,
            config,
            command_tx,
            stop_tx,
            worker: Arc::new(Mutex::new(Some(worker))),
        }
    }

    /// The market this book serves.
    pub fn market_id(&self) -> &MarketId {
        &self.market_id
    }

    /// Submit an order for matching.
    ///
    /// Validation happens here, synchronously: an `InvalidParam` order is
    /// never enqueued. Enqueueing waits at most `deadline` when the
    /// channel is full.
    pub fn add_order(&self, order: Order, deadline: Duration) -> Result<(), EngineError> {
        validate_order(&order)?;
        self.send(Command::Add(order), deadline)
    }

    /// Cancel a resting order by id.
    ///
    /// An empty id is accepted and ignored; an unknown id is a silent
    /// no-op inside the loop.
    pub fn cancel_order(&self, id: OrderId, deadline: Duration) -> Result<(), EngineError> {
        if id.is_empty() {
            return Ok(());
        }
        self.send(Command::Cancel(id), deadline)
    }

    /// Snapshot up to `limit` levels per side.
    ///
    /// The snapshot is consistent with every command enqueued before this
    /// call and none enqueued after it.
    pub fn depth(&self, limit: usize, deadline: Duration) -> Result<Depth, EngineError> {
        if limit == 0 {
            return Err(EngineError::invalid_param("depth limit must be positive"));
        }

        let (reply_tx, reply_rx) = bounded(1);
        self.send(Command::Depth { limit, reply: reply_tx }, deadline)?;

        match reply_rx.recv_timeout(self.config.depth_reply_timeout) {
            Ok(depth) => Ok(depth),
            Err(RecvTimeoutError::Timeout) => Err(EngineError::Timeout),
            Err(RecvTimeoutError::Disconnected) => Err(EngineError::BookStopped),
        }
    }

    /// Stop the command loop and wait for it to finish.
    ///
    /// Commands still queued are discarded; later submissions fail with
    /// `BookStopped`. Idempotent.
    pub fn stop(&self) {
        let _ = self.stop_tx.try_send(());
        let handle = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            let _ = handle.join();
        }
    }

    fn send(&self, command: Command, deadline: Duration) -> Result<(), EngineError> {
        self.command_tx
            .send_timeout(command, deadline)
            .map_err(|err| match err {
                SendTimeoutError::Timeout(_) => EngineError::Timeout,
                SendTimeoutError::Disconnected(_) => EngineError::BookStopped,
            })
    }
}

fn validate_order(order: &Order) -> Result<(), EngineError> {
    if order.id.is_empty() {
        return Err(EngineError::invalid_param("order id must not be empty"));
    }
    if order.size.is_zero() {
        return Err(EngineError::invalid_param("order size must be positive"));
    }
    if !order.is_market() && order.price.is_zero() {
        return Err(EngineError::invalid_param("limit price must be positive"));
    }
    Ok(())
}

fn run_loop(
    mut state: BookState,
    command_rx: Receiver<Command>,
    stop_rx: Receiver<()>,
    publisher: Arc<dyn TradePublisher>,
    clock: Arc<dyn Clock>,
) {
    debug!(market = %state.market_id, "order book command loop started");

    loop {
        select! {
            recv(command_rx) -> msg => match msg {
                Ok(Command::Add(order)) => {
                    let now = clock.now();
                    let trades = matching::match_order(&mut state, order, now);
                    if !trades.is_empty() {
                        publisher.publish_trades(&trades);
                    }
                }
                Ok(Command::Cancel(id)) => state.cancel(&id),
                Ok(Command::Depth { limit, reply }) => {
                    // The caller may have timed out already; dropping the
                    // reply is its problem, not the loop's.
                    let _ = reply.try_send(state.depth(limit));
                }
                Err(_) => break,
            },
            recv(stop_rx) -> _msg => break,
        }
    }

    debug!(market = %state.market_id, "order book command loop stopped");
}
