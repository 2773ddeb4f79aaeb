//! Bounded message queue with a commit cursor
//!
//! One mutex guards the two deques; it is only held for pointer moves, never
//! across I/O or an await point. Producer and consumer wakeups go through two
//! `tokio::sync::Notify` channels.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use courier_protocol::Message;
use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::Notify;
use tokio::time::Instant;

/// Default queue capacity, in messages
pub const DEFAULT_CAPACITY: usize = 10_000;

/// Default offer timeout under the block policy
pub const DEFAULT_OFFER_TIMEOUT: Duration = Duration::from_secs(5);

/// What `offer` does when the queue is at capacity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverflowPolicy {
    /// Wait for space up to the timeout, then fail with `Timeout`
    ///
    /// The default: a slow sink throttles its feed without unbounded growth.
    Block {
        /// Longest a single offer may wait
        timeout: Duration,
    },

    /// Fail immediately with `Full`
    FailFast,

    /// Evict the oldest pending entry to make room; never fails
    ///
    /// Evictions are counted, not silent. If every entry is in flight with
    /// the engine, there is nothing evictable and the incoming message is
    /// the oldest pending entry - it is dropped and counted instead.
    DropOldest,
}

impl Default for OverflowPolicy {
    fn default() -> Self {
        Self::Block {
            timeout: DEFAULT_OFFER_TIMEOUT,
        }
    }
}

/// Queue construction parameters
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Maximum entries held (pending + in-flight)
    pub capacity: usize,

    /// Overflow behavior
    pub policy: OverflowPolicy,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            policy: OverflowPolicy::default(),
        }
    }
}

/// Errors surfaced by queue operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueueError {
    /// Queue at capacity under the fail-fast policy
    #[error("queue full ({capacity} entries)")]
    Full {
        /// Configured capacity
        capacity: usize,
    },

    /// Block policy timed out waiting for space
    #[error("offer timed out after {waited_ms}ms")]
    Timeout {
        /// How long the offer waited
        waited_ms: u64,
    },

    /// Queue was closed
    #[error("queue closed")]
    Closed,
}

/// Point-in-time snapshot of queue counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStats {
    /// Messages accepted by offer
    pub offered: u64,
    /// Messages released by commit
    pub committed: u64,
    /// Messages evicted or dropped by the drop-oldest policy
    pub evicted: u64,
    /// Current entries (pending + in-flight)
    pub depth: usize,
    /// Entries handed to the engine and not yet committed
    pub in_flight: usize,
}

struct Inner {
    /// Entries waiting to be polled, FIFO
    pending: VecDeque<Arc<Message>>,

    /// Entries handed to the drain loop, awaiting commit, FIFO
    in_flight: VecDeque<Arc<Message>>,

    closed: bool,
}

impl Inner {
    fn depth(&self) -> usize {
        self.pending.len() + self.in_flight.len()
    }
}

/// Bounded, thread-safe buffer of pending messages for one sink
///
/// # Contract
///
/// - `offer` order equals `poll_batch` order equals commit order (FIFO).
/// - `commit` only ever releases entries that a previous `poll_batch`
///   handed out; it is clamped to the in-flight count, so double commits
///   are harmless.
/// - `rollback` returns every in-flight entry to the front of the pending
///   region; the next poll sees them first, in their original order.
pub struct MessageQueue {
    inner: Mutex<Inner>,

    /// Signaled when space frees up (commit, eviction, close)
    space: Notify,

    /// Signaled when a message arrives (offer, rollback, close)
    data: Notify,

    capacity: usize,
    policy: OverflowPolicy,

    offered: AtomicU64,
    committed: AtomicU64,
    evicted: AtomicU64,
}

impl MessageQueue {
    /// Create a queue with the given configuration
    pub fn new(config: QueueConfig) -> Self {
        Self {
            inner: Mutex::new(Inner {
                pending: VecDeque::new(),
                in_flight: VecDeque::new(),
                closed: false,
            }),
            space: Notify::new(),
            data: Notify::new(),
            capacity: config.capacity.max(1),
            policy: config.policy,
            offered: AtomicU64::new(0),
            committed: AtomicU64::new(0),
            evicted: AtomicU64::new(0),
        }
    }

    /// Create a queue with default capacity and policy
    pub fn with_defaults() -> Self {
        Self::new(QueueConfig::default())
    }

    /// Configured capacity
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Offer a message, applying the overflow policy when at capacity
    ///
    /// # Errors
    ///
    /// - `Closed` if the queue has been closed.
    /// - `Full` under fail-fast at capacity.
    /// - `Timeout` under block when no space freed within the timeout.
    pub async fn offer(&self, msg: Arc<Message>) -> crate::Result<()> {
        // Fast path and non-waiting policies first
        let deadline = {
            let mut inner = self.inner.lock();
            if inner.closed {
                return Err(QueueError::Closed);
            }

            if inner.depth() < self.capacity {
                inner.pending.push_back(msg);
                drop(inner);
                self.offered.fetch_add(1, Ordering::Relaxed);
                self.data.notify_one();
                return Ok(());
            }

            match self.policy {
                OverflowPolicy::FailFast => {
                    return Err(QueueError::Full {
                        capacity: self.capacity,
                    });
                }
                OverflowPolicy::DropOldest => {
                    if inner.pending.pop_front().is_some() {
                        inner.pending.push_back(msg);
                        drop(inner);
                        self.offered.fetch_add(1, Ordering::Relaxed);
                        self.evicted.fetch_add(1, Ordering::Relaxed);
                        self.data.notify_one();
                    } else {
                        // Everything is in flight; the new message is the
                        // oldest pending entry, so it is the one dropped
                        drop(inner);
                        self.evicted.fetch_add(1, Ordering::Relaxed);
                    }
                    return Ok(());
                }
                OverflowPolicy::Block { timeout } => Instant::now() + timeout,
            }
        };

        // Block policy: wait for space until the deadline
        let start = Instant::now();
        let notified = self.space.notified();
        tokio::pin!(notified);

        loop {
            // Register for a wakeup before re-checking, so a commit between
            // the check and the await is not lost
            notified.as_mut().enable();

            {
                let mut inner = self.inner.lock();
                if inner.closed {
                    return Err(QueueError::Closed);
                }
                if inner.depth() < self.capacity {
                    inner.pending.push_back(msg);
                    drop(inner);
                    self.offered.fetch_add(1, Ordering::Relaxed);
                    self.data.notify_one();
                    return Ok(());
                }
            }

            if tokio::time::timeout_at(deadline, notified.as_mut())
                .await
                .is_err()
            {
                return Err(QueueError::Timeout {
                    waited_ms: start.elapsed().as_millis() as u64,
                });
            }

            notified.set(self.space.notified());
        }
    }

    /// Poll a batch of up to `max_count` messages
    ///
    /// Dual trigger: returns as soon as `max_count` messages are pending, or
    /// when `max_wait` elapses - whichever comes first. On timeout the batch
    /// holds whatever is pending, possibly nothing. Once the queue is closed
    /// the remaining entries drain without waiting out the timer.
    ///
    /// Polled entries move to the in-flight region until `commit` or
    /// `rollback`.
    pub async fn poll_batch(&self, max_count: usize, max_wait: Duration) -> Vec<Arc<Message>> {
        let max_count = max_count.max(1);
        let deadline = Instant::now() + max_wait;

        let notified = self.data.notified();
        tokio::pin!(notified);

        loop {
            notified.as_mut().enable();

            {
                let mut inner = self.inner.lock();
                if inner.pending.len() >= max_count || inner.closed {
                    return Self::take_batch(&mut inner, max_count);
                }
            }

            if tokio::time::timeout_at(deadline, notified.as_mut())
                .await
                .is_err()
            {
                let mut inner = self.inner.lock();
                return Self::take_batch(&mut inner, max_count);
            }

            notified.set(self.data.notified());
        }
    }

    fn take_batch(inner: &mut Inner, max_count: usize) -> Vec<Arc<Message>> {
        let count = inner.pending.len().min(max_count);
        let mut batch = Vec::with_capacity(count);
        for _ in 0..count {
            // Unwrap-free: count is bounded by pending.len()
            if let Some(msg) = inner.pending.pop_front() {
                inner.in_flight.push_back(Arc::clone(&msg));
                batch.push(msg);
            }
        }
        batch
    }

    /// Release the `n` oldest in-flight entries
    ///
    /// Called by the drain loop once it has delivered (or taken final
    /// responsibility for) a batch. Clamped to the in-flight count, so a
    /// repeated commit is a no-op rather than an error. Returns the number
    /// of entries actually released.
    pub fn commit(&self, n: usize) -> usize {
        let released = {
            let mut inner = self.inner.lock();
            let released = n.min(inner.in_flight.len());
            inner.in_flight.drain(..released);
            released
        };

        if released > 0 {
            self.committed.fetch_add(released as u64, Ordering::Relaxed);
            for _ in 0..released {
                self.space.notify_one();
            }
        }
        released
    }

    /// Return all in-flight entries to the front of the pending region
    ///
    /// Preserves original order, so redelivery stays FIFO. Returns the
    /// number of entries rolled back.
    pub fn rollback(&self) -> usize {
        let rolled_back = {
            let mut inner = self.inner.lock();
            let n = inner.in_flight.len();
            while let Some(msg) = inner.in_flight.pop_back() {
                inner.pending.push_front(msg);
            }
            n
        };

        if rolled_back > 0 {
            self.data.notify_one();
        }
        rolled_back
    }

    /// Close the queue
    ///
    /// Further offers fail with `Closed`; blocked offers wake with the same
    /// error. `poll_batch` keeps draining remaining entries immediately and
    /// returns empty once the queue is dry.
    pub fn close(&self) {
        {
            let mut inner = self.inner.lock();
            inner.closed = true;
        }
        self.space.notify_waiters();
        self.data.notify_waiters();
    }

    /// Check whether the queue has been closed
    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }

    /// Current entries, pending plus in-flight
    pub fn depth(&self) -> usize {
        self.inner.lock().depth()
    }

    /// Check whether the queue holds no entries at all
    pub fn is_empty(&self) -> bool {
        self.depth() == 0
    }

    /// Snapshot of the queue counters
    pub fn stats(&self) -> QueueStats {
        let (depth, in_flight) = {
            let inner = self.inner.lock();
            (inner.depth(), inner.in_flight.len())
        };
        QueueStats {
            offered: self.offered.load(Ordering::Relaxed),
            committed: self.committed.load(Ordering::Relaxed),
            evicted: self.evicted.load(Ordering::Relaxed),
            depth,
            in_flight,
        }
    }
}

impl std::fmt::Debug for MessageQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let stats = self.stats();
        f.debug_struct("MessageQueue")
            .field("capacity", &self.capacity)
            .field("depth", &stats.depth)
            .field("in_flight", &stats.in_flight)
            .field("closed", &self.is_closed())
            .finish()
    }
}
