//! Delivery queue between the capture worker and the consumer loop.
//!
//! Architecture:
//! - Producer (capture worker): never blocks. When a bounded queue is full the
//!   **oldest** queued event is discarded to make room, so capture stays fresh.
//! - Consumer (GUI/render thread): never blocks either. `try_next` returns `None`
//!   immediately on an empty queue.
//!
//! The queue is a `crossbeam-channel`. The sender half keeps a clone of the
//! receiver so it can evict from the head on overflow; eviction and the consumer
//! race on the same lock-free channel, so FIFO order is preserved either way.

use crate::event::PointerEvent;
use crossbeam_channel::{bounded, unbounded, Receiver, Sender, TrySendError};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Default bounded capacity.
pub const DEFAULT_CAPACITY: usize = 1024;

/// Queue counters, shared by both halves.
#[derive(Debug, Default)]
pub struct QueueStats {
    /// Events accepted by `push`.
    pub pushed: AtomicU64,
    /// Events evicted by the drop-oldest policy.
    pub dropped: AtomicU64,
    /// Events handed to the consumer.
    pub consumed: AtomicU64,
    /// Events discarded by `clear`.
    pub cleared: AtomicU64,
    /// Highest occupancy observed after a push.
    pub peak_occupancy: AtomicU64,
}

impl QueueStats {
    pub fn pushed(&self) -> u64 {
        self.pushed.load(Ordering::Relaxed)
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn consumed(&self) -> u64 {
        self.consumed.load(Ordering::Relaxed)
    }

    pub fn cleared(&self) -> u64 {
        self.cleared.load(Ordering::Relaxed)
    }

    pub fn peak_occupancy(&self) -> u64 {
        self.peak_occupancy.load(Ordering::Relaxed)
    }
}

/// Create a delivery queue.
///
/// `Some(n)` gives a bounded drop-oldest queue of `n` events (minimum 1);
/// `None` gives an unbounded, lossless queue.
pub fn event_queue(capacity: Option<usize>) -> (EventSender, EventReceiver) {
    let (tx, rx) = match capacity {
        Some(n) => bounded(n.max(1)),
        None => unbounded(),
    };
    let stats = Arc::new(QueueStats::default());

    (
        EventSender {
            tx,
            evict: rx.clone(),
            stats: Arc::clone(&stats),
        },
        EventReceiver { rx, stats },
    )
}

/// Producer half (capture worker side).
#[derive(Clone)]
pub struct EventSender {
    tx: Sender<PointerEvent>,
    evict: Receiver<PointerEvent>,
    stats: Arc<QueueStats>,
}

impl EventSender {
    /// Enqueue without blocking. Returns `true` if an older event was evicted.
    pub fn push(&self, event: PointerEvent) -> bool {
        let mut pending = event;
        let mut evicted = false;

        loop {
            match self.tx.try_send(pending) {
                Ok(()) => break,
                Err(TrySendError::Full(back)) => {
                    // The consumer may win the race for the head; then the retry
                    // simply succeeds without an eviction.
                    if self.evict.try_recv().is_ok() {
                        self.stats.dropped.fetch_add(1, Ordering::Relaxed);
                        evicted = true;
                    }
                    pending = back;
                }
                // Unreachable while `evict` keeps the channel alive.
                Err(TrySendError::Disconnected(_)) => return evicted,
            }
        }

        self.stats.pushed.fetch_add(1, Ordering::Relaxed);
        self.stats
            .peak_occupancy
            .fetch_max(self.tx.len() as u64, Ordering::Relaxed);
        evicted
    }

    pub fn stats(&self) -> Arc<QueueStats> {
        Arc::clone(&self.stats)
    }
}

/// Consumer half (GUI side).
#[derive(Clone)]
pub struct EventReceiver {
    rx: Receiver<PointerEvent>,
    stats: Arc<QueueStats>,
}

impl EventReceiver {
    /// Take the next event, or `None` right away if nothing is queued.
    pub fn try_next(&self) -> Option<PointerEvent> {
        let ev = self.rx.try_recv().ok()?;
        self.stats.consumed.fetch_add(1, Ordering::Relaxed);
        Some(ev)
    }

    /// Take everything queued at the time of the call, oldest first.
    ///
    /// Events pushed while draining are left for the next call, so a busy
    /// producer cannot keep the consumer here forever.
    pub fn drain(&self) -> Vec<PointerEvent> {
        let available = self.rx.len();
        let mut out = Vec::with_capacity(available);
        for _ in 0..available {
            match self.try_next() {
                Some(ev) => out.push(ev),
                None => break,
            }
        }
        out
    }

    /// Discard everything currently queued. Returns how many events were dropped.
    pub fn clear(&self) -> usize {
        let mut n = 0;
        while self.rx.try_recv().is_ok() {
            n += 1;
        }
        self.stats.cleared.fetch_add(n as u64, Ordering::Relaxed);
        n
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    /// `None` for an unbounded queue.
    #[inline]
    pub fn capacity(&self) -> Option<usize> {
        self.rx.capacity()
    }

    pub fn stats(&self) -> Arc<QueueStats> {
        Arc::clone(&self.stats)
    }
}
