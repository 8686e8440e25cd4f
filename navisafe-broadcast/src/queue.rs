//! Bounded drop-oldest event queue
//!
//! `send` never blocks and never fails while the queue is open: when the
//! queue is full the oldest event is discarded to make room.

use navisafe_core::TrackingEvent;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Notify;
use tracing::debug;

/// Counters for a queue
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStats {
    /// Events accepted by `send`
    pub accepted: u64,
    /// Events discarded because the queue was full
    pub dropped: u64,
    /// Events handed to a consumer
    pub delivered: u64,
    /// Events currently waiting
    pub pending: usize,
}

struct QueueState {
    events: VecDeque<TrackingEvent>,
    accepted: u64,
    dropped: u64,
    delivered: u64,
    closed: bool,
}

struct Inner {
    capacity: usize,
    state: Mutex<QueueState>,
    notify: Notify,
}

/// Cloneable handle to a shared event queue
#[derive(Clone)]
pub struct EventQueue {
    inner: Arc<Inner>,
}

impl EventQueue {
    /// Create a queue holding at most `capacity` events (minimum 1)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            inner: Arc::new(Inner {
                capacity,
                state: Mutex::new(QueueState {
                    events: VecDeque::with_capacity(capacity),
                    accepted: 0,
                    dropped: 0,
                    delivered: 0,
                    closed: false,
                }),
                notify: Notify::new(),
            }),
        }
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    /// Enqueue an event. Returns false if the queue is closed.
    pub fn send(&self, event: TrackingEvent) -> bool {
        {
            let mut state = self.inner.state.lock();
            if state.closed {
                return false;
            }

            if state.events.len() >= self.inner.capacity {
                if let Some(old) = state.events.pop_front() {
                    state.dropped += 1;
                    debug!("Broadcast queue full, dropped {} event", old.channel());
                }
            }

            state.events.push_back(event);
            state.accepted += 1;
        }

        self.inner.notify.notify_one();
        true
    }

    /// Take the next event without waiting
    pub fn try_recv(&self) -> Option<TrackingEvent> {
        let mut state = self.inner.state.lock();
        let event = state.events.pop_front();
        if event.is_some() {
            state.delivered += 1;
        }
        event
    }

    /// Wait for the next event. Returns `None` once the queue is closed and
    /// empty.
    pub async fn recv(&self) -> Option<TrackingEvent> {
        loop {
            let notified = self.inner.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut state = self.inner.state.lock();
                if let Some(event) = state.events.pop_front() {
                    state.delivered += 1;
                    return Some(event);
                }
                if state.closed {
                    return None;
                }
            }

            notified.await;
        }
    }

    /// Take everything currently queued
    pub fn drain(&self) -> Vec<TrackingEvent> {
        let mut state = self.inner.state.lock();
        let events: Vec<_> = state.events.drain(..).collect();
        state.delivered += events.len() as u64;
        events
    }

    /// Stop accepting events and wake any waiting consumer. Queued events
    /// can still be received.
    pub fn close(&self) {
        self.inner.state.lock().closed = true;
        self.inner.notify.notify_waiters();
    }

    pub fn is_closed(&self) -> bool {
        self.inner.state.lock().closed
    }

    pub fn len(&self) -> usize {
        self.inner.state.lock().events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> QueueStats {
        let state = self.inner.state.lock();
        QueueStats {
            accepted: state.accepted,
            dropped: state.dropped,
            delivered: state.delivered,
            pending: state.events.len(),
        }
    }
}
