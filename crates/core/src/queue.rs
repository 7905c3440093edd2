// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded delivery queues
//!
//! A queue is owned by one subscriber. Publishers only ever hold the
//! sending half and never wait on it: a full queue drops the event.

use crate::event::Event;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::{TryRecvError, TrySendError};

static NEXT_QUEUE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a delivery queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueueId(u64);

impl QueueId {
    fn next() -> Self {
        Self(NEXT_QUEUE_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for QueueId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "q{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    #[error("delivery queue capacity must be at least 1")]
    ZeroCapacity,
}

/// Result of a non-blocking delivery attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Delivered,
    /// Queue at capacity; the event was dropped for this subscriber
    Full,
    /// Receiver is gone
    Closed,
}

/// Create a bounded delivery queue
pub fn channel(capacity: usize) -> Result<(EventSender, EventReceiver), QueueError> {
    if capacity == 0 {
        return Err(QueueError::ZeroCapacity);
    }
    let id = QueueId::next();
    let (tx, rx) = mpsc::channel(capacity);
    Ok((
        EventSender { id, tx },
        EventReceiver { id, rx, capacity },
    ))
}

/// Sending half of a delivery queue. Equality and hashing use queue identity.
#[derive(Debug, Clone)]
pub struct EventSender {
    id: QueueId,
    tx: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn id(&self) -> QueueId {
        self.id
    }

    /// Enqueue without waiting
    pub fn try_deliver(&self, event: &Event) -> Delivery {
        match self.tx.try_send(event.clone()) {
            Ok(()) => Delivery::Delivered,
            Err(TrySendError::Full(_)) => Delivery::Full,
            Err(TrySendError::Closed(_)) => Delivery::Closed,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl PartialEq for EventSender {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for EventSender {}

impl Hash for EventSender {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// Receiving half of a delivery queue, read in FIFO order
#[derive(Debug)]
pub struct EventReceiver {
    id: QueueId,
    rx: mpsc::Receiver<Event>,
    capacity: usize,
}

impl EventReceiver {
    pub fn id(&self) -> QueueId {
        self.id
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Wait for the next event; `None` once every sender is gone and the
    /// queue is drained
    pub async fn recv(&mut self) -> Option<Event> {
        self.rx.recv().await
    }

    /// Blocking variant of [`recv`](Self::recv) for plain threads.
    /// Must not be called from within an async runtime.
    pub fn blocking_recv(&mut self) -> Option<Event> {
        self.rx.blocking_recv()
    }

    /// Wait at most `timeout` for the next event
    pub async fn recv_timeout(&mut self, timeout: Duration) -> Option<Event> {
        tokio::time::timeout(timeout, self.rx.recv())
            .await
            .ok()
            .flatten()
    }

    pub fn try_recv(&mut self) -> Option<Event> {
        match self.rx.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    /// Take everything currently queued
    pub fn drain(&mut self) -> Vec<Event> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    pub fn close(&mut self) {
        self.rx.close();
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
