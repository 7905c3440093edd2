// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Delivery accounting for the identifier filter

use crate::event::Event;
use crate::queue::QueueId;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Hook told about every delivery dropped because a queue was full
pub trait DropObserver: Send + Sync {
    fn on_drop(&self, event: &Event, queue: QueueId);
}

impl<F> DropObserver for F
where
    F: Fn(&Event, QueueId) + Send + Sync,
{
    fn on_drop(&self, event: &Event, queue: QueueId) {
        self(event, queue)
    }
}

/// What a single notify did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NotifyOutcome {
    /// Distinct queues the event matched whose receiver was still open
    pub matched: usize,
    pub delivered: usize,
    pub dropped: usize,
}

/// Running totals since the filter was created
#[derive(Debug, Default)]
pub(crate) struct FilterStats {
    notified: AtomicU64,
    delivered: AtomicU64,
    dropped: AtomicU64,
    pruned: AtomicU64,
}

impl FilterStats {
    pub fn record(&self, outcome: &NotifyOutcome) {
        self.notified.fetch_add(1, Ordering::Relaxed);
        self.delivered
            .fetch_add(outcome.delivered as u64, Ordering::Relaxed);
        self.dropped
            .fetch_add(outcome.dropped as u64, Ordering::Relaxed);
    }

    pub fn record_pruned(&self, count: usize) {
        self.pruned.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            notified: self.notified.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            pruned: self.pruned.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of the filter counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub notified: u64,
    pub delivered: u64,
    pub dropped: u64,
    /// Subscriptions removed because their queue closed or their
    /// cancellation fired before anyone unsubscribed
    pub pruned: u64,
}
