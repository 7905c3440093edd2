// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Publish entrypoint for platform components
//!
//! The bus stamps events with its producer context and fans them out on
//! two routes: the [`IdentifierFilter`] and name-pattern subscriptions.
//! The routes are independent; a queue registered on both receives one
//! copy per route.

mod pattern;

pub use pattern::EventPattern;

use crate::combined::CombinedIdentifiers;
use crate::config::BusConfig;
use crate::event::{Event, EventOption, Producer};
use crate::filter::{FilterOptions, IdentifierFilter, NotifyOutcome, SubscriptionHandle};
use crate::queue::{self, Delivery, EventReceiver, EventSender, QueueError};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Handle for removing a name-pattern subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NameSubscriptionId(u64);

#[derive(Debug)]
struct NameRoute {
    id: NameSubscriptionId,
    patterns: Vec<EventPattern>,
    sender: EventSender,
}

impl NameRoute {
    fn matches(&self, name: &str) -> bool {
        self.patterns.iter().any(|p| p.matches(name))
    }
}

/// What one publish did on each route
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PublishOutcome {
    pub identifiers: NotifyOutcome,
    pub names: NotifyOutcome,
}

impl PublishOutcome {
    pub fn delivered(&self) -> usize {
        self.identifiers.delivered + self.names.delivered
    }

    pub fn dropped(&self) -> usize {
        self.identifiers.dropped + self.names.dropped
    }
}

/// Explicitly owned event bus; clones share routes
#[derive(Clone, Debug)]
pub struct Bus {
    producer: Producer,
    filter: IdentifierFilter,
    names: Arc<RwLock<Vec<NameRoute>>>,
    next_route: Arc<AtomicU64>,
    queue_capacity: usize,
}

impl Bus {
    pub fn new(config: &BusConfig) -> Self {
        let filter = IdentifierFilter::with_options(FilterOptions {
            log_drops: config.log_drops,
            observer: None,
        });
        Self::from_parts(Producer::new(&config.origin), filter, config.queue_capacity)
    }

    pub fn from_parts(producer: Producer, filter: IdentifierFilter, queue_capacity: usize) -> Self {
        Self {
            producer,
            filter,
            names: Arc::new(RwLock::new(Vec::new())),
            next_route: Arc::new(AtomicU64::new(1)),
            queue_capacity,
        }
    }

    pub fn producer(&self) -> &Producer {
        &self.producer
    }

    pub fn filter(&self) -> &IdentifierFilter {
        &self.filter
    }

    /// A delivery queue with the configured capacity
    pub fn channel(&self) -> Result<(EventSender, EventReceiver), QueueError> {
        queue::channel(self.queue_capacity)
    }

    /// Build an event in this bus's producer context
    pub fn event(
        &self,
        name: impl Into<String>,
        payload: impl Into<serde_json::Value>,
        options: impl IntoIterator<Item = EventOption>,
    ) -> Event {
        Event::new(&self.producer, name, payload, options)
    }

    pub fn publish(&self, event: &Event) -> PublishOutcome {
        PublishOutcome {
            identifiers: self.filter.notify(event),
            names: self.notify_names(event),
        }
    }

    pub fn subscribe(&self, spec: &CombinedIdentifiers, sender: EventSender) -> SubscriptionHandle {
        self.filter.subscribe(spec, sender)
    }

    pub fn subscribe_until(
        &self,
        spec: &CombinedIdentifiers,
        sender: EventSender,
        cancel: CancellationToken,
    ) -> SubscriptionHandle {
        self.filter.subscribe_until(spec, sender, cancel)
    }

    pub fn unsubscribe(&self, spec: &CombinedIdentifiers, sender: &EventSender) -> bool {
        self.filter.unsubscribe(spec, sender)
    }

    /// Subscribe `sender` to every event whose name matches any pattern
    pub fn subscribe_names<P: Into<EventPattern>>(
        &self,
        patterns: impl IntoIterator<Item = P>,
        sender: EventSender,
    ) -> NameSubscriptionId {
        let id = NameSubscriptionId(self.next_route.fetch_add(1, Ordering::Relaxed));
        let patterns: Vec<EventPattern> = patterns.into_iter().map(Into::into).collect();
        debug!(queue = %sender.id(), patterns = patterns.len(), "subscribed to event names");
        self.names
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(NameRoute {
                id,
                patterns,
                sender,
            });
        id
    }

    pub fn unsubscribe_names(&self, id: NameSubscriptionId) -> bool {
        let mut routes = self.names.write().unwrap_or_else(|e| e.into_inner());
        let before = routes.len();
        routes.retain(|route| route.id != id);
        before != routes.len()
    }

    fn notify_names(&self, event: &Event) -> NotifyOutcome {
        let targets: Vec<EventSender> = {
            let routes = self.names.read().unwrap_or_else(|e| e.into_inner());
            let mut queues = HashSet::new();
            routes
                .iter()
                .filter(|route| route.matches(event.name()))
                .filter(|route| queues.insert(route.sender.id()))
                .map(|route| route.sender.clone())
                .collect()
        };

        let mut outcome = NotifyOutcome::default();
        let mut closed = HashSet::new();
        for sender in &targets {
            match sender.try_deliver(event) {
                Delivery::Delivered => outcome.delivered += 1,
                Delivery::Full => {
                    outcome.dropped += 1;
                    debug!(queue = %sender.id(), event = event.name(), "queue full, event dropped");
                }
                Delivery::Closed => {
                    closed.insert(sender.id());
                }
            }
        }
        outcome.matched = outcome.delivered + outcome.dropped;

        if !closed.is_empty() {
            self.names
                .write()
                .unwrap_or_else(|e| e.into_inner())
                .retain(|route| !closed.contains(&route.sender.id()));
        }
        outcome
    }

    pub fn name_subscription_count(&self) -> usize {
        self.names.read().unwrap_or_else(|e| e.into_inner()).len()
    }
}

impl Default for Bus {
    fn default() -> Self {
        Self::new(&BusConfig::default())
    }
}
