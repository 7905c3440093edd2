// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Identifier filter: routes events to the queues subscribed to their
//! identifiers
//!
//! Matching is exact on identifier keys. An event reaches a queue when at
//! least one of its identifiers has the same kind and id as one in the
//! subscription's spec. Each queue receives an event at most once per
//! notify, however many of its keys match.
//!
//! Notify only holds the read lock while collecting target queues and
//! delivers after releasing it, so a consumer blocked on unsubscribe can
//! never stall a publisher. Delivery never waits: a full queue drops the
//! event for that subscriber and the drop is counted.

mod registry;
mod stats;

pub use stats::{DropObserver, NotifyOutcome, StatsSnapshot};

use crate::combined::CombinedIdentifiers;
use crate::event::Event;
use crate::queue::{Delivery, EventSender, QueueId};
use registry::{Entry, Registry, SubscriptionKey};
use stats::FilterStats;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

/// Construction options for [`IdentifierFilter`]
#[derive(Clone)]
pub struct FilterOptions {
    /// Log each dropped delivery at debug level
    pub log_drops: bool,
    pub observer: Option<Arc<dyn DropObserver>>,
}

impl Default for FilterOptions {
    fn default() -> Self {
        Self {
            log_drops: true,
            observer: None,
        }
    }
}

impl std::fmt::Debug for FilterOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterOptions")
            .field("log_drops", &self.log_drops)
            .field("observer", &self.observer.is_some())
            .finish()
    }
}

struct Shared {
    registry: RwLock<Registry>,
    stats: FilterStats,
    generation: AtomicU64,
    options: FilterOptions,
}

impl Shared {
    fn read(&self) -> RwLockReadGuard<'_, Registry> {
        self.registry.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Registry> {
        self.registry.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Remove a subscription, optionally only if it is still `generation`
    fn remove(&self, sub: &SubscriptionKey, generation: Option<u64>) -> bool {
        let removed = {
            let mut registry = self.write();
            match generation {
                Some(generation) => registry.remove_generation(sub, generation),
                None => registry.remove(sub),
            }
        };
        match removed {
            Some(entry) => {
                entry.released.cancel();
                true
            }
            None => false,
        }
    }

    fn prune(&self, cancelled: Vec<(SubscriptionKey, u64)>, closed: Vec<QueueId>) {
        let removed: Vec<Entry> = {
            let mut registry = self.write();
            let mut removed: Vec<Entry> = cancelled
                .iter()
                .filter_map(|(sub, generation)| registry.remove_generation(sub, *generation))
                .collect();
            for queue in &closed {
                removed.extend(registry.remove_queue(*queue));
            }
            removed
        };
        if removed.is_empty() {
            return;
        }
        for entry in &removed {
            entry.released.cancel();
        }
        self.stats.record_pruned(removed.len());
        debug!(
            pruned = removed.len(),
            closed_queues = closed.len(),
            "pruned stale subscriptions"
        );
    }
}

/// Concurrency-safe registry of identifier subscriptions.
///
/// Cloning is cheap and clones share the same registry.
#[derive(Clone)]
pub struct IdentifierFilter {
    shared: Arc<Shared>,
}

impl IdentifierFilter {
    pub fn new() -> Self {
        Self::with_options(FilterOptions::default())
    }

    pub fn with_options(options: FilterOptions) -> Self {
        Self {
            shared: Arc::new(Shared {
                registry: RwLock::new(Registry::default()),
                stats: FilterStats::default(),
                generation: AtomicU64::new(1),
                options,
            }),
        }
    }

    pub fn with_observer(observer: impl DropObserver + 'static) -> Self {
        Self::with_options(FilterOptions {
            observer: Some(Arc::new(observer)),
            ..FilterOptions::default()
        })
    }

    /// Subscribe `sender` to events tagged with any identifier in `spec`.
    ///
    /// Subscribing the same spec and queue again replaces the earlier
    /// registration rather than adding a second one. An empty spec
    /// registers nothing.
    pub fn subscribe(&self, spec: &CombinedIdentifiers, sender: EventSender) -> SubscriptionHandle {
        self.register(spec, sender, None).0
    }

    /// Like [`subscribe`](Self::subscribe), but the subscription is removed
    /// as soon as `cancel` fires.
    ///
    /// Removal runs on the current tokio runtime when there is one and on
    /// one shared watcher runtime otherwise. Notify also skips and prunes
    /// cancelled subscriptions, so delivery stops the moment the token
    /// fires.
    pub fn subscribe_until(
        &self,
        spec: &CombinedIdentifiers,
        sender: EventSender,
        cancel: CancellationToken,
    ) -> SubscriptionHandle {
        if cancel.is_cancelled() {
            trace!(queue = %sender.id(), "cancellation already fired, not subscribing");
            return SubscriptionHandle::detached();
        }
        let (handle, released) = self.register(spec, sender, Some(cancel.clone()));
        if let (Some(sub), Some(released)) = (handle.sub.clone(), released) {
            watch_cancellation(
                Arc::downgrade(&self.shared),
                sub,
                handle.generation,
                cancel,
                released,
            );
        }
        handle
    }

    fn register(
        &self,
        spec: &CombinedIdentifiers,
        sender: EventSender,
        cancel: Option<CancellationToken>,
    ) -> (SubscriptionHandle, Option<CancellationToken>) {
        if spec.is_empty() {
            trace!(queue = %sender.id(), "empty filter spec, nothing to register");
            return (SubscriptionHandle::detached(), None);
        }

        let queue = sender.id();
        let sub = SubscriptionKey {
            queue,
            spec: spec.fingerprint().into(),
        };
        let generation = self.shared.generation.fetch_add(1, Ordering::Relaxed);
        let released = CancellationToken::new();
        let entry = Entry {
            sender,
            generation,
            cancel,
            released: released.clone(),
        };

        let replaced = self.shared.write().insert(sub.clone(), spec.keys(), entry);
        if let Some(previous) = replaced {
            previous.released.cancel();
            debug!(%queue, keys = spec.len(), "subscription replaced");
        } else {
            debug!(%queue, keys = spec.len(), "subscribed");
        }

        let handle = SubscriptionHandle {
            shared: Arc::downgrade(&self.shared),
            sub: Some(sub),
            generation,
        };
        (handle, Some(released))
    }

    /// Remove the subscription of exactly this spec and queue.
    ///
    /// Returns false, and does nothing, if it is not registered.
    pub fn unsubscribe(&self, spec: &CombinedIdentifiers, sender: &EventSender) -> bool {
        let sub = SubscriptionKey {
            queue: sender.id(),
            spec: spec.fingerprint().into(),
        };
        let removed = self.shared.remove(&sub, None);
        if removed {
            debug!(queue = %sender.id(), "unsubscribed");
        } else {
            trace!(queue = %sender.id(), "unsubscribe of unknown subscription ignored");
        }
        removed
    }

    /// Deliver `event` to every queue subscribed to one of its identifiers
    pub fn notify(&self, event: &Event) -> NotifyOutcome {
        let keys = event.identifiers().keys();
        if keys.is_empty() {
            let outcome = NotifyOutcome::default();
            self.shared.stats.record(&outcome);
            return outcome;
        }

        let matches = self.shared.read().matching(keys);

        let mut outcome = NotifyOutcome::default();
        let mut closed = Vec::new();
        for sender in &matches.targets {
            match sender.try_deliver(event) {
                Delivery::Delivered => outcome.delivered += 1,
                Delivery::Full => {
                    outcome.dropped += 1;
                    self.on_drop(event, sender.id());
                }
                Delivery::Closed => closed.push(sender.id()),
            }
        }
        outcome.matched = outcome.delivered + outcome.dropped;
        self.shared.stats.record(&outcome);

        if !matches.cancelled.is_empty() || !closed.is_empty() {
            self.shared.prune(matches.cancelled, closed);
        }
        outcome
    }

    fn on_drop(&self, event: &Event, queue: QueueId) {
        let options = &self.shared.options;
        if options.log_drops {
            debug!(
                %queue,
                event = event.name(),
                event_id = %event.id(),
                "queue full, event dropped"
            );
        }
        if let Some(observer) = &options.observer {
            observer.on_drop(event, queue);
        }
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.shared.stats.snapshot()
    }

    /// Number of registered (spec, queue) subscriptions
    pub fn subscription_count(&self) -> usize {
        self.shared.read().subscription_count()
    }

    /// Number of identifier keys with at least one subscription
    pub fn key_count(&self) -> usize {
        self.shared.read().key_count()
    }
}

impl Default for IdentifierFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for IdentifierFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentifierFilter")
            .field("subscriptions", &self.subscription_count())
            .field("stats", &self.stats())
            .finish()
    }
}

/// Handle to one registration made by [`IdentifierFilter::subscribe`].
///
/// Dropping the handle leaves the subscription in place. A handle only
/// controls the registration it was returned for: once the same spec and
/// queue are subscribed again, the older handle no longer cancels anything.
#[derive(Debug, Clone)]
pub struct SubscriptionHandle {
    shared: Weak<Shared>,
    sub: Option<SubscriptionKey>,
    generation: u64,
}

impl SubscriptionHandle {
    fn detached() -> Self {
        Self {
            shared: Weak::new(),
            sub: None,
            generation: 0,
        }
    }

    pub fn queue(&self) -> Option<QueueId> {
        self.sub.as_ref().map(|sub| sub.queue)
    }

    pub fn is_active(&self) -> bool {
        match (self.shared.upgrade(), &self.sub) {
            (Some(shared), Some(sub)) => shared.read().generation_of(sub) == Some(self.generation),
            _ => false,
        }
    }

    /// Remove the subscription. Returns false if it was already gone.
    pub fn cancel(&self) -> bool {
        match (self.shared.upgrade(), &self.sub) {
            (Some(shared), Some(sub)) => shared.remove(sub, Some(self.generation)),
            _ => false,
        }
    }
}

impl Drop for Shared {
    fn drop(&mut self) {
        self.registry
            .get_mut()
            .unwrap_or_else(|e| e.into_inner())
            .release_all();
    }
}

impl std::fmt::Debug for Shared {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Shared").finish_non_exhaustive()
    }
}

fn watch_cancellation(
    shared: Weak<Shared>,
    sub: SubscriptionKey,
    generation: u64,
    cancel: CancellationToken,
    released: CancellationToken,
) {
    let watcher = async move {
        tokio::select! {
            _ = cancel.cancelled() => {
                let Some(shared) = shared.upgrade() else {
                    return;
                };
                if shared.remove(&sub, Some(generation)) {
                    shared.stats.record_pruned(1);
                    debug!(queue = %sub.queue, "subscription cancelled");
                }
            }
            _ = released.cancelled() => {}
        }
    };

    if let Ok(handle) = Handle::try_current() {
        handle.spawn(watcher);
        return;
    }
    match watcher_runtime() {
        Some(handle) => {
            handle.spawn(watcher);
        }
        // notify still prunes the subscription once the token fires
        None => warn!("no cancellation watcher runtime, relying on notify to prune"),
    }
}

/// Runtime shared by every watcher started outside a tokio runtime.
///
/// Started on first use and driven by one background thread for the rest
/// of the process.
fn watcher_runtime() -> Option<&'static Handle> {
    static WATCHER: OnceLock<Option<Handle>> = OnceLock::new();
    WATCHER.get_or_init(start_watcher_runtime).as_ref()
}

fn start_watcher_runtime() -> Option<Handle> {
    let runtime = match tokio::runtime::Builder::new_current_thread().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            warn!(error = %e, "cancellation watcher runtime could not start");
            return None;
        }
    };
    let handle = runtime.handle().clone();
    let spawned = std::thread::Builder::new()
        .name("idbus-cancel".to_string())
        .spawn(move || runtime.block_on(std::future::pending::<()>()));
    match spawned {
        Ok(_) => Some(handle),
        Err(e) => {
            warn!(error = %e, "cancellation watcher thread could not start");
            None
        }
    }
}
