// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The key -> subscription index behind the identifier filter.
//!
//! Every registered subscription is indexed under each key of its spec and
//! under no other key. Callers serialize access.

use crate::identifiers::IdentifierKey;
use crate::queue::{EventSender, QueueId};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Identity of a subscription: one queue bound to one filter spec
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct SubscriptionKey {
    pub queue: QueueId,
    pub spec: Arc<str>,
}

#[derive(Debug, Clone)]
pub(crate) struct Entry {
    pub sender: EventSender,
    /// Distinguishes a re-subscription from the one it replaced
    pub generation: u64,
    pub cancel: Option<CancellationToken>,
    /// Fired once the entry leaves the registry
    pub released: CancellationToken,
}

impl Entry {
    pub fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancellationToken::is_cancelled)
    }
}

#[derive(Debug)]
struct Registered {
    keys: Vec<IdentifierKey>,
    entry: Entry,
}

/// Outcome of matching an event's keys against the registry
#[derive(Debug, Default)]
pub(crate) struct Matches {
    /// One sender per distinct queue
    pub targets: Vec<EventSender>,
    /// Matching subscriptions whose cancellation already fired
    pub cancelled: Vec<(SubscriptionKey, u64)>,
}

#[derive(Debug, Default)]
pub(crate) struct Registry {
    by_key: HashMap<IdentifierKey, HashSet<SubscriptionKey>>,
    subscriptions: HashMap<SubscriptionKey, Registered>,
}

impl Registry {
    /// Register `sub` under `keys`, replacing an earlier registration of
    /// the same subscription. Returns the replaced entry.
    pub fn insert(
        &mut self,
        sub: SubscriptionKey,
        keys: &[IdentifierKey],
        entry: Entry,
    ) -> Option<Entry> {
        let registered = Registered {
            keys: keys.to_vec(),
            entry,
        };
        match self.subscriptions.insert(sub.clone(), registered) {
            // same spec fingerprint, so the index is already in place
            Some(previous) => Some(previous.entry),
            None => {
                for key in keys {
                    self.by_key
                        .entry(key.clone())
                        .or_default()
                        .insert(sub.clone());
                }
                None
            }
        }
    }

    pub fn remove(&mut self, sub: &SubscriptionKey) -> Option<Entry> {
        let registered = self.subscriptions.remove(sub)?;
        for key in &registered.keys {
            if let Some(subs) = self.by_key.get_mut(key) {
                subs.remove(sub);
                if subs.is_empty() {
                    self.by_key.remove(key);
                }
            }
        }
        Some(registered.entry)
    }

    /// Remove `sub` only if it is still the registration `generation` made
    pub fn remove_generation(&mut self, sub: &SubscriptionKey, generation: u64) -> Option<Entry> {
        match self.subscriptions.get(sub) {
            Some(registered) if registered.entry.generation == generation => self.remove(sub),
            _ => None,
        }
    }

    /// Remove every subscription bound to `queue`
    pub fn remove_queue(&mut self, queue: QueueId) -> Vec<Entry> {
        let subs: Vec<SubscriptionKey> = self
            .subscriptions
            .keys()
            .filter(|sub| sub.queue == queue)
            .cloned()
            .collect();
        subs.iter().filter_map(|sub| self.remove(sub)).collect()
    }

    pub fn generation_of(&self, sub: &SubscriptionKey) -> Option<u64> {
        self.subscriptions.get(sub).map(|r| r.entry.generation)
    }

    /// Collect the queues subscribed to any of `keys`, each queue once
    pub fn matching(&self, keys: &[IdentifierKey]) -> Matches {
        let mut matches = Matches::default();
        let mut visited: HashSet<&SubscriptionKey> = HashSet::new();
        let mut queues: HashSet<QueueId> = HashSet::new();

        for key in keys {
            let Some(subs) = self.by_key.get(key) else {
                continue;
            };
            for sub in subs {
                if !visited.insert(sub) {
                    continue;
                }
                let Some(registered) = self.subscriptions.get(sub) else {
                    continue;
                };
                let entry = &registered.entry;
                if entry.is_cancelled() {
                    matches.cancelled.push((sub.clone(), entry.generation));
                    continue;
                }
                if queues.insert(sub.queue) {
                    matches.targets.push(entry.sender.clone());
                }
            }
        }
        matches
    }

    /// Stop every cancellation watcher still waiting on an entry
    pub fn release_all(&self) {
        for registered in self.subscriptions.values() {
            registered.entry.released.cancel();
        }
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn key_count(&self) -> usize {
        self.by_key.len()
    }

    /// Keys `sub` is indexed under, sorted
    #[cfg(test)]
    pub fn keys_of(&self, sub: &SubscriptionKey) -> Vec<IdentifierKey> {
        let mut keys: Vec<_> = self
            .by_key
            .iter()
            .filter(|(_, subs)| subs.contains(sub))
            .map(|(key, _)| key.clone())
            .collect();
        keys.sort();
        keys
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
