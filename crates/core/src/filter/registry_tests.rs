// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::combined::CombinedIdentifiers;
use crate::identifiers::EntityIdentifier;
use crate::queue::{channel, EventReceiver};

fn spec(ids: &[&str]) -> CombinedIdentifiers {
    ids.iter().map(|id| id.parse::<EntityIdentifier>().unwrap()).collect()
}

fn entry(sender: &EventSender, generation: u64) -> Entry {
    Entry {
        sender: sender.clone(),
        generation,
        cancel: None,
        released: CancellationToken::new(),
    }
}

fn sub_key(sender: &EventSender, spec: &CombinedIdentifiers) -> SubscriptionKey {
    SubscriptionKey {
        queue: sender.id(),
        spec: spec.fingerprint().into(),
    }
}

fn queue() -> (EventSender, EventReceiver) {
    channel(4).unwrap()
}

#[test]
fn subscription_is_indexed_under_each_key_and_no_other() {
    let mut registry = Registry::default();
    let (tx, _rx) = queue();
    let foo = spec(&["application:foo", "user:foo"]);
    let sub = sub_key(&tx, &foo);

    registry.insert(sub.clone(), foo.keys(), entry(&tx, 1));

    let mut expected = foo.keys().to_vec();
    expected.sort();
    assert_eq!(registry.keys_of(&sub), expected);
    assert_eq!(registry.key_count(), 2);
    assert_eq!(registry.subscription_count(), 1);
}

#[test]
fn matching_deduplicates_by_queue() {
    let mut registry = Registry::default();
    let (tx, _rx) = queue();
    let a = spec(&["application:foo", "end_device:foo/dev"]);
    let b = spec(&["application:foo"]);
    registry.insert(sub_key(&tx, &a), a.keys(), entry(&tx, 1));
    registry.insert(sub_key(&tx, &b), b.keys(), entry(&tx, 2));

    let event_keys = spec(&["end_device:foo/dev", "application:foo"]);
    let matches = registry.matching(event_keys.keys());
    assert_eq!(matches.targets.len(), 1);
    assert_eq!(matches.targets[0].id(), tx.id());
}

#[test]
fn matching_spans_distinct_queues() {
    let mut registry = Registry::default();
    let (tx1, _rx1) = queue();
    let (tx2, _rx2) = queue();
    let s1 = spec(&["gateway:gw"]);
    let s2 = spec(&["organization:acme"]);
    registry.insert(sub_key(&tx1, &s1), s1.keys(), entry(&tx1, 1));
    registry.insert(sub_key(&tx2, &s2), s2.keys(), entry(&tx2, 2));

    let both = spec(&["gateway:gw", "organization:acme"]);
    assert_eq!(registry.matching(both.keys()).targets.len(), 2);

    let neither = spec(&["gateway:other"]);
    assert!(registry.matching(neither.keys()).targets.is_empty());
}

#[test]
fn reinsert_replaces_without_reindexing() {
    let mut registry = Registry::default();
    let (tx, _rx) = queue();
    let s = spec(&["client:c"]);
    let sub = sub_key(&tx, &s);

    assert!(registry.insert(sub.clone(), s.keys(), entry(&tx, 1)).is_none());
    let replaced = registry.insert(sub.clone(), s.keys(), entry(&tx, 2));

    assert_eq!(replaced.map(|e| e.generation), Some(1));
    assert_eq!(registry.generation_of(&sub), Some(2));
    assert_eq!(registry.subscription_count(), 1);
    assert_eq!(registry.key_count(), 1);
}

#[test]
fn remove_clears_empty_keys() {
    let mut registry = Registry::default();
    let (tx, _rx) = queue();
    let s = spec(&["application:foo", "user:bar"]);
    let sub = sub_key(&tx, &s);
    registry.insert(sub.clone(), s.keys(), entry(&tx, 1));

    assert!(registry.remove(&sub).is_some());
    assert!(registry.remove(&sub).is_none());
    assert_eq!(registry.key_count(), 0);
    assert_eq!(registry.subscription_count(), 0);
}

#[test]
fn remove_keeps_keys_shared_with_other_subscriptions() {
    let mut registry = Registry::default();
    let (tx1, _rx1) = queue();
    let (tx2, _rx2) = queue();
    let s = spec(&["application:foo"]);
    registry.insert(sub_key(&tx1, &s), s.keys(), entry(&tx1, 1));
    registry.insert(sub_key(&tx2, &s), s.keys(), entry(&tx2, 2));

    registry.remove(&sub_key(&tx1, &s));
    let matches = registry.matching(s.keys());
    assert_eq!(matches.targets.len(), 1);
    assert_eq!(matches.targets[0].id(), tx2.id());
}

#[test]
fn remove_generation_ignores_stale_generation() {
    let mut registry = Registry::default();
    let (tx, _rx) = queue();
    let s = spec(&["user:u"]);
    let sub = sub_key(&tx, &s);
    registry.insert(sub.clone(), s.keys(), entry(&tx, 1));
    registry.insert(sub.clone(), s.keys(), entry(&tx, 2));

    assert!(registry.remove_generation(&sub, 1).is_none());
    assert_eq!(registry.subscription_count(), 1);
    assert!(registry.remove_generation(&sub, 2).is_some());
    assert_eq!(registry.subscription_count(), 0);
}

#[test]
fn remove_queue_drops_all_of_its_subscriptions() {
    let mut registry = Registry::default();
    let (tx, _rx) = queue();
    let (other, _other_rx) = queue();
    let a = spec(&["user:a"]);
    let b = spec(&["user:b"]);
    registry.insert(sub_key(&tx, &a), a.keys(), entry(&tx, 1));
    registry.insert(sub_key(&tx, &b), b.keys(), entry(&tx, 2));
    registry.insert(sub_key(&other, &a), a.keys(), entry(&other, 3));

    assert_eq!(registry.remove_queue(tx.id()).len(), 2);
    assert_eq!(registry.subscription_count(), 1);
    assert_eq!(registry.key_count(), 1);
}

#[test]
fn cancelled_entries_are_reported_not_targeted() {
    let mut registry = Registry::default();
    let (tx, _rx) = queue();
    let s = spec(&["gateway:gw"]);
    let token = CancellationToken::new();
    let mut cancelled = entry(&tx, 7);
    cancelled.cancel = Some(token.clone());
    registry.insert(sub_key(&tx, &s), s.keys(), cancelled);

    assert_eq!(registry.matching(s.keys()).targets.len(), 1);

    token.cancel();
    let matches = registry.matching(s.keys());
    assert!(matches.targets.is_empty());
    assert_eq!(matches.cancelled, vec![(sub_key(&tx, &s), 7)]);
}

#[test]
fn cancelled_subscription_does_not_shadow_live_one_on_same_queue() {
    let mut registry = Registry::default();
    let (tx, _rx) = queue();
    let dead = spec(&["application:foo"]);
    let live = spec(&["application:foo", "user:u"]);

    let token = CancellationToken::new();
    token.cancel();
    let mut dead_entry = entry(&tx, 1);
    dead_entry.cancel = Some(token);
    registry.insert(sub_key(&tx, &dead), dead.keys(), dead_entry);
    registry.insert(sub_key(&tx, &live), live.keys(), entry(&tx, 2));

    let matches = registry.matching(dead.keys());
    assert_eq!(matches.targets.len(), 1);
    assert_eq!(matches.cancelled.len(), 1);
}
