// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::clock::FakeClock;
use crate::id::SequentialIdGen;
use crate::identifiers::EntityIdentifier;
use serde_json::json;
use std::time::Duration;

fn producer() -> Producer {
    Producer::new("test")
        .with_clock(FakeClock::at_timestamp(1_000))
        .with_id_gen(SequentialIdGen::new("evt"))
}

#[test]
fn new_event_stamps_id_time_and_origin() {
    let event = Event::new(&producer(), "test.created", json!({"n": 1}), []);
    assert_eq!(event.id().as_str(), "evt-1");
    assert_eq!(event.name(), "test.created");
    assert_eq!(event.time().timestamp(), 1_000);
    assert_eq!(event.origin(), "test");
    assert_eq!(event.payload(), &json!({"n": 1}));
    assert!(event.identifiers().is_empty());
}

#[test]
fn time_follows_injected_clock() {
    let clock = FakeClock::at_timestamp(10);
    let producer = Producer::new("test").with_clock(clock.clone());

    let first = Event::new(&producer, "a", json!(null), []);
    clock.advance(Duration::from_secs(5));
    let second = Event::new(&producer, "a", json!(null), []);

    assert_eq!(first.time().timestamp(), 10);
    assert_eq!(second.time().timestamp(), 15);
}

#[test]
fn identifier_options_accumulate_without_duplicates() {
    let dev = EntityIdentifier::end_device("foo", "bar").unwrap();
    let app = EntityIdentifier::application("foo").unwrap();

    let event = Event::new(
        &producer(),
        "device.up",
        json!(null),
        [
            with_identifiers(&dev),
            with_identifiers(&app),
            with_identifiers(vec![app.clone(), dev.clone()]),
        ],
    );

    let ids: Vec<_> = event.identifiers().iter().cloned().collect();
    assert_eq!(ids, vec![dev, app]);
}

#[test]
fn correlation_ids_merge_producer_and_options() {
    let producer = producer().with_correlation_id("req:1");
    let event = Event::new(
        &producer,
        "a",
        json!(null),
        [with_correlation_id("job:7"), with_correlation_id("req:1")],
    );

    let ids: Vec<_> = event.correlation_ids().iter().map(String::as_str).collect();
    assert_eq!(ids, vec!["job:7", "req:1"]);
}

#[test]
fn derived_producer_does_not_change_parent() {
    let parent = producer();
    let child = parent.with_correlation_id("x");
    assert!(parent.correlation_ids().is_empty());
    assert_eq!(child.correlation_ids().len(), 1);
    assert_eq!(child.origin(), "test");
}

#[test]
fn clones_share_the_same_event() {
    let event = Event::new(&producer(), "a", json!(null), []);
    let copy = event.clone();
    assert!(event.ptr_eq(&copy));
    assert_eq!(event, copy);
}

#[test]
fn events_with_different_ids_are_not_equal() {
    let producer = producer();
    let a = Event::new(&producer, "a", json!(null), []);
    let b = Event::new(&producer, "a", json!(null), []);
    assert_ne!(a, b);
}

#[test]
fn serde_round_trip_preserves_content() {
    let event = Event::new(
        &producer(),
        "gateway.connect",
        json!({"addr": "10.0.0.1"}),
        [with_identifiers(EntityIdentifier::gateway("gw-1").unwrap())],
    );

    let json = serde_json::to_value(&event).unwrap();
    assert_eq!(json["name"], "gateway.connect");
    assert_eq!(json["identifiers"], json!(["gateway:gw-1"]));

    let back: Event = serde_json::from_value(json).unwrap();
    assert_eq!(back, event);
    assert!(!back.ptr_eq(&event));
}
