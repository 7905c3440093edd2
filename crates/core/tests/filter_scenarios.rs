// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

//! End-to-end routing through the identifier filter
//!
//! Covers every entity kind, the unsubscribe path and the bus built from
//! a TOML config.

use idbus_core::{
    channel, with_identifiers, Bus, BusConfig, CombinedIdentifiers, EntityIdentifier, EntityKind,
    Event, IdentifierFilter, Producer,
};
use serde_json::json;
use std::time::Duration;

fn variant(kind: EntityKind, id: &str) -> EntityIdentifier {
    match kind {
        EntityKind::EndDevice => EntityIdentifier::end_device(id, id).unwrap(),
        _ => EntityIdentifier::new(kind, id, None).unwrap(),
    }
}

fn event_for(producer: &Producer, id: EntityIdentifier) -> Event {
    Event::new(producer, "test.event", json!(null), [with_identifiers(id)])
}

// =============================================================================
// Six entity kinds
// =============================================================================

#[test]
fn every_kind_routes_only_its_own_identifier() {
    let filter = IdentifierFilter::new();
    let producer = Producer::default();
    let (tx, mut rx) = channel(10).unwrap();

    let spec: CombinedIdentifiers = EntityKind::ALL
        .iter()
        .map(|&kind| variant(kind, "foo"))
        .collect();
    assert_eq!(spec.len(), 6);
    filter.subscribe(&spec, tx.clone());

    for kind in EntityKind::ALL {
        assert!(rx.is_empty(), "{kind}: queue not empty before notify");

        let bar = event_for(&producer, variant(kind, "bar"));
        let foo = event_for(&producer, variant(kind, "foo"));
        filter.notify(&bar);
        filter.notify(&foo);

        let received = rx.try_recv().expect("one delivery");
        assert_eq!(received, foo, "{kind}: wrong event delivered");
        assert!(rx.is_empty(), "{kind}: queue not empty after notify");
    }

    assert!(filter.unsubscribe(&spec, &tx));
    for kind in EntityKind::ALL {
        filter.notify(&event_for(&producer, variant(kind, "foo")));
    }
    assert!(rx.is_empty());
    assert_eq!(filter.key_count(), 0);
}

#[test]
fn single_application_subscription() {
    let filter = IdentifierFilter::new();
    let producer = Producer::default();
    let (tx, mut rx) = channel(10).unwrap();

    let foo = EntityIdentifier::application("foo").unwrap();
    filter.subscribe(&foo.clone().into(), tx);

    let miss = filter.notify(&event_for(&producer, EntityIdentifier::application("bar").unwrap()));
    assert_eq!(miss.delivered, 0);

    let event = event_for(&producer, foo);
    let hit = filter.notify(&event);
    assert_eq!(hit.delivered, 1);
    assert_eq!(rx.drain(), vec![event]);
}

// =============================================================================
// Bus
// =============================================================================

#[tokio::test]
async fn bus_from_toml_config_delivers_to_async_consumer() {
    let config = BusConfig::from_toml_str(
        r#"
        queue_capacity = 4
        origin = "network-server"
        "#,
    )
    .unwrap();
    let bus = Bus::new(&config);
    let (tx, mut rx) = bus.channel().unwrap();
    assert_eq!(rx.capacity(), 4);

    let device = EntityIdentifier::end_device("app-1", "dev-1").unwrap();
    let spec = CombinedIdentifiers::from(device.clone()).with_parents();
    bus.subscribe(&spec, tx);

    let consumer = tokio::spawn(async move { rx.recv_timeout(Duration::from_secs(5)).await });

    let app = EntityIdentifier::application("app-1").unwrap();
    let event = bus.event("as.up.data", json!({"f_port": 1}), [with_identifiers(app)]);
    assert_eq!(bus.publish(&event).delivered(), 1);

    let received = consumer.await.unwrap().expect("event before timeout");
    assert_eq!(received, event);
    assert_eq!(received.origin(), "network-server");
}
