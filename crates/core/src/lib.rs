// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! idbus-core: identifier-scoped in-process event routing
//!
//! This crate provides:
//! - Entity identifiers and their canonical filter keys
//! - Events stamped with a producer context
//! - Bounded delivery queues
//! - The identifier filter (subscribe, unsubscribe, notify)
//! - A bus that adds name-pattern routes on top of the filter

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

pub mod bus;
pub mod clock;
pub mod combined;
pub mod config;
pub mod event;
pub mod filter;
pub mod id;
pub mod identifiers;
pub mod queue;

pub use bus::{Bus, EventPattern, NameSubscriptionId, PublishOutcome};
pub use clock::{Clock, FakeClock, SystemClock};
pub use combined::{CombinedIdentifiers, Identifiers};
pub use config::{BusConfig, ConfigError};
pub use event::{with_correlation_id, with_identifiers, Event, EventOption, Producer};
pub use filter::{
    DropObserver, FilterOptions, IdentifierFilter, NotifyOutcome, StatsSnapshot,
    SubscriptionHandle,
};
pub use id::{EventId, IdGen, SequentialIdGen, UuidIdGen};
pub use identifiers::{derive_key, EntityIdentifier, EntityKind, IdentifierError, IdentifierKey};
pub use queue::{channel, Delivery, EventReceiver, EventSender, QueueError, QueueId};

pub use tokio_util::sync::CancellationToken;
