// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Events and the producer context that builds them
//!
//! An [`Event`] is immutable once built and cheap to clone: every delivery
//! queue that receives it shares the same allocation.

use crate::clock::{Clock, SystemClock};
use crate::combined::{CombinedIdentifiers, Identifiers};
use crate::id::{EventId, IdGen, UuidIdGen};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

/// Context an event is produced in.
///
/// Supplies the clock, the id source, the origin name and any correlation
/// ids inherited by every event built from it.
#[derive(Clone)]
pub struct Producer {
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGen>,
    origin: Arc<str>,
    correlation_ids: BTreeSet<String>,
}

impl Producer {
    pub fn new(origin: impl Into<String>) -> Self {
        Self {
            clock: Arc::new(SystemClock),
            ids: Arc::new(UuidIdGen),
            origin: origin.into().into(),
            correlation_ids: BTreeSet::new(),
        }
    }

    pub fn with_clock(mut self, clock: impl Clock) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn with_id_gen(mut self, ids: impl IdGen) -> Self {
        self.ids = Arc::new(ids);
        self
    }

    /// Derive a producer whose events all carry `correlation_id`
    pub fn with_correlation_id(&self, correlation_id: impl Into<String>) -> Self {
        let mut derived = self.clone();
        derived.correlation_ids.insert(correlation_id.into());
        derived
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn correlation_ids(&self) -> &BTreeSet<String> {
        &self.correlation_ids
    }
}

impl Default for Producer {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_ORIGIN)
    }
}

impl fmt::Debug for Producer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Producer")
            .field("origin", &self.origin)
            .field("correlation_ids", &self.correlation_ids)
            .finish_non_exhaustive()
    }
}

/// Option applied while building an event
#[derive(Debug, Clone)]
pub enum EventOption {
    Identifiers(CombinedIdentifiers),
    CorrelationId(String),
}

/// Tag the event with every identifier `ids` carries. May be repeated.
pub fn with_identifiers<I: Identifiers>(ids: I) -> EventOption {
    EventOption::Identifiers(ids.combined_identifiers())
}

pub fn with_correlation_id(id: impl Into<String>) -> EventOption {
    EventOption::CorrelationId(id.into())
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct EventData {
    id: EventId,
    name: String,
    time: DateTime<Utc>,
    identifiers: CombinedIdentifiers,
    payload: serde_json::Value,
    correlation_ids: BTreeSet<String>,
    origin: String,
}

/// An immutable record of something that happened to one or more entities
#[derive(Debug, Clone, PartialEq)]
pub struct Event(Arc<EventData>);

impl Event {
    pub fn new(
        producer: &Producer,
        name: impl Into<String>,
        payload: impl Into<serde_json::Value>,
        options: impl IntoIterator<Item = EventOption>,
    ) -> Self {
        let mut identifiers = CombinedIdentifiers::new();
        let mut correlation_ids = producer.correlation_ids.clone();
        for option in options {
            match option {
                EventOption::Identifiers(ids) => identifiers.extend_from(&ids),
                EventOption::CorrelationId(id) => {
                    correlation_ids.insert(id);
                }
            }
        }

        Self(Arc::new(EventData {
            id: producer.ids.next_id(),
            name: name.into(),
            time: producer.clock.now(),
            identifiers,
            payload: payload.into(),
            correlation_ids,
            origin: producer.origin.to_string(),
        }))
    }

    pub fn id(&self) -> &EventId {
        &self.0.id
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn time(&self) -> DateTime<Utc> {
        self.0.time
    }

    pub fn identifiers(&self) -> &CombinedIdentifiers {
        &self.0.identifiers
    }

    pub fn payload(&self) -> &serde_json::Value {
        &self.0.payload
    }

    pub fn correlation_ids(&self) -> &BTreeSet<String> {
        &self.0.correlation_ids
    }

    pub fn origin(&self) -> &str {
        &self.0.origin
    }

    /// True if both handles refer to the same published event
    pub fn ptr_eq(&self, other: &Event) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Serialize for Event {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Event {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        EventData::deserialize(deserializer).map(|data| Event(Arc::new(data)))
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
