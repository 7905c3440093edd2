// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Combined identifier sets
//!
//! The same flattening builds the tag set of an event and the filter spec
//! of a subscription, which is what makes exact-key matching well defined.

use crate::identifiers::{EntityIdentifier, IdentifierKey};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt::Write as _;

/// Values that carry one or more entity identifiers
pub trait Identifiers {
    /// Append this value's identifiers to `out`, in order
    fn collect_into(&self, out: &mut CombinedIdentifiers);

    fn combined_identifiers(&self) -> CombinedIdentifiers {
        let mut out = CombinedIdentifiers::new();
        self.collect_into(&mut out);
        out
    }
}

impl Identifiers for EntityIdentifier {
    fn collect_into(&self, out: &mut CombinedIdentifiers) {
        out.push(self.clone());
    }
}

impl Identifiers for CombinedIdentifiers {
    fn collect_into(&self, out: &mut CombinedIdentifiers) {
        for id in &self.ids {
            out.push(id.clone());
        }
    }
}

impl Identifiers for [EntityIdentifier] {
    fn collect_into(&self, out: &mut CombinedIdentifiers) {
        for id in self {
            out.push(id.clone());
        }
    }
}

impl<const N: usize> Identifiers for [EntityIdentifier; N] {
    fn collect_into(&self, out: &mut CombinedIdentifiers) {
        self.as_slice().collect_into(out);
    }
}

impl Identifiers for Vec<EntityIdentifier> {
    fn collect_into(&self, out: &mut CombinedIdentifiers) {
        self.as_slice().collect_into(out);
    }
}

impl<T: Identifiers + ?Sized> Identifiers for &T {
    fn collect_into(&self, out: &mut CombinedIdentifiers) {
        (**self).collect_into(out);
    }
}

/// Ordered identifiers without semantic duplicates.
///
/// Two identifiers are duplicates when their keys match; the first one
/// pushed is kept.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<EntityIdentifier>", into = "Vec<EntityIdentifier>")]
pub struct CombinedIdentifiers {
    ids: Vec<EntityIdentifier>,
    keys: Vec<IdentifierKey>,
    seen: HashSet<IdentifierKey>,
}

impl CombinedIdentifiers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flatten any identifier-bearing value
    pub fn from_identifiers<I: Identifiers + ?Sized>(value: &I) -> Self {
        let mut out = Self::new();
        value.collect_into(&mut out);
        out
    }

    /// Add an identifier; returns false if its key was already present
    pub fn push(&mut self, id: EntityIdentifier) -> bool {
        let key = id.key();
        if !self.seen.insert(key.clone()) {
            return false;
        }
        self.keys.push(key);
        self.ids.push(id);
        true
    }

    pub fn extend_from<I: Identifiers + ?Sized>(&mut self, value: &I) {
        value.collect_into(self);
    }

    /// Also tag the owning application of every end device in the set
    pub fn with_parents(mut self) -> Self {
        let parents: Vec<_> = self
            .ids
            .iter()
            .filter_map(EntityIdentifier::parent_application)
            .collect();
        for parent in parents {
            self.push(parent);
        }
        self
    }

    pub fn contains(&self, id: &EntityIdentifier) -> bool {
        self.seen.contains(&id.key())
    }

    pub fn contains_key(&self, key: &IdentifierKey) -> bool {
        self.seen.contains(key)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, EntityIdentifier> {
        self.ids.iter()
    }

    /// Registry keys, in identifier order
    pub fn keys(&self) -> &[IdentifierKey] {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Stable text naming this set of keys, whatever order they were
    /// pushed in.
    ///
    /// Keys are sorted and length-prefixed, so distinct key sets never
    /// produce the same fingerprint.
    pub fn fingerprint(&self) -> String {
        let mut sorted: Vec<&IdentifierKey> = self.keys.iter().collect();
        sorted.sort_unstable();
        let mut out = String::new();
        for key in sorted {
            let _ = write!(out, "{}:{};", key.as_str().len(), key.as_str());
        }
        out
    }
}

impl From<Vec<EntityIdentifier>> for CombinedIdentifiers {
    fn from(ids: Vec<EntityIdentifier>) -> Self {
        ids.into_iter().collect()
    }
}

impl From<CombinedIdentifiers> for Vec<EntityIdentifier> {
    fn from(value: CombinedIdentifiers) -> Self {
        value.ids
    }
}

impl From<EntityIdentifier> for CombinedIdentifiers {
    fn from(id: EntityIdentifier) -> Self {
        let mut out = Self::new();
        out.push(id);
        out
    }
}

impl FromIterator<EntityIdentifier> for CombinedIdentifiers {
    fn from_iter<T: IntoIterator<Item = EntityIdentifier>>(iter: T) -> Self {
        let mut out = Self::new();
        for id in iter {
            out.push(id);
        }
        out
    }
}

impl<'a> IntoIterator for &'a CombinedIdentifiers {
    type Item = &'a EntityIdentifier;
    type IntoIter = std::slice::Iter<'a, EntityIdentifier>;

    fn into_iter(self) -> Self::IntoIter {
        self.ids.iter()
    }
}

#[cfg(test)]
#[path = "combined_tests.rs"]
mod tests;
