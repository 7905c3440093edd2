// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Entity identifiers and registry key derivation
//!
//! An [`EntityIdentifier`] names one addressable platform entity. The
//! identifier's [`IdentifierKey`] is what the filter registry indexes on:
//! it covers kind and id only, so the parent of an end device is
//! informational and never takes part in matching.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Separates the kind tag from the id inside a key. Kind tags are fixed
/// ASCII words, so the split point of a key is always unambiguous.
const KEY_SEPARATOR: char = '\0';

/// Errors raised while constructing or parsing identifiers
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentifierError {
    #[error("{0} id must not be empty")]
    EmptyId(EntityKind),
    #[error("parent id of {0} must not be empty")]
    EmptyParent(EntityKind),
    #[error("{0} identifiers cannot carry a parent")]
    ParentNotAllowed(EntityKind),
    #[error("unknown entity kind: {0}")]
    UnknownKind(String),
    #[error("malformed identifier: {0}")]
    Malformed(String),
}

/// The kinds of entity an identifier can name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Application,
    Client,
    EndDevice,
    Gateway,
    Organization,
    User,
}

impl EntityKind {
    pub const ALL: [EntityKind; 6] = [
        EntityKind::Application,
        EntityKind::Client,
        EntityKind::EndDevice,
        EntityKind::Gateway,
        EntityKind::Organization,
        EntityKind::User,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::Application => "application",
            EntityKind::Client => "client",
            EntityKind::EndDevice => "end_device",
            EntityKind::Gateway => "gateway",
            EntityKind::Organization => "organization",
            EntityKind::User => "user",
        }
    }

    /// Only end devices are scoped under another entity (their application)
    pub fn supports_parent(self) -> bool {
        matches!(self, EntityKind::EndDevice)
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EntityKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| IdentifierError::UnknownKind(s.to_string()))
    }
}

/// Registry key derived from an identifier's kind and id
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentifierKey(String);

impl IdentifierKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The kind tag and id this key was derived from
    pub fn parts(&self) -> (&str, &str) {
        self.0
            .split_once(KEY_SEPARATOR)
            .unwrap_or((self.0.as_str(), ""))
    }
}

/// Derive the registry key of an identifier.
///
/// Injective over `(kind, id)`: two identifiers share a key exactly when
/// their kinds and ids are equal.
pub fn derive_key(id: &EntityIdentifier) -> IdentifierKey {
    let tag = id.kind.as_str();
    let mut key = String::with_capacity(tag.len() + 1 + id.id.len());
    key.push_str(tag);
    key.push(KEY_SEPARATOR);
    key.push_str(&id.id);
    IdentifierKey(key)
}

/// A tagged identifier naming one platform entity.
///
/// Text form is `kind:id`, or `end_device:application/device` for end
/// devices that carry their application. Ids and parents are
/// percent-encoded in the text form, so a `/` inside either never reads
/// as the parent separator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EntityIdentifier {
    kind: EntityKind,
    id: String,
    parent: Option<String>,
}

impl EntityIdentifier {
    pub fn new(
        kind: EntityKind,
        id: impl Into<String>,
        parent: Option<String>,
    ) -> Result<Self, IdentifierError> {
        let id = id.into();
        if id.is_empty() {
            return Err(IdentifierError::EmptyId(kind));
        }
        match &parent {
            Some(_) if !kind.supports_parent() => {
                return Err(IdentifierError::ParentNotAllowed(kind));
            }
            Some(parent) if parent.is_empty() => return Err(IdentifierError::EmptyParent(kind)),
            _ => {}
        }
        Ok(Self { kind, id, parent })
    }

    pub fn application(id: impl Into<String>) -> Result<Self, IdentifierError> {
        Self::new(EntityKind::Application, id, None)
    }

    pub fn client(id: impl Into<String>) -> Result<Self, IdentifierError> {
        Self::new(EntityKind::Client, id, None)
    }

    /// An end device scoped under its owning application
    pub fn end_device(
        application_id: impl Into<String>,
        device_id: impl Into<String>,
    ) -> Result<Self, IdentifierError> {
        Self::new(EntityKind::EndDevice, device_id, Some(application_id.into()))
    }

    pub fn gateway(id: impl Into<String>) -> Result<Self, IdentifierError> {
        Self::new(EntityKind::Gateway, id, None)
    }

    pub fn organization(id: impl Into<String>) -> Result<Self, IdentifierError> {
        Self::new(EntityKind::Organization, id, None)
    }

    pub fn user(id: impl Into<String>) -> Result<Self, IdentifierError> {
        Self::new(EntityKind::User, id, None)
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    pub fn key(&self) -> IdentifierKey {
        derive_key(self)
    }

    /// The application identifier an end device belongs to, if known
    pub fn parent_application(&self) -> Option<EntityIdentifier> {
        let parent = self.parent.as_ref()?;
        Some(EntityIdentifier {
            kind: EntityKind::Application,
            id: parent.clone(),
            parent: None,
        })
    }
}

impl fmt::Display for EntityIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let id = urlencoding::encode(&self.id);
        match &self.parent {
            Some(parent) => write!(f, "{}:{}/{}", self.kind, urlencoding::encode(parent), id),
            None => write!(f, "{}:{}", self.kind, id),
        }
    }
}

impl FromStr for EntityIdentifier {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, rest) = s
            .split_once(':')
            .ok_or_else(|| IdentifierError::Malformed(s.to_string()))?;
        let kind: EntityKind = kind.parse()?;
        let decode = |part: &str| {
            urlencoding::decode(part)
                .map(|decoded| decoded.into_owned())
                .map_err(|_| IdentifierError::Malformed(s.to_string()))
        };
        match rest.split_once('/') {
            Some((parent, id)) => Self::new(kind, decode(id)?, Some(decode(parent)?)),
            None => Self::new(kind, decode(rest)?, None),
        }
    }
}

impl TryFrom<String> for EntityIdentifier {
    type Error = IdentifierError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<EntityIdentifier> for String {
    fn from(value: EntityIdentifier) -> Self {
        value.to_string()
    }
}

#[cfg(test)]
#[path = "identifiers_tests.rs"]
mod tests;
