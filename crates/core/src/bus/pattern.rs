// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event name patterns
//!
//! Names are dot-separated (`gateway.connect`, `device.up.forward`).
//!   - Exact: `gateway.connect`
//!   - `*` matches one segment: `device.*` matches `device.up`, not `device.up.forward`
//!   - `**` matches the remainder, including nothing: `device.**`

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventPattern(String);

impl EventPattern {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self(pattern.into())
    }

    /// The pattern that matches every event name
    pub fn all() -> Self {
        Self::new("**")
    }

    pub fn matches(&self, name: &str) -> bool {
        // empty pattern matches nothing
        if self.0.is_empty() {
            return false;
        }

        let mut pattern = self.0.split('.');
        let mut segments = name.split('.');
        loop {
            match (pattern.next(), segments.next()) {
                (Some("**"), _) => return true,
                (None, None) => return true,
                (Some("*"), Some(_)) => {}
                (Some(p), Some(s)) if p == s => {}
                _ => return false,
            }
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EventPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EventPattern {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

#[cfg(test)]
#[path = "pattern_tests.rs"]
mod tests;
