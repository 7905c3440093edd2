// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `idbus parse <id>...` - validate identifiers and show their filter keys

use crate::output::{self, OutputFormat};
use anyhow::Result;
use clap::Args;
use idbus_core::EntityIdentifier;
use serde::Serialize;
use std::fmt;

#[derive(Args)]
pub struct ParseArgs {
    /// Identifiers in `kind:id` or `end_device:application/device` form
    #[arg(required = true)]
    pub identifiers: Vec<EntityIdentifier>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Debug, Serialize)]
struct Parsed {
    identifier: String,
    kind: String,
    id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    parent: Option<String>,
    key: String,
}

impl From<&EntityIdentifier> for Parsed {
    fn from(id: &EntityIdentifier) -> Self {
        Self {
            identifier: id.to_string(),
            kind: id.kind().to_string(),
            id: id.id().to_string(),
            parent: id.parent().map(str::to_string),
            key: id.key().as_str().escape_debug().to_string(),
        }
    }
}

impl fmt::Display for Parsed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} key={}", self.identifier, self.key)
    }
}

#[derive(Debug, Serialize)]
#[serde(transparent)]
struct ParseReport(Vec<Parsed>);

impl fmt::Display for ParseReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.iter().try_for_each(|parsed| write!(f, "{parsed}"))
    }
}

pub fn parse(args: ParseArgs) -> Result<()> {
    let report = ParseReport(args.identifiers.iter().map(Parsed::from).collect());
    output::print(&report, args.format);
    Ok(())
}
