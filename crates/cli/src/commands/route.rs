// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `idbus route` - subscribe one queue and publish events at it

use crate::output::{self, OutputFormat};
use anyhow::Result;
use clap::Args;
use idbus_core::{with_identifiers, Bus, BusConfig, CombinedIdentifiers, EntityIdentifier, StatsSnapshot};
use serde::Serialize;
use std::fmt;

#[derive(Args)]
pub struct RouteArgs {
    /// Identifier the queue subscribes to (repeatable)
    #[arg(long = "subscribe", value_name = "ID", required = true)]
    pub subscribe: Vec<EntityIdentifier>,

    /// Identifier to tag a published event with (repeatable, one event each)
    #[arg(long = "publish", value_name = "ID", required = true)]
    pub publish: Vec<EntityIdentifier>,

    /// Also tag each published event with its parent application
    #[arg(long)]
    pub with_parents: bool,

    /// Event name
    #[arg(long, default_value = "idbus.route")]
    pub name: String,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Debug, Serialize)]
struct Publish {
    identifier: String,
    delivered: bool,
}

#[derive(Debug, Serialize)]
struct RouteReport {
    subscribed: Vec<String>,
    published: Vec<Publish>,
    stats: StatsSnapshot,
}

impl fmt::Display for RouteReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for publish in &self.published {
            let verdict = if publish.delivered {
                "delivered"
            } else {
                "filtered"
            };
            writeln!(f, "{} {}", publish.identifier, verdict)?;
        }
        Ok(())
    }
}

pub fn route(args: RouteArgs, config: &BusConfig) -> Result<()> {
    let bus = Bus::new(config);
    let (tx, mut rx) = bus.channel()?;

    let spec: CombinedIdentifiers = args.subscribe.into_iter().collect();
    let handle = bus.subscribe(&spec, tx);

    let mut published = Vec::with_capacity(args.publish.len());
    for id in args.publish {
        let mut tags = CombinedIdentifiers::from(id.clone());
        if args.with_parents {
            tags = tags.with_parents();
        }
        let event = bus.event(
            args.name.as_str(),
            serde_json::Value::Null,
            [with_identifiers(tags)],
        );
        bus.publish(&event);

        let delivered = rx.try_recv().is_some_and(|received| received == event);
        published.push(Publish {
            identifier: id.to_string(),
            delivered,
        });
    }
    handle.cancel();

    let report = RouteReport {
        subscribed: spec.iter().map(ToString::to_string).collect(),
        published,
        stats: bus.filter().stats(),
    };
    output::print(&report, args.format);
    Ok(())
}
