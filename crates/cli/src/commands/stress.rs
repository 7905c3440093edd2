// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `idbus stress` - concurrent publish and subscription churn
//!
//! Producers publish from blocking threads while consumer tasks drain their
//! queues and a churn thread keeps subscribing and unsubscribing an
//! overlapping spec on every queue. Each consumer checks that events from
//! one producer arrive in publish order.

use crate::output::{self, OutputFormat};
use anyhow::{bail, Result};
use clap::Args;
use idbus_core::{
    channel, with_identifiers, Bus, BusConfig, CombinedIdentifiers, EntityIdentifier, Event,
    EventReceiver, EventSender,
};
use serde::Serialize;
use serde_json::json;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Args)]
pub struct StressArgs {
    /// Publishing threads
    #[arg(long, default_value_t = 4)]
    pub producers: usize,

    /// Subscriber queues
    #[arg(long, default_value_t = 8)]
    pub subscribers: usize,

    /// Events published by each producer
    #[arg(long, default_value_t = 1_000)]
    pub events: u64,

    /// Queue capacity (defaults to the configured capacity)
    #[arg(long)]
    pub capacity: Option<usize>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Debug, Default, Serialize)]
struct StressReport {
    producers: usize,
    subscribers: usize,
    published: u64,
    delivered: u64,
    dropped: u64,
    received: u64,
    violations: u64,
}

impl fmt::Display for StressReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "producers:   {}", self.producers)?;
        writeln!(f, "subscribers: {}", self.subscribers)?;
        writeln!(f, "published:   {}", self.published)?;
        writeln!(f, "delivered:   {}", self.delivered)?;
        writeln!(f, "dropped:     {}", self.dropped)?;
        writeln!(f, "received:    {}", self.received)?;
        let order = if self.violations == 0 { "ok" } else { "violated" };
        writeln!(f, "order:       {}", order)
    }
}

/// Per-queue check that each producer's events arrive in sequence order
#[derive(Debug, Default)]
struct OrderCheck {
    last: HashMap<u64, u64>,
    received: u64,
    violations: u64,
}

impl OrderCheck {
    fn observe(&mut self, event: &Event) {
        self.received += 1;
        let (Some(producer), Some(seq)) = (
            event.payload()["producer"].as_u64(),
            event.payload()["seq"].as_u64(),
        ) else {
            warn!(event = %event.id(), "event without sequence payload");
            self.violations += 1;
            return;
        };
        if let Some(&previous) = self.last.get(&producer) {
            if seq <= previous {
                warn!(producer, seq, previous, "out-of-order delivery");
                self.violations += 1;
            }
        }
        self.last.insert(producer, seq);
    }
}

async fn consume(mut rx: EventReceiver) -> OrderCheck {
    let mut check = OrderCheck::default();
    while let Some(event) = rx.recv().await {
        check.observe(&event);
    }
    check
}

fn gateway(n: usize) -> Result<EntityIdentifier> {
    Ok(EntityIdentifier::gateway(format!("gw-{n}"))?)
}

fn application(n: usize) -> Result<EntityIdentifier> {
    Ok(EntityIdentifier::application(format!("app-{}", n % 2))?)
}

/// Identifiers carried by every event of producer `p`
fn producer_tags(p: usize) -> Result<CombinedIdentifiers> {
    Ok([gateway(p)?, application(p)?].into_iter().collect())
}

/// Spec of subscriber `n`, overlapping with at least one other subscriber
fn subscriber_spec(n: usize, producers: usize) -> Result<CombinedIdentifiers> {
    Ok([gateway(n % producers)?, application(n)?].into_iter().collect())
}

pub async fn stress(args: StressArgs, config: &BusConfig) -> Result<()> {
    if args.producers == 0 || args.subscribers == 0 {
        bail!("--producers and --subscribers must be at least 1");
    }
    let capacity = args.capacity.unwrap_or(config.queue_capacity);
    let bus = Bus::new(config);

    let mut queues: Vec<(CombinedIdentifiers, EventSender)> = Vec::new();
    let mut consumers = Vec::new();
    for n in 0..args.subscribers {
        let (tx, rx) = channel(capacity)?;
        let spec = subscriber_spec(n, args.producers)?;
        bus.subscribe(&spec, tx.clone());
        queues.push((spec, tx));
        consumers.push(tokio::spawn(consume(rx)));
    }
    info!(
        producers = args.producers,
        subscribers = args.subscribers,
        capacity,
        "stress run started"
    );

    let done = Arc::new(AtomicBool::new(false));
    let churn = {
        let bus = bus.clone();
        let done = Arc::clone(&done);
        let senders: Vec<EventSender> = queues.iter().map(|(_, tx)| tx.clone()).collect();
        let overlap = producer_tags(0)?;
        tokio::task::spawn_blocking(move || {
            while !done.load(Ordering::Relaxed) {
                for tx in &senders {
                    bus.subscribe(&overlap, tx.clone());
                }
                std::thread::yield_now();
                for tx in &senders {
                    bus.unsubscribe(&overlap, tx);
                }
            }
        })
    };

    let mut producers = Vec::new();
    for p in 0..args.producers {
        let bus = bus.clone();
        let tags = producer_tags(p)?;
        let events = args.events;
        producers.push(tokio::task::spawn_blocking(move || {
            let mut totals = (0u64, 0u64);
            for seq in 0..events {
                let event = bus.event(
                    "stress.tick",
                    json!({"producer": p, "seq": seq}),
                    [with_identifiers(&tags)],
                );
                let outcome = bus.publish(&event);
                totals.0 += outcome.delivered() as u64;
                totals.1 += outcome.dropped() as u64;
            }
            totals
        }));
    }

    let mut report = StressReport {
        producers: args.producers,
        subscribers: args.subscribers,
        published: args.producers as u64 * args.events,
        ..StressReport::default()
    };
    for producer in producers {
        let (delivered, dropped) = producer.await?;
        report.delivered += delivered;
        report.dropped += dropped;
    }

    done.store(true, Ordering::Relaxed);
    churn.await?;

    // Release every sender so the consumers see their queues close
    for (spec, tx) in queues {
        bus.unsubscribe(&spec, &tx);
    }
    for consumer in consumers {
        let check = consumer.await?;
        report.received += check.received;
        report.violations += check.violations;
    }

    output::print(&report, args.format);
    if report.violations > 0 {
        bail!("{} ordering violations", report.violations);
    }
    Ok(())
}
