// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! idbus - drive the identifier event bus from the command line

mod commands;
mod output;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use commands::{parse, route, stress};
use idbus_core::BusConfig;
use std::path::PathBuf;
use std::process::ExitCode;

/// Environment variable holding the log filter directives
const LOG_ENV: &str = "IDBUS_LOG";

#[derive(Parser)]
#[command(
    name = "idbus",
    version,
    about = "Identifier-scoped event routing"
)]
struct Cli {
    /// Bus configuration file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Subscribe one queue and report which publishes reach it
    Route(route::RouteArgs),
    /// Hammer the filter from concurrent producers and subscribers
    Stress(stress::StressArgs),
    /// Validate identifiers and print their filter keys
    Parse(parse::ParseArgs),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    setup_logging();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Route(args) => route::route(args, &config),
        Commands::Stress(args) => stress::stress(args, &config).await,
        Commands::Parse(args) => parse::parse(args),
    }
}

fn load_config(path: Option<&std::path::Path>) -> Result<BusConfig> {
    match path {
        Some(path) => BusConfig::load(path)
            .with_context(|| format!("loading config {}", path.display())),
        None => Ok(BusConfig::default()),
    }
}

fn setup_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}
