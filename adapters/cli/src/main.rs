#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that runs a scripted, headless Tailchase session.

mod logging;
mod session;
mod settings;

use std::{path::PathBuf, time::Duration};

use anyhow::Result;
use clap::Parser;

use crate::{session::Session, settings::Settings};

/// Headless chase simulation driven by a scripted pointer.
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Number of ticks to simulate before stopping.
    #[arg(long, default_value_t = 3_600)]
    ticks: u32,
    /// Simulated milliseconds per tick.
    #[arg(long, default_value_t = 16)]
    tick_millis: u64,
    /// TOML file with `[simulation]` and `[session]` tables.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Overrides the seed used for agent tints.
    #[arg(long)]
    seed: Option<u64>,
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

/// Entry point for the Tailchase command-line interface.
fn main() -> Result<()> {
    let args = Args::parse();
    logging::init(args.verbose);

    let mut settings = Settings::load(args.config.as_deref())?;
    if let Some(seed) = args.seed {
        settings.simulation.rng_seed = seed;
    }

    let mut session = Session::new(settings)?;
    let report = session.run(args.ticks, Duration::from_millis(args.tick_millis));
    println!("{report}");
    Ok(())
}
