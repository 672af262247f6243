//! Headless town runner.
//!
//! Seeds the default cast, ticks in real time for a while (or until
//! Ctrl-C) and prints every NPC's status as JSON on exit.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use townsim_runtime::Simulation;
use townsim_runtime::config::{Overrides, load_town_config};
use townsim_runtime::telemetry::init_tracing;
use tracing::info;

/// Command line arguments for the town runner
#[derive(Parser, Debug)]
#[command(name = "townsim")]
#[command(about = "Run a small town of wandering, chatting NPCs")]
struct Args {
    /// TOML configuration file
    #[arg(long, env = "TOWNSIM_CONFIG")]
    config: Option<PathBuf>,

    /// Number of ticks to run before exiting
    #[arg(long, default_value_t = 600)]
    ticks: u64,

    /// Random seed for reproducibility
    #[arg(long)]
    seed: Option<u64>,

    /// Tick interval in milliseconds
    #[arg(long)]
    interval_ms: Option<u64>,

    /// Text generation provider: none, ollama, openai
    #[arg(long)]
    provider: Option<String>,

    /// Log as JSON lines
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = load_town_config(args.config.as_deref())?;
    Overrides {
        seed: args.seed,
        tick_interval_ms: args.interval_ms,
        provider: args.provider.clone(),
    }
    .apply(&mut config);
    config.validate().context("invalid configuration after overrides")?;
    init_tracing(&config.general.log_level, args.json_logs);

    let interval = Duration::from_millis(config.general.tick_interval_ms);
    let sim = Simulation::from_config(config)?;
    sim.initialize_gateway().await;
    info!(
        npcs = sim.all_npc_statuses().len(),
        generated_dialogue = sim.gateway_ready(),
        "town seeded"
    );

    sim.start();
    let run_for = interval.saturating_mul(u32::try_from(args.ticks).unwrap_or(u32::MAX));
    tokio::select! {
        () = tokio::time::sleep(run_for) => {}
        _ = tokio::signal::ctrl_c() => info!("interrupted"),
    }
    sim.stop();

    let statuses = sim.all_npc_statuses();
    println!("{}", serde_json::to_string_pretty(&statuses)?);
    Ok(())
}
