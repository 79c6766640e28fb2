#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that runs Ledge Runner headlessly.

mod audio;
mod config;
mod preferences;
mod simulation;

use std::{path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use clap::Parser;
use ledge_runner_world::query;
use tracing::info;

use crate::{
    audio::LoggingAudio, config::GameConfig, preferences::Preferences, simulation::Simulation,
};

/// Headless Ledge Runner simulation.
#[derive(Debug, Parser)]
#[command(name = "ledge-runner", version, about)]
struct Args {
    /// Game configuration file. Absent files select the stock game.
    #[arg(long, default_value = "ledge-runner.toml")]
    config: PathBuf,
    /// File holding the persisted ability preference.
    #[arg(long, default_value = "ledge-runner-prefs.toml")]
    preferences: PathBuf,
    /// Simulated seconds to run before stopping.
    #[arg(long, default_value_t = 30.0)]
    seconds: f32,
    /// Overrides the spawn placement seed.
    #[arg(long)]
    seed: Option<u64>,
    /// Rendered frames per simulated second.
    #[arg(long, default_value_t = 60)]
    frame_rate: u32,
    /// Persists the ability preference (0 none, 1 health, 2 slow fall, 3 super jump) and exits.
    #[arg(long, value_name = "N")]
    select_ability: Option<i64>,
}

/// Entry point for the Ledge Runner command-line interface.
fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    if let Some(ability) = args.select_ability {
        let preferences = Preferences { ability };
        preferences.save(&args.preferences)?;
        info!(ability = ?preferences.ability(), "ability preference saved");
        return Ok(());
    }

    let preferences = Preferences::load(&args.preferences)?;
    let mut config = GameConfig::load(&args.config)?;
    if let Some(seed) = args.seed {
        config.spawning.seed = seed;
    }

    let mut simulation = Simulation::new(&config, preferences.ability(), LoggingAudio::default())?;
    println!("{}", query::welcome_banner(simulation.world()));

    let frame = Duration::from_secs(1) / args.frame_rate.max(1);
    let total = Duration::try_from_secs_f32(args.seconds.max(0.0))
        .with_context(|| format!("invalid run length {}", args.seconds))?;
    let mut elapsed = Duration::ZERO;
    while elapsed < total && !simulation.is_finished() {
        simulation.frame(frame);
        elapsed += frame;
    }

    let lifecycle = simulation.lifecycle();
    info!(
        frames = simulation.frames(),
        level = lifecycle.current_level().get(),
        phase = ?lifecycle.phase(),
        agents = query::agent_count(simulation.world()),
        cues = simulation.audio().played(),
        "run finished"
    );
    println!("{}", lifecycle.survived_message());
    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}
