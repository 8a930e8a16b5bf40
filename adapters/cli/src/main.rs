#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that runs a headless Gridguard session.

mod placement;

use std::{
    fs,
    path::PathBuf,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use anyhow::{bail, Context, Result};
use clap::Parser;
use gridguard_core::{GameContent, RunSnapshot};
use gridguard_engine::{Engine, EngineConfig, EngineObserver};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use placement::PlacementArg;

/// Command-line arguments accepted by the Gridguard CLI.
#[derive(Debug, Parser)]
#[command(name = "gridguard", about = "Runs a headless Gridguard session")]
struct CliArgs {
    /// Seed of the session RNG.
    #[arg(long, default_value = "gridguard")]
    seed: String,
    /// TOML content tables; the bundled reference tables are used when omitted.
    #[arg(long, value_name = "PATH")]
    content: Option<PathBuf>,
    /// Number of waves to play.
    #[arg(long, default_value_t = 1)]
    waves: u32,
    /// Upper bound of ticks simulated per wave.
    #[arg(long, default_value_t = 6_000)]
    ticks: u32,
    /// Length of a single tick in milliseconds.
    #[arg(long = "tick-ms", default_value_t = 50)]
    tick_ms: u64,
    /// Simulation speed multiplier.
    #[arg(long, default_value_t = 1.0)]
    speed: f32,
    /// Tower placement written as `<kind>@<x>,<y>`; may be repeated.
    #[arg(long = "place", value_name = "KIND@X,Y")]
    placements: Vec<PlacementArg>,
    /// Print the encoded save after the run.
    #[arg(long)]
    save: bool,
    /// Print one JSON snapshot per wave and the score submission.
    #[arg(long)]
    json: bool,
}

/// Observer that reports the end of the run through the log.
struct GameOverLog;

impl EngineObserver for GameOverLog {
    fn state_changed(&mut self, _snapshot: &RunSnapshot) {}

    fn game_over(&mut self, snapshot: &RunSnapshot) {
        warn!(
            wave = snapshot.wave,
            score = snapshot.score,
            "the base has fallen"
        );
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = CliArgs::parse();
    run(args)
}

fn run(args: CliArgs) -> Result<()> {
    if args.tick_ms == 0 {
        bail!("--tick-ms must be positive");
    }

    let content = load_content(args.content.as_ref())?;
    let mut engine = Engine::new(EngineConfig::new(args.seed.clone(), content))
        .context("failed to start session")?;
    engine.subscribe(Box::new(GameOverLog));
    engine.set_speed(args.speed);

    for placement in &args.placements {
        let _ = engine
            .try_place_tower(&placement.kind, placement.x, placement.y)
            .with_context(|| {
                format!(
                    "cannot place `{}` at ({}, {})",
                    placement.kind, placement.x, placement.y
                )
            })?;
    }

    let tick = Duration::from_millis(args.tick_ms);
    let mut elapsed = Duration::ZERO;
    for _ in 0..args.waves {
        if !engine.start_wave() {
            info!(wave = engine.wave(), "no further waves can be started");
            break;
        }

        let mut ticks = 0;
        while engine.is_wave_active() && !engine.is_game_over() && ticks < args.ticks {
            engine.update(tick);
            elapsed += tick;
            ticks += 1;
        }
        if engine.is_wave_active() && !engine.is_game_over() {
            warn!(wave = engine.wave(), ticks, "wave still running after the tick limit");
        }

        report(&engine.snapshot(), args.json)?;
        if engine.is_game_over() {
            break;
        }
    }

    if args.json {
        let submission = engine.score_submission("cli", elapsed);
        println!(
            "{}",
            serde_json::to_string(&submission).context("failed to encode score submission")?
        );
    }

    if args.save {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |since| u64::try_from(since.as_millis()).unwrap_or(u64::MAX));
        let encoded = engine
            .save(timestamp)
            .encode()
            .context("failed to encode save")?;
        println!("{encoded}");
    }

    Ok(())
}

fn load_content(path: Option<&PathBuf>) -> Result<GameContent> {
    let Some(path) = path else {
        return GameContent::standard().context("bundled content is invalid");
    };
    let source = fs::read_to_string(path)
        .with_context(|| format!("failed to read content from {}", path.display()))?;
    GameContent::from_toml_str(&source)
        .with_context(|| format!("invalid content in {}", path.display()))
}

fn report(snapshot: &RunSnapshot, json: bool) -> Result<()> {
    if json {
        println!(
            "{}",
            serde_json::to_string(snapshot).context("failed to encode snapshot")?
        );
    } else {
        println!(
            "wave {:>2}  lives {:>3}  cash {:>5}  score {:>7}",
            snapshot.wave, snapshot.lives, snapshot.cash, snapshot.score
        );
    }
    Ok(())
}
