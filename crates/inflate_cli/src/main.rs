//! inflate - replay input scripts against the pump and emotion simulation
//!
//! Usage:
//!   inflate run --script steps.json     # Fixed-step replay, JSON lines on stdout
//!   inflate run --script steps.json --realtime
//!   inflate demo                        # Built-in pump stroke scene
//!   inflate config                      # Print the effective configuration

mod script;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use inflate_core::{SimConfig, Simulation};
use inflate_rig::{RigConfig, RigSmoother, SimulationDriver};
use script::{Replay, ReplayLine, Script};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tokio::time::{sleep_until, Duration, Instant};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "inflate")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the config file (missing file means defaults)
    #[arg(short, long, global = true, default_value = "inflate.toml", env = "INFLATE_CONFIG")]
    config: PathBuf,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Replay a JSON input script
    Run {
        /// Script file: [{ "secs": 1.0, "input": { ... } }, ...]
        #[arg(short, long)]
        script: PathBuf,

        #[command(flatten)]
        replay: ReplayArgs,
    },

    /// Replay the built-in demo scene
    Demo {
        #[command(flatten)]
        replay: ReplayArgs,
    },

    /// Print the effective configuration as TOML
    Config,
}

#[derive(clap::Args, Debug)]
struct ReplayArgs {
    /// Tick length in seconds for fixed-step replay
    #[arg(long, default_value_t = 1.0 / 72.0)]
    dt: f32,

    /// Print every Nth tick (the final tick is always printed)
    #[arg(long, default_value_t = 1)]
    every: u64,

    /// Run against the wall clock at the configured tick rate instead
    #[arg(long)]
    realtime: bool,
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // stdout carries the replay output
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// A config file that exists must be valid; only a missing one means defaults.
fn load_config(path: &Path) -> Result<(SimConfig, RigConfig)> {
    if !path.exists() {
        info!("No config at {}, using defaults", path.display());
        return Ok((SimConfig::load_or_default(path), RigConfig::default()));
    }

    let sim = SimConfig::load(path)
        .with_context(|| format!("Invalid simulation config in {}", path.display()))?;
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    let rig = RigConfig::from_toml(&content)
        .with_context(|| format!("Invalid [rig] section in {}", path.display()))?;
    Ok((sim, rig))
}

fn print_line(out: &mut impl Write, line: &ReplayLine) -> Result<()> {
    serde_json::to_writer(&mut *out, line).context("Failed to encode output line")?;
    writeln!(out)?;
    Ok(())
}

fn replay_fixed(sim: SimConfig, rig: &RigConfig, script: &Script, args: &ReplayArgs) -> Result<()> {
    let mut sim = Simulation::new(sim).context("Invalid simulation config")?;
    let smoother = RigSmoother::new(rig.smoothing, rig.surprise_bypass_threshold);
    let mut replay = Replay::new(args.dt, args.every, rig.curves.clone(), smoother)?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    replay.run(&mut sim, script, |line| print_line(&mut out, line))?;
    out.flush()?;

    info!(ticks = sim.ticks(), "Replay finished");
    Ok(())
}

async fn replay_realtime(
    sim: SimConfig,
    rig: &RigConfig,
    script: &Script,
    args: &ReplayArgs,
) -> Result<()> {
    let sim = Simulation::new(sim).context("Invalid simulation config")?;
    let driver = SimulationDriver::spawn(sim, rig);
    let mut outputs = driver.subscribe();
    let every = args.every.max(1);

    let start = Instant::now();
    let mut deadline = start;
    let mut seen = 0u64;
    let stdout = io::stdout();

    for step in &script.steps {
        driver.set_input(step.input);
        deadline += Duration::try_from_secs_f32(step.secs)
            .with_context(|| format!("Step duration {} s is out of range", step.secs))?;

        loop {
            tokio::select! {
                _ = sleep_until(deadline) => break,
                changed = outputs.changed() => {
                    changed.context("Simulation driver stopped")?;
                    seen += 1;
                    if seen % every == 0 {
                        let line = ReplayLine {
                            t: start.elapsed().as_secs_f64(),
                            output: *outputs.borrow_and_update(),
                            frame: driver.frame(),
                        };
                        print_line(&mut stdout.lock(), &line)?;
                    }
                }
            }
        }
    }

    let line = ReplayLine {
        t: start.elapsed().as_secs_f64(),
        output: driver.output(),
        frame: driver.frame(),
    };
    print_line(&mut stdout.lock(), &line)?;

    let sim = driver.shutdown().await?;
    info!(ticks = sim.ticks(), "Realtime replay finished");
    Ok(())
}

async fn replay(sim: SimConfig, rig: &RigConfig, script: &Script, args: &ReplayArgs) -> Result<()> {
    info!(
        steps = script.steps.len(),
        secs = script.total_secs(),
        realtime = args.realtime,
        "Replaying script"
    );
    if args.realtime {
        replay_realtime(sim, rig, script, args).await
    } else {
        replay_fixed(sim, rig, script, args)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let (sim, rig) = load_config(&cli.config)?;

    match cli.command {
        Commands::Run { script, replay: args } => {
            let script = Script::load(&script)?;
            replay(sim, &rig, &script, &args).await
        }
        Commands::Demo { replay: args } => replay(sim, &rig, &Script::demo(), &args).await,
        Commands::Config => {
            print!("{}", sim.to_toml()?);
            println!();
            print!("{}", rig.to_toml()?);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_config(name: &str, content: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("inflate-{}-{}.toml", name, std::process::id()));
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_invalid_config_file_is_an_error() {
        let path = temp_config("invalid", "[pump]\npump_volume = -5.0\nfill_ceiling = -1.0\n");
        let result = load_config(&path);
        std::fs::remove_file(&path).unwrap();

        let err = result.unwrap_err();
        assert!(format!("{:#}", err).contains("pump"), "{:#}", err);
    }

    #[test]
    fn test_invalid_rig_section_is_an_error() {
        let path = temp_config("bad-rig", "[rig]\nsmoothing = 2.0\n");
        let result = load_config(&path);
        std::fs::remove_file(&path).unwrap();
        assert!(result.is_err());
    }

    #[test]
    fn test_valid_config_file_is_used() {
        let path = temp_config("valid", "[pump]\npump_volume = 0.3\n\n[rig]\ntick_hz = 90.0\n");
        let result = load_config(&path);
        std::fs::remove_file(&path).unwrap();

        let (sim, rig) = result.unwrap();
        assert_eq!(sim.pump.pump_volume, 0.3);
        assert_eq!(rig.tick_hz, 90.0);
    }

    #[test]
    fn test_missing_config_file_uses_defaults() {
        let path = std::env::temp_dir().join("inflate-does-not-exist.toml");
        let (_, rig) = load_config(&path).unwrap();
        assert_eq!(rig, RigConfig::default());
    }
}
