//! Headless Bridgehead runner.
//!
//! This binary runs the simulation without graphics, controlled via JSON on
//! stdin/stdout.
//!
//! # Usage
//!
//! ```bash
//! # Interactive mode - read commands from stdin
//! cargo run -p bridgehead_headless
//!
//! # Interactive mode over a scenario file
//! cargo run -p bridgehead_headless -- run --scenario island.ron --auto-state
//!
//! # Print the terrain for a seed
//! cargo run -p bridgehead_headless -- render --seed 12345
//!
//! # Check that a scenario replays identically
//! cargo run -p bridgehead_headless -- verify --runs 8 --ticks 3600
//! ```
//!
//! # Protocol
//!
//! Input (stdin): JSON commands, one per line
//! Output (stdout): JSON responses, one per line
//! Logs (stderr): Debug information
//!
//! See the protocol module for command/response format.

use std::error::Error;
use std::io;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bridgehead_headless::{
    ascii::{render_simulation, AsciiConfig},
    runner::{HeadlessConfig, HeadlessRunner},
    scenario::{Scenario, ScenarioError},
    verify::verify_scenario,
};

#[derive(Parser)]
#[command(name = "bridgehead_headless")]
#[command(about = "Headless Bridgehead runner for scripted control and CI")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run an interactive JSON-lines session
    Run {
        /// Scenario file to load
        #[arg(short, long)]
        scenario: Option<PathBuf>,

        /// Output state after every tick command
        #[arg(long)]
        auto_state: bool,
    },

    /// Print a scenario's starting map as ASCII
    Render {
        /// Scenario file to load (defaults to the classic island)
        #[arg(short, long)]
        scenario: Option<PathBuf>,

        /// Terrain seed, overriding the scenario's
        #[arg(long)]
        seed: Option<u64>,

        /// Ticks to simulate before rendering
        #[arg(short, long, default_value = "0")]
        ticks: u64,

        /// Omit the legend
        #[arg(long)]
        no_legend: bool,
    },

    /// Verify determinism by running a scenario several times in parallel
    Verify {
        /// Scenario file to load (defaults to the classic island)
        #[arg(short, long)]
        scenario: Option<PathBuf>,

        /// Number of verification runs
        #[arg(short, long, default_value = "5")]
        runs: u32,

        /// Ticks per run
        #[arg(short, long, default_value = "3600")]
        ticks: u64,
    },
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging to stderr (stdout is for protocol)
    let log_level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_ansi(true),
        )
        .with(tracing_subscriber::filter::LevelFilter::from_level(
            log_level,
        ))
        .init();

    let result = match cli.command {
        Some(Commands::Run {
            scenario,
            auto_state,
        }) => cmd_run(scenario, auto_state),
        Some(Commands::Render {
            scenario,
            seed,
            ticks,
            no_legend,
        }) => cmd_render(scenario, seed, ticks, no_legend),
        Some(Commands::Verify {
            scenario,
            runs,
            ticks,
        }) => cmd_verify(scenario, runs, ticks),
        None => cmd_run(None, false),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn load_scenario(path: Option<PathBuf>) -> Result<Scenario, ScenarioError> {
    match path {
        Some(path) => Scenario::load(path),
        None => Ok(Scenario::default()),
    }
}

/// Run an interactive session on stdin/stdout
fn cmd_run(scenario: Option<PathBuf>, auto_state: bool) -> Result<(), Box<dyn Error>> {
    tracing::info!("Starting interactive session");

    let scenario = load_scenario(scenario)?;
    let config = HeadlessConfig {
        auto_state_output: auto_state,
    };
    let mut runner = HeadlessRunner::from_scenario(&scenario, config)?;

    let stdin = io::stdin();
    runner.run(stdin.lock(), io::stdout().lock())?;
    Ok(())
}

/// Print the map to stdout
fn cmd_render(
    scenario: Option<PathBuf>,
    seed: Option<u64>,
    ticks: u64,
    no_legend: bool,
) -> Result<(), Box<dyn Error>> {
    let mut scenario = load_scenario(scenario)?;
    if let Some(seed) = seed {
        scenario.terrain.seed = seed;
    }

    let mut sim = scenario.build()?;
    for _ in 0..ticks {
        sim.tick();
    }

    let config = AsciiConfig {
        show_units: true,
        show_legend: !no_legend,
    };
    print!("{}", render_simulation(&sim, config));
    Ok(())
}

/// Verify determinism across parallel runs
fn cmd_verify(scenario: Option<PathBuf>, runs: u32, ticks: u64) -> Result<(), Box<dyn Error>> {
    let scenario = load_scenario(scenario)?;
    let report = verify_scenario(&scenario, runs, ticks)?;

    if report.is_deterministic() {
        eprintln!("PASS: All {} runs produced identical results", runs);
    } else {
        eprintln!("FAIL: Non-determinism detected!");
        eprintln!("  Unique hashes: {} (expected 1)", report.unique_hashes());
        eprintln!("  Hashes: {:?}", report.hashes);
        std::process::exit(1);
    }
    Ok(())
}
