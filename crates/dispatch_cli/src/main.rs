use std::path::PathBuf;
use std::process::exit;

use clap::{Parser, ValueEnum};
use dispatch_core::clock::ONE_SEC_MS;
use dispatch_core::config::{PatrolMode, SolverKind};
use dispatch_core::{DispatchConfig, DispatchError, DispatchSimulation};
use tracing::info;

// ── CLI definition ─────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "dispatch",
    about = "Run the grid taxi dispatch simulation headlessly",
    long_about = "Builds a city from a TOML config (or the defaults), runs it for a\n\
                  fixed amount of simulated time and prints a summary or a JSON snapshot."
)]
struct Cli {
    /// TOML config file; missing sections fall back to defaults
    #[arg(long, env = "DISPATCH_CONFIG")]
    config: Option<PathBuf>,
    /// Simulated seconds to run
    #[arg(long, default_value_t = 600)]
    duration_secs: u64,
    /// Override the RNG seed from the config
    #[arg(long)]
    seed: Option<u64>,
    /// Override the primary solver
    #[arg(long, value_enum)]
    solver: Option<SolverArg>,
    /// Keep idle taxis in place instead of random-walking
    #[arg(long)]
    hold: bool,
    /// Print the final snapshot as JSON instead of a summary
    #[arg(long)]
    json: bool,
    /// Print every outbound event as a JSON line while running
    #[arg(long)]
    events: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum SolverArg {
    Hungarian,
    Greedy,
}

impl From<SolverArg> for SolverKind {
    fn from(arg: SolverArg) -> Self {
        match arg {
            SolverArg::Hungarian => SolverKind::Hungarian,
            SolverArg::Greedy => SolverKind::Greedy,
        }
    }
}

// ── helpers ────────────────────────────────────────────────────────

fn load_config(cli: &Cli) -> Result<DispatchConfig, DispatchError> {
    let mut config = match &cli.config {
        Some(path) => DispatchConfig::from_toml_file(path)?,
        None => DispatchConfig::default(),
    };
    if let Some(seed) = cli.seed {
        config = config.with_seed(seed);
    }
    if let Some(solver) = cli.solver {
        config = config.with_solver(solver.into());
    }
    if cli.hold {
        config = config.with_patrol(PatrolMode::Hold);
    }
    if !cli.events {
        // Nothing drains the queue without --events.
        config.events.enabled = false;
    }
    config.validate()?;
    Ok(config)
}

fn print_events(sim: &mut DispatchSimulation) {
    for event in sim.drain_events() {
        match serde_json::to_string(&event) {
            Ok(line) => println!("{line}"),
            Err(error) => eprintln!("warning: failed to encode event: {error}"),
        }
    }
}

fn run(cli: &Cli) -> Result<(), DispatchError> {
    let config = load_config(cli)?;
    let mut sim = DispatchSimulation::new(config)?;
    let end_ms = cli.duration_secs.saturating_mul(ONE_SEC_MS);
    info!(duration_secs = cli.duration_secs, "running dispatch simulation");

    let mut steps = 0;
    if cli.events {
        // Advance one simulated second at a time so events stream out.
        let mut next = 0;
        while next < end_ms {
            next = next.saturating_add(ONE_SEC_MS).min(end_ms);
            steps += sim.run_until(next);
            print_events(&mut sim);
        }
    } else {
        steps = sim.run_until(end_ms);
    }

    let snapshot = sim.snapshot();
    if cli.json {
        match serde_json::to_string_pretty(&snapshot) {
            Ok(json) => println!("{json}"),
            Err(error) => {
                eprintln!("error: failed to encode snapshot: {error}");
                exit(1);
            }
        }
        return Ok(());
    }

    let telemetry = sim.telemetry();
    let counts = &snapshot.counts;
    let config = sim.config();
    println!(
        "--- Dispatch run ({} taxis, {}s, seed {}) ---",
        snapshot.taxis.len(),
        cli.duration_secs,
        config.seed
    );
    println!("Steps executed: {steps}");
    println!(
        "Taxis: {} idle, {} to pickup, {} to dropoff",
        counts.taxis_idle, counts.taxis_pickup, counts.taxis_dropoff
    );
    println!(
        "Passengers: {} waiting, {} assigned, {} riding",
        counts.passengers_waiting, counts.passengers_assigned, counts.passengers_riding
    );
    println!(
        "Solver runs: {} ({} fell back to greedy)",
        telemetry.solver_runs, telemetry.fallback_runs
    );
    println!(
        "Assignments: {} applied, {} aborted",
        telemetry.assignments_applied, telemetry.assignments_aborted
    );
    println!("Completed trips: {}", telemetry.completed_trips.len());
    if counts.events_dropped > 0 {
        println!("Outbound events dropped: {}", counts.events_dropped);
    }
    if let Some(mean) = telemetry.mean_wait_ms() {
        println!("Mean wait before match: {:.1} s", mean / ONE_SEC_MS as f64);
    }

    const SAMPLE: usize = 10;
    for (i, trip) in telemetry.completed_trips.iter().take(SAMPLE).enumerate() {
        println!(
            "  {}  {} by {}  time_to_match={} s  time_to_pickup={} s  trip_duration={} s  distance={}  party={}",
            i + 1,
            trip.passenger,
            trip.taxi,
            trip.time_to_match() / ONE_SEC_MS,
            trip.time_to_pickup() / ONE_SEC_MS,
            trip.trip_duration() / ONE_SEC_MS,
            trip.trip_distance,
            trip.party_size,
        );
    }
    if telemetry.completed_trips.len() > SAMPLE {
        println!("  ... and {} more", telemetry.completed_trips.len() - SAMPLE);
    }
    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    if let Err(error) = run(&cli) {
        eprintln!("error: {error}");
        exit(1);
    }
}
