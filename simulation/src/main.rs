//! Courier - message fabric simulator and trace checker
//!
//! Runs canned or configured simulations, saves their traces, and checks
//! recorded traces against the fabric's properties.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use courier_logging::CourierSubscriberBuilder;
use serde::Serialize;
use tracing::info;

use courier_simulation::{
    Property, RunOutcome, SimConfig, Trace, Verdict, check, check_all, scenarios,
};

#[derive(Parser)]
#[command(
    name = "courier",
    about = "Discrete-time message fabric simulator and trace checker",
    version
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Human-readable log output instead of JSON lines
    #[arg(long, global = true)]
    pretty: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum ScenarioName {
    /// One message, read on its first visible tick
    A,
    /// Needs exceed the pool at tick 0
    B,
    /// Second message read before the first
    C,
    /// Message never read before the horizon
    D,
    /// Read of a message that is not visible yet
    E,
    /// Seeded random nodes
    Chaos,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a canned scenario and report every property
    Scenario {
        name: ScenarioName,

        /// Seed for the chaos scenario
        #[arg(short, long, default_value = "0")]
        seed: u64,

        /// Ticks for the chaos scenario
        #[arg(short, long, default_value = "30")]
        ticks: u64,

        /// Save the trace (`.bin` for the binary encoding)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Run a simulation described by a TOML config
    Run {
        #[arg(short, long)]
        config: PathBuf,

        /// Override the configured tick bound
        #[arg(short, long)]
        ticks: Option<u64>,

        /// Override the configured seed
        #[arg(short, long)]
        seed: Option<u64>,

        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Check a saved trace
    Check {
        trace: PathBuf,

        /// Property name, or `all`
        #[arg(short, long, default_value = "all")]
        property: String,
    },

    /// Print a per-tick summary of a saved trace
    Inspect {
        trace: PathBuf,

        /// Show every node at this tick
        #[arg(long)]
        tick: Option<u64>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.command {
        Commands::Run { config, .. } => Some(
            SimConfig::load(config)
                .with_context(|| format!("failed to load {}", config.display()))?,
        ),
        _ => None,
    };

    // Set up tracing
    let log_config = config
        .as_ref()
        .map(|c| c.logging.clone())
        .unwrap_or_default();
    let mut builder = CourierSubscriberBuilder::new().with_config(log_config);
    if cli.verbose {
        builder = builder.with_level("debug");
    }
    if cli.pretty {
        builder = builder.with_pretty(true);
    }
    let _guard = builder.init()?;

    match cli.command {
        Commands::Scenario {
            name,
            seed,
            ticks,
            out,
        } => match name {
            ScenarioName::A => finish(scenarios::run_delivery_scenario()?, out.as_deref())?,
            ScenarioName::B => finish(scenarios::run_shortage_scenario()?, out.as_deref())?,
            ScenarioName::C => finish(scenarios::run_reordering_scenario()?, out.as_deref())?,
            ScenarioName::D => finish(scenarios::run_unread_scenario()?, out.as_deref())?,
            ScenarioName::E => finish(scenarios::run_invisible_read_scenario()?, out.as_deref())?,
            ScenarioName::Chaos => finish(
                scenarios::run_random_chaos_scenario(seed, ticks)?,
                out.as_deref(),
            )?,
        },
        Commands::Run {
            ticks, seed, out, ..
        } => {
            let mut config = config.unwrap_or_default();
            if let Some(ticks) = ticks {
                config = config.with_max_ticks(ticks);
            }
            if let Some(seed) = seed {
                config = config.with_seed(seed);
            }
            let fabric = config.build_fabric()?;
            finish(fabric.run(config.max_ticks), out.as_deref())?;
        }
        Commands::Check { trace, property } => {
            let trace = load_trace(&trace)?;
            run_check(&trace, &property)?;
        }
        Commands::Inspect { trace, tick } => {
            let trace = load_trace(&trace)?;
            inspect(&trace, tick);
        }
    }

    Ok(())
}

fn finish<S: Serialize>(outcome: RunOutcome<S>, out: Option<&Path>) -> anyhow::Result<()> {
    scenarios::print_report(&outcome);
    if let Some(path) = out {
        outcome
            .trace
            .save(path)
            .with_context(|| format!("failed to save trace to {}", path.display()))?;
        info!(path = %path.display(), "Trace saved");
        println!("\nTrace written to {}", path.display());
    }
    Ok(())
}

/// Both encodings carry states as JSON, so any trace loads untyped
fn load_trace(path: &Path) -> anyhow::Result<Trace<serde_json::Value>> {
    Trace::load(path).with_context(|| format!("failed to load trace {}", path.display()))
}

fn run_check(trace: &Trace<serde_json::Value>, property: &str) -> anyhow::Result<()> {
    let verdicts = if property.eq_ignore_ascii_case("all") {
        check_all(trace)
    } else {
        let property: Property = property.parse()?;
        vec![(property, check(trace, property))]
    };

    println!("=== Properties ({} ticks) ===", trace.len());
    for (property, verdict) in verdicts {
        println!("  {:<22} {}", property.name(), verdict);
        if let Verdict::Unproven(open) = &verdict {
            for witness in open {
                println!("      {witness}");
            }
        }
    }
    Ok(())
}

fn inspect(trace: &Trace<serde_json::Value>, tick: Option<u64>) {
    println!("Run {} recorded {}", trace.meta.run_id, trace.meta.recorded_at);
    let nodes: Vec<String> = trace.meta.nodes.iter().map(|n| n.to_string()).collect();
    println!("  Nodes: {}", nodes.join(", "));
    println!("  Pool size: {}", trace.meta.pool_size);
    if let Some(termination) = &trace.termination {
        println!("  Termination: {termination:?}");
    }

    match tick.and_then(|t| trace.snapshot(t)) {
        Some(snapshot) => {
            println!("\n=== Tick {} (available {}) ===", snapshot.tick, snapshot.available);
            for (id, node) in &snapshot.nodes {
                println!(
                    "  {id}: state={} visible={:?} read={:?} sent={:?} needs={}",
                    node.state, node.visible, node.read, node.sent, node.needs_to_send
                );
            }
        }
        None => {
            if let Some(t) = tick {
                println!("\nNo snapshot at tick {t}");
            }
            println!("\n=== Ticks ===");
            for snapshot in &trace.snapshots {
                println!(
                    "  tick {:>4}: available {:>4}, sent {:>3}, read {:>3}, needs {:>4}",
                    snapshot.tick,
                    snapshot.available,
                    snapshot.sent_count(),
                    snapshot.read_count(),
                    snapshot.total_needs()
                );
            }
        }
    }
}
