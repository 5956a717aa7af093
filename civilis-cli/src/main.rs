//! `civilis`: run one knowledge diffusion simulation and print its history.
//!
//! # Usage
//!
//! ```bash
//! # Defaults: 10 agents, 100 rounds, small-world network, random seed
//! cargo run --bin civilis
//!
//! # Reproducible run from a config file, overriding the population size
//! cargo run --bin civilis -- --config civilis.toml --agents 50 --seed 42
//!
//! # Machine-readable output
//! cargo run --bin civilis -- --rounds 20 --json > history.json
//! ```
//!
//! Logs go to stderr.  `RUST_LOG` wins over `general.log_level`.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use civilis_core::config::CivilisConfig;
use civilis_core::embedding::embedding_backend;
use civilis_core::network::NetworkType;
use civilis_core::simulation::{DiffusionSimulation, RunSummary};
use civilis_core::RoundSnapshot;

#[derive(Parser, Debug)]
#[command(name = "civilis")]
#[command(about = "Civilis - knowledge diffusion over a social network")]
#[command(version)]
struct Args {
    /// TOML configuration file
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Number of agents (overrides config)
    #[arg(long)]
    agents: Option<usize>,

    /// Number of rounds (overrides config)
    #[arg(long)]
    rounds: Option<usize>,

    /// Network topology: "small_world", anything else is random (overrides config)
    #[arg(long)]
    network: Option<String>,

    /// Random seed for reproducibility (overrides config)
    #[arg(long)]
    seed: Option<u64>,

    /// Embedding backend: hash, stub or onnx (overrides config)
    #[arg(long)]
    backend: Option<String>,

    /// Print the history and summary as JSON
    #[arg(long)]
    json: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,
}

#[derive(Serialize)]
struct Report<'a> {
    seed: u64,
    summary: RunSummary,
    history: &'a [RoundSnapshot],
}

/// Load, override and validate the configuration.  Runs before any
/// embedding backend is built so bad sizes never trigger a model load.
fn load_config(args: &Args) -> Result<CivilisConfig> {
    let mut config = match &args.config {
        Some(path) => CivilisConfig::from_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => CivilisConfig::default(),
    };
    config.apply_env_overrides();

    if let Some(agents) = args.agents {
        config.simulation.num_agents = agents;
    }
    if let Some(rounds) = args.rounds {
        config.simulation.rounds = rounds;
    }
    if let Some(network) = &args.network {
        config.simulation.network_type = NetworkType::from(network.as_str());
    }
    if args.seed.is_some() {
        config.simulation.seed = args.seed;
    }
    if let Some(backend) = &args.backend {
        config.embedding.backend.clone_from(backend);
    }
    config.validate().context("validating configuration")?;
    Ok(config)
}

fn init_logging(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    let config = load_config(&args)?;
    init_logging(&config.general.log_level, args.log_json);

    info!(version = env!("CARGO_PKG_VERSION"), "Civilis starting");

    let embedder = embedding_backend(&config.embedding).context("creating embedding provider")?;
    let mut sim =
        DiffusionSimulation::new(&config, embedder).context("initializing simulation")?;
    let history = sim.run().context("running simulation")?;
    let summary = sim.summary();

    if args.json {
        let report = Report {
            seed: sim.seed(),
            summary,
            history: &history,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!(
        "{} agents, {} rounds, {} network, seed {}",
        summary.agents_count,
        summary.rounds_completed,
        sim.network().topology(),
        sim.seed()
    );
    println!("{:>6} {:>8} {:>10} {:>10}", "round", "insights", "diversity", "consensus");
    for snap in &history {
        println!(
            "{:>6} {:>8} {:>10.4} {:>10.4}",
            snap.round, snap.total_insights, snap.diversity, snap.consensus
        );
    }
    println!("mastery events: {}", summary.total_mastery_events);
    for (i, agent) in sim.agents().iter().enumerate() {
        println!("  {} {}", agent.id(), sim.agent_insights(i));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use civilis_core::CivilisError;

    fn parse(argv: &[&str]) -> Args {
        Args::parse_from(std::iter::once("civilis").chain(argv.iter().copied()))
    }

    #[test]
    fn flags_override_defaults() {
        let args = parse(&[
            "--agents", "7", "--rounds", "3", "--network", "random", "--seed", "9",
        ]);
        let config = load_config(&args).expect("valid");
        assert_eq!(config.simulation.num_agents, 7);
        assert_eq!(config.simulation.rounds, 3);
        assert_eq!(config.simulation.network_type, NetworkType::Random);
        assert_eq!(config.simulation.seed, Some(9));
    }

    #[test]
    fn zero_agents_rejected_before_backend_selection() {
        let err = load_config(&parse(&["--agents", "0", "--backend", "onnx"]))
            .expect_err("zero agents must be rejected");
        assert!(matches!(
            err.downcast_ref::<CivilisError>(),
            Some(CivilisError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn zero_rounds_rejected() {
        let err = load_config(&parse(&["--rounds", "0"]))
            .expect_err("zero rounds must be rejected");
        assert!(matches!(
            err.downcast_ref::<CivilisError>(),
            Some(CivilisError::InvalidConfiguration(_))
        ));
    }
}
