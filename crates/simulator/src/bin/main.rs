//! Vault Selection Simulator CLI
//!
//! Runs many concurrent spending flows against one in-memory vault and
//! reports whether any state was ever reserved twice.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use vault_simulator::{Simulator, SimulatorConfig};

#[derive(Parser)]
#[command(name = "vault-sim")]
#[command(about = "Concurrent state selection simulator")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a simulation and print the report
    Run {
        /// TOML configuration file; flags below override it
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Number of concurrent flows
        #[arg(long)]
        flows: Option<u32>,

        /// Number of seeded states
        #[arg(long)]
        states: Option<u32>,

        /// Quantity of each seeded state
        #[arg(long)]
        state_value: Option<u64>,

        /// Number of simulated processes, each with its own gate
        #[arg(long)]
        processes: Option<u32>,

        /// Smallest requested amount
        #[arg(long)]
        min_amount: Option<u64>,

        /// Largest requested amount
        #[arg(long)]
        max_amount: Option<u64>,

        /// Random seed
        #[arg(long)]
        seed: Option<u64>,

        /// Selection attempts per flow
        #[arg(long)]
        max_attempts: Option<u32>,

        /// Sleep on tokio timers instead of virtual time
        #[arg(long)]
        real_time: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let Commands::Run {
        config,
        flows,
        states,
        state_value,
        processes,
        min_amount,
        max_amount,
        seed,
        max_attempts,
        real_time,
    } = cli.command;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut config = match config {
        Some(path) => SimulatorConfig::load(&path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => SimulatorConfig::default(),
    };
    if let Some(flows) = flows {
        config = config.with_flows(flows);
    }
    if let Some(states) = states {
        config.num_states = states;
    }
    if let Some(value) = state_value {
        config.state_value = value;
    }
    if let Some(processes) = processes {
        config = config.with_processes(processes);
    }
    if let Some(min) = min_amount {
        config.min_amount = min;
    }
    if let Some(max) = max_amount {
        config.max_amount = max;
    }
    if let Some(seed) = seed {
        config = config.with_seed(seed);
    }
    if let Some(attempts) = max_attempts {
        config.retry = config.retry.with_max_attempts(attempts);
    }
    if real_time {
        config = config.with_real_time();
    }
    config.validate()?;

    let initial = config.total_value();
    let report = Simulator::new(config).run().await?;
    report.print();

    if report.overlaps > 0 {
        bail!("{} states were reserved by two flows at once", report.overlaps);
    }
    if report.value_spent + report.value_remaining != initial {
        bail!(
            "value not conserved: spent {} + remaining {} != seeded {}",
            report.value_spent,
            report.value_remaining,
            initial
        );
    }
    Ok(())
}
