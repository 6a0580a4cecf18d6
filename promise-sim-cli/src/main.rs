//! promise-sim: watch simulated asynchronous tasks settle in the terminal.
//!
//! Each subcommand submits work to a [`Simulator`], renders the log and the
//! activity indicator live on stderr, and prints a summary of every
//! execution record once everything has settled.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use promise_sim::{ChainMode, SimConfig, Simulator};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

mod display;

/// Simulate asynchronous tasks and their combinators
#[derive(Parser)]
#[command(name = "promise-sim")]
#[command(about = "Simulate asynchronous tasks with single, chain, all and race", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file (defaults to .promise-sim.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Seed for reproducible durations and outcomes
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Print the final snapshot as JSON instead of the live display
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the next task from the catalog
    ///
    /// Repeated submissions cycle through the catalog in order.
    One {
        /// Number of tasks to submit back to back
        #[arg(long, default_value = "1")]
        count: usize,
    },

    /// Run three tasks as a chain, logging results in order
    Chain {
        /// eager (all start at once) or sequential (one after another)
        #[arg(long)]
        mode: Option<ChainMode>,
    },

    /// Run every catalog task in parallel and wait for all of them
    All,

    /// Run every catalog task in parallel and report the first to settle
    Race,

    /// Run one, chain, all and race back to back
    Demo,
}

fn load_config(cli: &Cli) -> Result<SimConfig> {
    let mut config = match &cli.config {
        Some(path) => SimConfig::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => SimConfig::load().context("Failed to load configuration")?,
    };
    if let Some(seed) = cli.seed {
        config.seed = Some(seed);
    }
    if let Commands::Chain { mode: Some(mode) } = &cli.command {
        config.chain_mode = *mode;
    }
    Ok(config)
}

async fn execute_command(sim: &Simulator, command: &Commands) {
    match command {
        Commands::One { count } => {
            for _ in 0..*count {
                sim.submit_one();
            }
        }
        Commands::Chain { .. } => sim.submit_chain(),
        Commands::All => sim.submit_all(),
        Commands::Race => sim.submit_race(),
        Commands::Demo => {
            sim.submit_one();
            sim.wait_idle().await;
            sim.submit_chain();
            sim.wait_idle().await;
            sim.submit_all();
            sim.wait_idle().await;
            sim.submit_race();
        }
    }
    sim.wait_idle().await;
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let config = load_config(&cli)?;
    tracing::debug!(?config, "Configuration loaded");
    let sim = Arc::new(Simulator::from_config(&config).context("Invalid configuration")?);

    let cancel = CancellationToken::new();
    let display = (!cli.json).then(|| {
        tokio::spawn(display::display_loop(
            sim.clone(),
            cancel.clone(),
            cli.no_color,
        ))
    });

    execute_command(&sim, &cli.command).await;
    sim.shutdown().await;

    cancel.cancel();
    if let Some(handle) = display {
        handle.await.context("Display task failed")?;
    }

    let snapshot = sim.snapshot();
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    } else {
        display::print_summary(&snapshot);
    }

    Ok(())
}
