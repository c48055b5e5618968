//! Bridge scenario CLI.

use clap::{Parser, Subcommand};
use solanoid_simulator::{run, ScenarioConfig};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "solanoid-sim")]
#[command(about = "Run oracle bridge scenarios on a simulated ledger")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Deploy the bridge and drive a batch of swaps through it
    Run {
        /// Scenario file (TOML); flags override its values
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Number of consuls
        #[arg(long)]
        consuls: Option<usize>,

        /// Signatures required for quorum
        #[arg(long)]
        bft: Option<u8>,

        /// Swaps to attach
        #[arg(long)]
        swaps: Option<usize>,

        #[arg(long)]
        seed: Option<u64>,

        /// Simulated confirmation latency (e.g. "20ms")
        #[arg(long)]
        latency: Option<humantime::Duration>,
    },

    /// Print the default scenario as TOML
    ExampleConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::ExampleConfig => {
            print!("{}", ScenarioConfig::example_toml());
        }

        Commands::Run {
            config,
            consuls,
            bft,
            swaps,
            seed,
            latency,
        } => {
            tracing_subscriber::fmt()
                .with_env_filter(
                    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
                )
                .init();

            let mut scenario = match config {
                Some(path) => ScenarioConfig::load(path)?,
                None => ScenarioConfig::default(),
            };
            if let Some(consuls) = consuls {
                scenario = scenario.with_consuls(consuls);
            }
            if let Some(bft) = bft {
                scenario = scenario.with_bft(bft);
            }
            if let Some(swaps) = swaps {
                scenario = scenario.with_swaps(swaps);
            }
            if let Some(seed) = seed {
                scenario = scenario.with_seed(seed);
            }
            if let Some(latency) = latency {
                scenario = scenario.with_confirmation_latency(*latency);
            }

            println!(
                "Running {} swaps across {} consuls...",
                scenario.swaps, scenario.consuls
            );
            let report = run(&scenario).await?;
            report.print();
        }
    }

    Ok(())
}
