//! Battle core - Development Tools

use std::path::{Path, PathBuf};

use battle_core::replay::BattleReplay;
use battle_tools::simulate::{describe, simulate_encounter, SimulationOptions};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "battle-tools")]
#[command(about = "Development tools for the battle core")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate data files
    Validate {
        /// Path to data directory
        #[arg(default_value = "assets/data")]
        path: String,
    },
    /// Run an encounter with the auto planner
    Simulate {
        /// Encounter id
        encounter: String,
        /// Path to data directory
        #[arg(long, default_value = "assets/data")]
        data: String,
        /// Generator seed
        #[arg(long, default_value_t = 1)]
        seed: u64,
        /// Party unit ids, comma separated
        #[arg(long, value_delimiter = ',', default_value = "isaac,garet,ivan,mia")]
        party: Vec<String>,
        /// Party level
        #[arg(long, default_value_t = 1)]
        level: u32,
        /// Round limit
        #[arg(long, default_value_t = 100)]
        max_rounds: u32,
        /// Print every event
        #[arg(long)]
        verbose: bool,
        /// Write the replay to this file
        #[arg(long)]
        replay_out: Option<PathBuf>,
    },
    /// Re-run a saved replay and check its final state
    Verify {
        /// Replay file
        replay: PathBuf,
    },
}

fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { path } => {
            tracing::info!("Validating data files in: {path}");
            match battle_tools::validate::validate_data_directory(Path::new(&path)) {
                Ok(count) => tracing::info!("Validation passed ({count} definitions)"),
                Err(e) => {
                    tracing::error!("Validation failed: {e}");
                    std::process::exit(1);
                }
            }
        }
        Commands::Simulate {
            encounter,
            data,
            seed,
            party,
            level,
            max_rounds,
            verbose,
            replay_out,
        } => {
            let registry = match battle_tools::loader::load_content(Path::new(&data)) {
                Ok(registry) => registry,
                Err(e) => {
                    tracing::error!("Failed to load content: {e}");
                    std::process::exit(1);
                }
            };
            let options = SimulationOptions {
                encounter_id: encounter,
                party,
                level,
                seed,
                max_rounds,
            };
            let report = match simulate_encounter(&registry, &options) {
                Ok(report) => report,
                Err(e) => {
                    tracing::error!("Simulation failed: {e}");
                    std::process::exit(1);
                }
            };
            if verbose {
                for event in &report.events {
                    println!("{}", describe(event));
                }
            }
            match report.outcome {
                Some(outcome) => println!("{outcome:?} after {} rounds", report.rounds),
                None => println!("Undecided after {} rounds", report.rounds),
            }
            if let Some(path) = replay_out {
                if let Err(e) = report.replay.save(&path) {
                    tracing::error!("Failed to write replay: {e}");
                    std::process::exit(1);
                }
                tracing::info!("Replay written to {}", path.display());
            }
        }
        Commands::Verify { replay } => {
            let verified = BattleReplay::load(&replay).and_then(|r| r.verify());
            match verified {
                Ok(true) => tracing::info!("Replay verified"),
                Ok(false) => {
                    tracing::error!("Replay diverged from its recorded final state");
                    std::process::exit(1);
                }
                Err(e) => {
                    tracing::error!("Replay check failed: {e}");
                    std::process::exit(1);
                }
            }
        }
    }
}
