//! RingLife CLI - Run distributed Game of Life simulations and inspect snapshots.
//!
//! # Commands
//!
//! - `ringlife run` - Run a simulation across N workers
//! - `ringlife inspect <file>` - Describe a snapshot file
//!
//! # Examples
//!
//! ```bash
//! # Benchmark a 4096x4096 random soup on 8 workers
//! ringlife run --nx 4096 --ny 4096 --steps 500 --pattern random --workers 8 --benchmark
//!
//! # Run from a config file, overriding the step count
//! ringlife run --config ringlife.toml --steps 100
//!
//! # Print the final grid of a small run
//! ringlife inspect snapshots/step_000100.rls --cells
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing_subscriber::EnvFilter;

mod commands;
mod error;

use commands::run::{OutputOptions, Overrides};
use commands::{inspect, run};
use error::CliResult;
use ringlife::distributor::InitMode;
use ringlife::pattern::PatternKind;

/// RingLife - distributed toroidal Game of Life
#[derive(Parser)]
#[command(name = "ringlife")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a simulation
    Run {
        /// TOML configuration file (RINGLIFE_* environment variables also apply)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Grid width [default: 16384]
        #[arg(long)]
        nx: Option<usize>,

        /// Grid height [default: 16384]
        #[arg(long)]
        ny: Option<usize>,

        /// Number of generations [default: 2000]
        #[arg(long)]
        steps: Option<u64>,

        /// Random seed for the random pattern [default: 42]
        #[arg(long)]
        seed: Option<u64>,

        /// Initial pattern: glider_gun, glider, r_pentomino, random [default: glider_gun]
        #[arg(short, long)]
        pattern: Option<PatternKind>,

        /// Directory to save snapshots [default: snapshots]
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Save a snapshot every N steps; 0 saves only the final state [default: 100]
        #[arg(long)]
        save_interval: Option<u64>,

        /// Number of workers [default: 1]
        #[arg(short, long)]
        workers: Option<usize>,

        /// How initial rows reach workers: local or scatter [default: local]
        #[arg(long)]
        init_mode: Option<InitMode>,

        /// Output timing in machine-readable format
        #[arg(long)]
        benchmark: bool,

        /// Do not write snapshot files
        #[arg(long)]
        no_snapshots: bool,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Describe a snapshot file
    Inspect {
        /// Snapshot file (.rls)
        file: PathBuf,

        /// Print the grid as text
        #[arg(long)]
        cells: bool,
    },
}

fn setup_logging(verbose: bool, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();
}

async fn dispatch(command: Commands, quiet: bool) -> CliResult<()> {
    match command {
        Commands::Run {
            config,
            nx,
            ny,
            steps,
            seed,
            pattern,
            output_dir,
            save_interval,
            workers,
            init_mode,
            benchmark,
            no_snapshots,
            json,
        } => {
            let overrides = Overrides {
                nx,
                ny,
                steps,
                seed,
                pattern,
                output_dir,
                save_interval,
                benchmark,
                workers,
                init_mode,
            };
            let config = run::resolve_config(config.as_deref(), &overrides)?;
            run::execute(
                config,
                OutputOptions {
                    no_snapshots,
                    json,
                    quiet,
                },
            )
            .await
        }

        Commands::Inspect { file, cells } => inspect::execute(&file, cells),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    match dispatch(cli.command, cli.quiet).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}
