//! mtsweep - Monte Carlo convergence sweeps over parallel Mersenne Twister streams.
//!
//! Runs a geometric schedule of trial counts, estimating a Bernoulli(0.5)
//! probability at each point on a GPU (or the host reference kernel) and
//! writing RMSE / MAE / mean wall-clock time per point to a CSV file.
//!
//! # Examples
//!
//! ```bash
//! # Full default sweep on the GPU
//! mtsweep
//!
//! # Short sweep on the CPU with a fixed seed
//! mtsweep --backend host --final 100000 --points 20 --seed 7
//!
//! # Settings from a TOML file, with one flag overriding it
//! mtsweep --config sweep.toml --repeats 5
//! ```

use clap::Parser;
use colored::Colorize;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod error;
mod sweep;

use sweep::SweepArgs;

/// Mersenne Twister Monte Carlo convergence sweep
#[derive(Parser)]
#[command(name = "mtsweep")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Device backend (host, wgpu)
    #[arg(short, long, default_value = "wgpu")]
    backend: String,

    /// Generator parameter table
    #[arg(long, default_value = "./data/MersenneTwister.dat")]
    params: PathBuf,

    /// Results CSV file
    #[arg(short, long, default_value = "./data/Results.csv")]
    output: PathBuf,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Seed for every lane's generator state
    #[arg(long)]
    seed: Option<u32>,

    /// First schedule value (trials per run)
    #[arg(long)]
    initial: Option<u64>,

    /// Last schedule value (trials per run)
    #[arg(long = "final")]
    final_trials: Option<u64>,

    /// Number of schedule points
    #[arg(long)]
    points: Option<usize>,

    /// Independent runs per schedule point
    #[arg(long)]
    repeats: Option<usize>,

    /// Logical lanes per hardware lane
    #[arg(long)]
    oversubscription: Option<u32>,

    /// Lanes per work group
    #[arg(long)]
    work_group_size: Option<u32>,

    /// True probability the estimates are compared against
    #[arg(long)]
    probability: Option<f64>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long)]
    quiet: bool,
}

impl From<Cli> for SweepArgs {
    fn from(cli: Cli) -> Self {
        SweepArgs {
            backend: cli.backend,
            params: cli.params,
            output: cli.output,
            config: cli.config,
            seed: cli.seed,
            initial: cli.initial,
            final_trials: cli.final_trials,
            points: cli.points,
            repeats: cli.repeats,
            oversubscription: cli.oversubscription,
            work_group_size: cli.work_group_size,
            probability: cli.probability,
            quiet: cli.quiet,
        }
    }
}

fn setup_logging(verbose: bool, quiet: bool) {
    let level = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    match sweep::execute(&SweepArgs::from(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}
