//! Sweep command: resolves configuration, opens the backend and runs the schedule.

use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::str::FromStr;

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use mtsweep_core::host::HostAccelerator;
use mtsweep_core::prelude::*;
use mtsweep_wgpu::WgpuAccelerator;

use crate::error::{CliError, CliResult};

/// Device backend running the kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// CPU reference kernel.
    Host,
    /// WebGPU compute kernel.
    Wgpu,
}

impl FromStr for Backend {
    type Err = CliError;

    fn from_str(s: &str) -> CliResult<Self> {
        match s.trim().to_lowercase().as_str() {
            "host" | "cpu" => Ok(Backend::Host),
            "wgpu" | "gpu" | "webgpu" => Ok(Backend::Wgpu),
            other => Err(CliError::InvalidBackend(format!(
                "'{}' (expected 'host' or 'wgpu')",
                other
            ))),
        }
    }
}

/// Options of a sweep invocation. `None` fields fall back to the config file
/// or the defaults.
#[derive(Debug, Clone, Default)]
pub struct SweepArgs {
    pub backend: String,
    pub params: PathBuf,
    pub output: PathBuf,
    pub config: Option<PathBuf>,
    pub seed: Option<u32>,
    pub initial: Option<u64>,
    pub final_trials: Option<u64>,
    pub points: Option<usize>,
    pub repeats: Option<usize>,
    pub oversubscription: Option<u32>,
    pub work_group_size: Option<u32>,
    pub probability: Option<f64>,
    pub quiet: bool,
}

/// Merge the config file and command-line overrides into a validated configuration.
pub fn resolve_config(args: &SweepArgs) -> CliResult<SweepConfig> {
    let base = match &args.config {
        Some(path) => {
            if !path.exists() {
                return Err(CliError::Config(format!(
                    "config file not found: {}",
                    path.display()
                )));
            }
            SweepConfig::load(path)?
        }
        None => SweepConfig::default(),
    };

    let initial = args.initial.unwrap_or(base.initial_trials);
    let final_trials = args.final_trials.unwrap_or(base.final_trials);

    let mut builder = SweepConfigBuilder::from_config(base).trials(initial, final_trials);
    if let Some(points) = args.points {
        builder = builder.schedule_length(points);
    }
    if let Some(repeats) = args.repeats {
        builder = builder.repeats_per_point(repeats);
    }
    if let Some(p) = args.probability {
        builder = builder.true_probability(p);
    }
    if let Some(factor) = args.oversubscription {
        builder = builder.oversubscription_factor(factor);
    }
    if let Some(size) = args.work_group_size {
        builder = builder.work_group_size(size);
    }
    if let Some(seed) = args.seed {
        builder = builder.seed(seed);
    }

    Ok(builder.build()?)
}

/// Execute the sweep command.
pub fn execute(args: &SweepArgs) -> CliResult<()> {
    let backend: Backend = args.backend.parse()?;
    let config = resolve_config(args)?;

    match backend {
        Backend::Host => run(HostAccelerator::default(), &config, args),
        Backend::Wgpu => {
            let accelerator = WgpuAccelerator::new(config.work_group_size)?;
            run(accelerator, &config, args)
        }
    }
}

fn run<A: Accelerator>(accelerator: A, config: &SweepConfig, args: &SweepArgs) -> CliResult<()> {
    let source = File::open(&args.params).map_err(|e| SweepError::ParameterLoadFailed {
        record: 0,
        reason: format!("cannot open {}: {}", args.params.display(), e),
    })?;

    let mut session = AcceleratorSession::initialize(
        accelerator,
        BufReader::new(source),
        config.seed,
        SessionOptions::from(config),
    )?;

    if !args.quiet {
        print_header(&session, config);
    }

    let records = {
        let mut driver = ExperimentDriver::new(&mut session, config.clone())?;
        let schedule = driver.schedule()?;
        if !args.quiet {
            print_schedule(&schedule);
        }

        let pb = progress_bar(schedule.len() as u64, args.quiet);
        let records = driver.run_sweep_with(|progress| {
            pb.set_message(format!("{} trials", progress.record.requested_trials));
            pb.inc(1);
        });
        match &records {
            Ok(_) => pb.finish_with_message("Complete!"),
            Err(_) => pb.abandon_with_message("Aborted"),
        }
        records?
    };

    session.close();

    let written = write_results(&args.output, &records);
    if let Err(e) = &written {
        tracing::error!(error = %e, "Results file not written");
    }

    if !args.quiet {
        print_summary(&records, config);
        if written.is_ok() {
            println!(
                "\n{} {}",
                "Results written to".bright_green(),
                args.output.display().to_string().bright_white()
            );
        }
    }

    written.map_err(CliError::from)
}

fn progress_bar(len: u64, quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(len);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.cyan} [{bar:40.cyan/blue}] {pos}/{len} {msg} ({eta})")
        .map(|style| style.progress_chars("█▓▒░  "))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    pb.set_style(style);
    pb
}

fn print_header<A: Accelerator>(session: &AcceleratorSession<A>, config: &SweepConfig) {
    println!("{}", "Mersenne Twister convergence sweep".bright_cyan().bold());
    println!(
        "  {} {}",
        "Device:".bright_white(),
        session.accelerator().name()
    );
    println!(
        "  {} {} hardware, {} logical",
        "Lanes:".bright_white(),
        session.lane_ceiling(),
        session.lane_count()
    );
    println!(
        "  {} {}  {} {}  {} {}",
        "Seed:".bright_white(),
        config.seed,
        "Repeats:".bright_white(),
        config.repeats_per_point,
        "p:".bright_white(),
        config.true_probability
    );
}

fn print_schedule(schedule: &[u64]) {
    let (first, last) = match (schedule.first(), schedule.last()) {
        (Some(first), Some(last)) => (first, last),
        _ => return,
    };
    println!(
        "  {} {} points from {} to {} trials\n",
        "Schedule:".bright_white(),
        schedule.len(),
        first,
        last
    );
}

fn print_summary(records: &[ScaleRecord], config: &SweepConfig) {
    println!();
    println!("{}", "Summary".bright_white().bold());
    println!("{}", "═".repeat(60).dimmed());
    println!(
        "  {:>14}  {:>12}  {:>12}  {:>14}",
        "trials".bright_white(),
        "rmse".bright_white(),
        "mae".bright_white(),
        "mean time (µs)".bright_white()
    );
    for record in records {
        let rmse = format!("{:.6}", record.rmse);
        let rmse = if record.rmse <= config.true_probability * 0.01 {
            rmse.green()
        } else {
            rmse.normal()
        };
        println!(
            "  {:>14}  {:>12}  {:>12.6}  {:>14.1}",
            record.requested_trials, rmse, record.mae, record.mean_wall_clock_micros
        );
    }
    println!("{}", "═".repeat(60).dimmed());
}
