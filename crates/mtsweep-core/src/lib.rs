//! # mtsweep core
//!
//! Parallel Mersenne Twister stream management and dispatch sizing for
//! Monte Carlo convergence sweeps on compute accelerators.
//!
//! A sweep generates Bernoulli(0.5) trials on many independent generator
//! streams, one per logical lane, and measures how the error of the sample
//! mean shrinks as the trial count grows geometrically.
//!
//! ## Components
//!
//! - [`schedule`] - geometric trial-count schedule
//! - [`stream`] - per-lane generator state seeding
//! - [`dispatch`] - lane count and per-lane trial sizing
//! - [`params`] - per-lane parameter table loading
//! - [`AcceleratorSession`] - buffer ownership and the blocking run loop
//! - [`stats`] - RMSE / MAE reduction per schedule point
//! - [`ExperimentDriver`] - the sweep itself
//!
//! ## Example
//!
//! ```ignore
//! use mtsweep_core::prelude::*;
//!
//! let config = SweepConfig::default();
//! let device = HostAccelerator::default();
//! let table = std::fs::File::open("data/MersenneTwister.dat")?;
//! let mut session = AcceleratorSession::initialize(device, table, config.seed, (&config).into())?;
//!
//! let records = ExperimentDriver::new(&mut session, config)?.run_sweep()?;
//! write_results("data/Results.csv", &records)?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod accelerator;
pub mod config;
pub mod dispatch;
pub mod driver;
pub mod error;
pub mod host;
pub mod params;
pub mod results;
pub mod schedule;
pub mod session;
pub mod stats;
pub mod stream;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::accelerator::{Accelerator, DeviceBuffer, KernelArgs};
    pub use crate::config::{SweepConfig, SweepConfigBuilder};
    pub use crate::dispatch::{plan, DispatchPlan};
    pub use crate::driver::{ExperimentDriver, SweepProgress};
    pub use crate::error::{Result, SweepError};
    pub use crate::host::HostAccelerator;
    pub use crate::params::{ParameterRecord, ParameterTable};
    pub use crate::results::write_results;
    pub use crate::schedule::generate;
    pub use crate::session::{AcceleratorSession, RunResult, SessionOptions};
    pub use crate::stats::{ScalePoint, ScaleRecord};
    pub use crate::stream::{seed_states, StreamState};
}

// Re-exports
pub use accelerator::{Accelerator, DeviceBuffer, KernelArgs};
pub use config::SweepConfig;
pub use driver::ExperimentDriver;
pub use error::{Result, SweepError};
pub use session::{AcceleratorSession, RunResult, SessionOptions};
pub use stats::ScaleRecord;
