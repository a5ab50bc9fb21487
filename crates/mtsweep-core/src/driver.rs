//! Experiment driver: sweeps the schedule and reduces each point.

use std::time::Instant;

use crate::accelerator::Accelerator;
use crate::config::SweepConfig;
use crate::error::{Result, SweepError};
use crate::schedule;
use crate::session::{AcceleratorSession, SessionOptions};
use crate::stats::{ScalePoint, ScaleRecord};

/// Progress notification emitted after each schedule point.
#[derive(Debug, Clone, Copy)]
pub struct SweepProgress<'a> {
    /// Zero-based index of the finished point.
    pub index: usize,
    /// Number of points in the schedule.
    pub total: usize,
    /// Metrics of the finished point.
    pub record: &'a ScaleRecord,
}

/// Runs a full convergence sweep on one session.
pub struct ExperimentDriver<'s, A: Accelerator> {
    session: &'s mut AcceleratorSession<A>,
    config: SweepConfig,
}

impl<'s, A: Accelerator> ExperimentDriver<'s, A> {
    /// Create a driver; the configuration is validated up front.
    ///
    /// The dispatch settings in `config` must match the ones the session
    /// was opened with, since the session owns the lane layout.
    pub fn new(session: &'s mut AcceleratorSession<A>, config: SweepConfig) -> Result<Self> {
        config.validate()?;
        let wanted = SessionOptions::from(&config);
        let actual = session.options();
        if wanted != actual {
            return Err(SweepError::InvalidConfig(format!(
                "config asks for oversubscription {} / work-group size {}, session uses {} / {}",
                wanted.oversubscription_factor,
                wanted.work_group_size,
                actual.oversubscription_factor,
                actual.work_group_size
            )));
        }
        Ok(Self { session, config })
    }

    /// Configuration in use.
    pub fn config(&self) -> &SweepConfig {
        &self.config
    }

    /// Trial counts visited by the sweep.
    pub fn schedule(&self) -> Result<Vec<u64>> {
        schedule::generate(
            self.config.initial_trials as f64,
            self.config.final_trials as f64,
            self.config.schedule_length,
        )
    }

    /// Run every schedule point in order.
    pub fn run_sweep(&mut self) -> Result<Vec<ScaleRecord>> {
        self.run_sweep_with(|_| {})
    }

    /// Run every schedule point, calling `observer` after each one.
    ///
    /// The first failing point aborts the sweep; no partial results are
    /// returned.
    pub fn run_sweep_with<F>(&mut self, mut observer: F) -> Result<Vec<ScaleRecord>>
    where
        F: FnMut(SweepProgress<'_>),
    {
        let schedule = self.schedule()?;
        let total = schedule.len();
        let mut records = Vec::with_capacity(total);

        for (index, requested_trials) in schedule.into_iter().enumerate() {
            let record = self.run_point(requested_trials)?;
            observer(SweepProgress {
                index,
                total,
                record: &record,
            });
            records.push(record);
        }

        Ok(records)
    }

    /// Run `repeats_per_point` independent runs of `requested_trials` and reduce them.
    pub fn run_point(&mut self, requested_trials: u64) -> Result<ScaleRecord> {
        let repeats = self.config.repeats_per_point;
        let mut point = ScalePoint::with_capacity(requested_trials, repeats);

        for run in 0..repeats {
            let start = Instant::now();
            let result = self.session.run(requested_trials)?;
            let elapsed_us = u64::try_from(start.elapsed().as_micros()).unwrap_or(u64::MAX);

            let sample_mean = result.sample_mean();
            tracing::debug!(
                requested_trials,
                run,
                sample_mean,
                elapsed_us,
                excess = result.plan().excess_trials(),
                "Run complete"
            );
            point.record_run(sample_mean, elapsed_us);
        }

        let record = point.finalize(self.config.true_probability)?;
        tracing::info!(
            requested_trials,
            rmse = record.rmse,
            mae = record.mae,
            mean_wall_clock_us = record.mean_wall_clock_micros,
            "Schedule point complete"
        );
        Ok(record)
    }
}
