//! Accelerator session: long-lived buffers and the synchronous run loop.
//!
//! A session owns the accelerator together with every buffer the kernel
//! binds. Buffers are acquired in this order and released in reverse when
//! the session is dropped:
//!
//! 1. accelerator (device, command queue, compiled kernel)
//! 2. parameter table
//! 3. trials-per-lane and lane-count scalars
//! 4. generator state
//! 5. result buffer (replaced whenever the required length changes)
//!
//! `run` blocks until the device has finished, so the state and result
//! buffers are never touched by the host while a dispatch uses them.

use std::io::{Read, Seek};

use crate::accelerator::{Accelerator, DeviceBuffer, KernelArgs};
use crate::config::SweepConfig;
use crate::dispatch::{self, DispatchPlan};
use crate::error::{Result, SweepError};
use crate::params::ParameterTable;
use crate::stream::{seed_states, WORDS_PER_LANE};

/// Dispatch settings of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOptions {
    /// Logical lanes per hardware lane.
    pub oversubscription_factor: u32,
    /// Lanes per work group.
    pub work_group_size: u32,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            oversubscription_factor: 100,
            work_group_size: 128,
        }
    }
}

impl From<&SweepConfig> for SessionOptions {
    fn from(config: &SweepConfig) -> Self {
        Self {
            oversubscription_factor: config.oversubscription_factor,
            work_group_size: config.work_group_size,
        }
    }
}

/// Result buffer cached by length.
///
/// A length change drops the old buffer before allocating the new one.
struct ResultBufferCache<B> {
    buffer: Option<B>,
}

impl<B: DeviceBuffer> ResultBufferCache<B> {
    fn new() -> Self {
        Self { buffer: None }
    }

    fn len(&self) -> Option<usize> {
        self.buffer.as_ref().map(DeviceBuffer::len)
    }

    fn ensure<A>(&mut self, accelerator: &A, len: usize) -> Result<&B>
    where
        A: Accelerator<Buffer = B>,
    {
        if self.len() != Some(len) {
            let previous = self.len();
            self.buffer = None;
            self.buffer = Some(accelerator.allocate(len, "results")?);
            tracing::debug!(?previous, len, "Reallocated result buffer");
        }
        self.buffer.as_ref().ok_or_else(|| {
            SweepError::AcceleratorExecutionFailed("result buffer missing".to_string())
        })
    }
}

/// Output of one dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunResult {
    plan: DispatchPlan,
    outcomes: Vec<u8>,
}

impl RunResult {
    /// Build a result from a plan and its outcome bytes.
    pub fn new(plan: DispatchPlan, outcomes: Vec<u8>) -> Self {
        Self { plan, outcomes }
    }

    /// Plan the dispatch was executed with.
    pub fn plan(&self) -> &DispatchPlan {
        &self.plan
    }

    /// Trials the caller asked for.
    pub fn requested_trials(&self) -> u64 {
        self.plan.requested_trials
    }

    /// Every outcome in the buffer, including the excess past the request.
    pub fn outcomes(&self) -> &[u8] {
        &self.outcomes
    }

    /// The first `requested_trials` outcomes.
    pub fn requested_outcomes(&self) -> &[u8] {
        let end = (self.plan.requested_trials as usize).min(self.outcomes.len());
        &self.outcomes[..end]
    }

    /// Number of successes among the requested outcomes.
    pub fn successes(&self) -> u64 {
        self.requested_outcomes()
            .iter()
            .map(|&o| u64::from(o))
            .sum()
    }

    /// Mean of the requested outcomes; excess outcomes are ignored.
    pub fn sample_mean(&self) -> f64 {
        self.successes() as f64 / self.plan.requested_trials as f64
    }

    /// Take the outcome bytes.
    pub fn into_outcomes(self) -> Vec<u8> {
        self.outcomes
    }
}

/// Owner of an accelerator and the buffers bound to its kernel.
pub struct AcceleratorSession<A: Accelerator> {
    // Fields drop top to bottom: reverse of acquisition.
    results: ResultBufferCache<A::Buffer>,
    state: A::Buffer,
    lane_count_arg: A::Buffer,
    trials_per_lane_arg: A::Buffer,
    parameters: A::Buffer,
    accelerator: A,
    options: SessionOptions,
    lane_ceiling: u32,
    seed: u32,
}

impl<A: Accelerator> AcceleratorSession<A> {
    /// Load the parameter table from `source` and seed every lane.
    pub fn initialize<R: Read + Seek>(
        accelerator: A,
        source: R,
        seed: u32,
        options: SessionOptions,
    ) -> Result<Self> {
        let lane_ceiling = checked_lane_ceiling(&accelerator)?;
        let table = ParameterTable::load(source, lane_ceiling)?;
        Self::with_parameters(accelerator, &table, seed, options)
    }

    /// Build a session from an already loaded parameter table.
    pub fn with_parameters(
        accelerator: A,
        table: &ParameterTable,
        seed: u32,
        options: SessionOptions,
    ) -> Result<Self> {
        let lane_ceiling = checked_lane_ceiling(&accelerator)?;
        if table.len() != lane_ceiling as usize {
            return Err(SweepError::ParameterLoadFailed {
                record: table.len(),
                reason: format!(
                    "table holds {} records, device has {} lanes",
                    table.len(),
                    lane_ceiling
                ),
            });
        }
        if options.work_group_size == 0 {
            return Err(SweepError::InvalidConfig(
                "work_group_size must be greater than 0".to_string(),
            ));
        }
        let lane_count = lane_ceiling
            .checked_mul(options.oversubscription_factor)
            .filter(|&lanes| lanes > 0)
            .ok_or_else(|| {
                SweepError::InvalidConfig(format!(
                    "oversubscription factor {} is not usable with {} lanes",
                    options.oversubscription_factor, lane_ceiling
                ))
            })?;

        let mut parameters = accelerator.allocate(table.as_bytes().len(), "parameters")?;
        accelerator.write(&mut parameters, table.as_bytes())?;

        let trials_per_lane_arg = accelerator.allocate(4, "trials_per_lane")?;
        let mut lane_count_arg = accelerator.allocate(4, "lane_count")?;
        accelerator.write(&mut lane_count_arg, bytemuck::bytes_of(&lane_count))?;

        let state = accelerator.allocate(
            lane_count as usize * WORDS_PER_LANE * std::mem::size_of::<u32>(),
            "state",
        )?;

        tracing::info!(
            device = accelerator.name(),
            lane_ceiling,
            lane_count,
            work_group_size = options.work_group_size,
            wrapped_parameters = table.wrapped(),
            "Accelerator session initialized"
        );

        let mut session = Self {
            results: ResultBufferCache::new(),
            state,
            lane_count_arg,
            trials_per_lane_arg,
            parameters,
            accelerator,
            options,
            lane_ceiling,
            seed,
        };
        session.set_seed(seed)?;
        Ok(session)
    }

    /// Recompute every lane's generator state from `seed` and upload it.
    pub fn set_seed(&mut self, seed: u32) -> Result<()> {
        let state = seed_states(seed, self.lane_ceiling, self.options.oversubscription_factor);
        self.accelerator.write(&mut self.state, state.as_bytes())?;
        self.seed = seed;
        tracing::debug!(seed, lanes = state.lane_count(), "Seeded generator state");
        Ok(())
    }

    /// Generate at least `requested_trials` Bernoulli outcomes.
    ///
    /// Blocks until the device has finished. The returned buffer holds
    /// `plan.result_buffer_len` bytes; only the first `requested_trials`
    /// belong to the request.
    pub fn run(&mut self, requested_trials: u64) -> Result<RunResult> {
        let plan = self.plan(requested_trials)?;

        self.accelerator.write(
            &mut self.trials_per_lane_arg,
            bytemuck::bytes_of(&plan.trials_per_lane),
        )?;

        let results = self
            .results
            .ensure(&self.accelerator, plan.result_buffer_len)?;

        self.accelerator.dispatch(
            KernelArgs {
                parameters: &self.parameters,
                trials_per_lane: &self.trials_per_lane_arg,
                lane_count: &self.lane_count_arg,
                results,
                state: &self.state,
            },
            &plan,
            self.options.work_group_size,
        )?;

        let mut outcomes = vec![0u8; plan.result_buffer_len];
        self.accelerator.read(results, &mut outcomes)?;

        Ok(RunResult::new(plan, outcomes))
    }

    /// Dispatch plan `run` would use for `requested_trials`.
    pub fn plan(&self, requested_trials: u64) -> Result<DispatchPlan> {
        dispatch::plan(
            requested_trials,
            self.lane_ceiling,
            self.options.oversubscription_factor,
        )
    }

    /// Read the device copy of the generator state.
    pub fn read_state(&self) -> Result<Vec<u32>> {
        let mut bytes = vec![0u8; self.state.len()];
        self.accelerator.read(&self.state, &mut bytes)?;
        Ok(bytemuck::pod_collect_to_vec(&bytes))
    }

    /// Current seed.
    pub fn seed(&self) -> u32 {
        self.seed
    }

    /// Hardware lane ceiling of the device.
    pub fn lane_ceiling(&self) -> u32 {
        self.lane_ceiling
    }

    /// Logical lanes per dispatch.
    pub fn lane_count(&self) -> u32 {
        self.lane_ceiling * self.options.oversubscription_factor
    }

    /// Session options.
    pub fn options(&self) -> SessionOptions {
        self.options
    }

    /// Length of the cached result buffer, if one is allocated.
    pub fn result_buffer_len(&self) -> Option<usize> {
        self.results.len()
    }

    /// The underlying accelerator.
    pub fn accelerator(&self) -> &A {
        &self.accelerator
    }

    /// Release every buffer and the device.
    pub fn close(self) {
        drop(self);
    }
}

impl<A: Accelerator> Drop for AcceleratorSession<A> {
    fn drop(&mut self) {
        tracing::debug!(device = self.accelerator.name(), "Releasing accelerator session");
    }
}

fn checked_lane_ceiling<A: Accelerator>(accelerator: &A) -> Result<u32> {
    match accelerator.lane_ceiling() {
        0 => Err(SweepError::AcceleratorUnavailable(format!(
            "{} reports no usable lanes",
            accelerator.name()
        ))),
        lanes => Ok(lanes),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::HostAccelerator;
    use crate::params::ParameterRecord;
    use crate::stream::seed_states;

    fn table(lanes: u32) -> ParameterTable {
        ParameterTable::from_records(
            (0..lanes)
                .map(|i| ParameterRecord {
                    matrix_a: 0x9908_B0DF ^ i,
                    mask_b: 0x9D2C_5680,
                    mask_c: 0xEFC6_0000,
                    seed: i,
                })
                .collect(),
        )
    }

    fn session(lanes: u32, factor: u32) -> AcceleratorSession<HostAccelerator> {
        AcceleratorSession::with_parameters(
            HostAccelerator::new(lanes),
            &table(lanes),
            1,
            SessionOptions {
                oversubscription_factor: factor,
                work_group_size: 128,
            },
        )
        .unwrap()
    }

    #[test]
    fn test_initial_state_matches_seed() {
        let session = session(4, 3);
        assert_eq!(session.lane_count(), 12);
        assert_eq!(session.read_state().unwrap(), seed_states(1, 4, 3).words());
    }

    #[test]
    fn test_set_seed_replaces_state() {
        let mut session = session(4, 2);
        session.run(100).unwrap();

        session.set_seed(9).unwrap();
        let first = session.read_state().unwrap();
        session.set_seed(9).unwrap();
        let second = session.read_state().unwrap();

        assert_eq!(first, second);
        assert_eq!(first, seed_states(9, 4, 2).words());
        assert_eq!(session.seed(), 9);
    }

    #[test]
    fn test_run_returns_full_buffer() {
        let mut session = session(4, 2);
        let result = session.run(13).unwrap();

        assert_eq!(result.plan().trials_per_lane, 2);
        assert_eq!(result.outcomes().len(), 16);
        assert_eq!(result.requested_outcomes().len(), 13);
    }

    #[test]
    fn test_result_buffer_cached_by_length() {
        let mut session = session(4, 2);
        assert_eq!(session.result_buffer_len(), None);

        session.run(8).unwrap();
        assert_eq!(session.result_buffer_len(), Some(8));
        session.run(5).unwrap();
        assert_eq!(session.result_buffer_len(), Some(8));
        session.run(20).unwrap();
        assert_eq!(session.result_buffer_len(), Some(24));
    }

    #[test]
    fn test_same_seed_reproduces_runs() {
        let mut a = session(8, 2);
        let mut b = session(8, 2);
        assert_eq!(a.run(500).unwrap(), b.run(500).unwrap());
        assert_eq!(a.run(500).unwrap(), b.run(500).unwrap());
    }

    #[test]
    fn test_consecutive_runs_continue_streams() {
        let mut session = session(8, 2);
        let first = session.run(256).unwrap();
        let second = session.run(256).unwrap();
        assert_ne!(first.outcomes(), second.outcomes());
    }

    #[test]
    fn test_zero_trials_rejected() {
        let mut session = session(4, 2);
        assert!(matches!(
            session.run(0),
            Err(SweepError::InvalidTrialCount(_))
        ));
    }

    #[test]
    fn test_table_length_must_match_lanes() {
        let err = AcceleratorSession::with_parameters(
            HostAccelerator::new(8),
            &table(4),
            1,
            SessionOptions::default(),
        )
        .err()
        .unwrap();
        assert!(matches!(err, SweepError::ParameterLoadFailed { .. }));
    }

    #[test]
    fn test_no_lanes_is_unavailable() {
        let err = AcceleratorSession::with_parameters(
            HostAccelerator::new(0),
            &table(0),
            1,
            SessionOptions::default(),
        )
        .err()
        .unwrap();
        assert!(matches!(err, SweepError::AcceleratorUnavailable(_)));
    }

    #[test]
    fn test_run_result_mean_ignores_excess() {
        let plan = dispatch::plan(3, 2, 2).unwrap();
        let result = RunResult::new(plan, vec![1, 0, 1, 1]);
        assert_eq!(result.successes(), 2);
        assert!((result.sample_mean() - 2.0 / 3.0).abs() < 1e-12);
    }
}
