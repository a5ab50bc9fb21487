//! Dispatch sizing.
//!
//! Maps a requested trial count onto a fixed number of logical lanes. The
//! lane count does not depend on the request: it is the hardware lane
//! ceiling times the oversubscription factor. Each lane produces the same
//! number of trials, so the result buffer is rounded up to a multiple of the
//! lane count and may hold more outcomes than were asked for. Consumers
//! must only look at the first `requested_trials` bytes.

use crate::error::{Result, SweepError};

/// Concrete execution plan for one dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DispatchPlan {
    /// Trials the caller asked for.
    pub requested_trials: u64,
    /// Logical lanes launched.
    pub lane_count: u32,
    /// Bernoulli outcomes produced by each lane.
    pub trials_per_lane: u32,
    /// Bytes in the result buffer (`lane_count * trials_per_lane`).
    pub result_buffer_len: usize,
}

impl DispatchPlan {
    /// Outcomes generated beyond the request.
    pub fn excess_trials(&self) -> u64 {
        self.result_buffer_len as u64 - self.requested_trials
    }

    /// Number of work groups needed to cover all lanes.
    pub fn work_groups(&self, work_group_size: u32) -> u32 {
        self.lane_count.div_ceil(work_group_size.max(1))
    }
}

/// Plan a dispatch for `requested_trials` Bernoulli trials.
pub fn plan(
    requested_trials: u64,
    lane_ceiling: u32,
    oversubscription_factor: u32,
) -> Result<DispatchPlan> {
    if requested_trials == 0 {
        return Err(SweepError::InvalidTrialCount(
            "requested trials must be > 0".to_string(),
        ));
    }

    let lane_count = lane_ceiling
        .checked_mul(oversubscription_factor)
        .filter(|&lanes| lanes > 0)
        .ok_or_else(|| {
            SweepError::InvalidConfig(format!(
                "lane ceiling {} x oversubscription {} does not give a usable lane count",
                lane_ceiling, oversubscription_factor
            ))
        })?;

    let trials_per_lane = u32::try_from(requested_trials.div_ceil(lane_count as u64))
        .map_err(|_| {
            SweepError::InvalidTrialCount(format!(
                "{} trials exceed {} lanes x u32::MAX trials per lane",
                requested_trials, lane_count
            ))
        })?;

    let result_buffer_len = usize::try_from(trials_per_lane as u64 * lane_count as u64)
        .map_err(|_| {
            SweepError::InvalidTrialCount(format!(
                "{} trials do not fit in host memory",
                requested_trials
            ))
        })?;

    Ok(DispatchPlan {
        requested_trials,
        lane_count,
        trials_per_lane,
        result_buffer_len,
    })
}
