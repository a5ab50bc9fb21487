//! Geometric trial-count schedules.
//!
//! A sweep visits `count` trial counts spaced geometrically between an
//! initial and a final value: `value[i] = round(initial * r^i)` with
//! `r = (final / initial)^(1 / (count - 1))`.
//!
//! Rounding can produce plateaus at the low end (several consecutive `1`s,
//! `2`s, ...). Those repeats are kept; every schedule point is still run.

use crate::error::{Result, SweepError};

/// Generate a geometric schedule of trial counts.
///
/// Returns exactly `count` values. The first rounds to `initial` and the
/// last to `final_value`. Values are clamped to at least one trial.
pub fn generate(initial: f64, final_value: f64, count: usize) -> Result<Vec<u64>> {
    if count < 2 {
        return Err(SweepError::InvalidScheduleParameters(format!(
            "schedule length must be at least 2, got {}",
            count
        )));
    }
    if !initial.is_finite() || initial <= 0.0 {
        return Err(SweepError::InvalidScheduleParameters(format!(
            "initial value must be positive, got {}",
            initial
        )));
    }
    if !final_value.is_finite() || final_value < initial {
        return Err(SweepError::InvalidScheduleParameters(format!(
            "final value {} must be >= initial value {}",
            final_value, initial
        )));
    }

    let ratio = (final_value / initial).powf(1.0 / (count - 1) as f64);

    let schedule = (0..count)
        .map(|i| {
            let value = (initial * ratio.powi(i as i32)).round();
            (value as u64).max(1)
        })
        .collect();

    Ok(schedule)
}
