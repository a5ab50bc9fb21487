//! Convergence statistics for one schedule point.
//!
//! Every run at a schedule point contributes its sample mean and wall-clock
//! time. Finalizing compares the means against the true probability:
//!
//! - `rmse = sqrt(mean((mean_i - p)^2))`
//! - `mae  = mean(|mean_i - p|)`

use serde::{Deserialize, Serialize};

use crate::error::{Result, SweepError};

/// Runs accumulated at one schedule point.
#[derive(Debug, Clone, PartialEq)]
pub struct ScalePoint {
    requested_trials: u64,
    sample_means: Vec<f64>,
    wall_clock_micros: Vec<u64>,
}

impl ScalePoint {
    /// Start an empty accumulator for `requested_trials`.
    pub fn new(requested_trials: u64) -> Self {
        Self::with_capacity(requested_trials, 0)
    }

    /// Start an accumulator expecting `runs` runs.
    pub fn with_capacity(requested_trials: u64, runs: usize) -> Self {
        Self {
            requested_trials,
            sample_means: Vec::with_capacity(runs),
            wall_clock_micros: Vec::with_capacity(runs),
        }
    }

    /// Record one run.
    pub fn record_run(&mut self, sample_mean: f64, wall_clock_micros: u64) {
        self.sample_means.push(sample_mean);
        self.wall_clock_micros.push(wall_clock_micros);
    }

    /// Trials per run at this point.
    pub fn requested_trials(&self) -> u64 {
        self.requested_trials
    }

    /// Recorded sample means.
    pub fn sample_means(&self) -> &[f64] {
        &self.sample_means
    }

    /// Recorded wall-clock durations in microseconds.
    pub fn wall_clock_micros(&self) -> &[u64] {
        &self.wall_clock_micros
    }

    /// Number of recorded runs.
    pub fn runs(&self) -> usize {
        self.sample_means.len()
    }

    /// Reduce the recorded runs to error metrics.
    pub fn finalize(&self, true_probability: f64) -> Result<ScaleRecord> {
        if self.sample_means.is_empty() {
            return Err(SweepError::InsufficientSamples {
                requested_trials: self.requested_trials,
            });
        }

        Ok(ScaleRecord {
            requested_trials: self.requested_trials,
            rmse: rmse(&self.sample_means, true_probability),
            mae: mae(&self.sample_means, true_probability),
            mean_wall_clock_micros: mean(self.wall_clock_micros.iter().map(|&t| t as f64)),
            runs: self.runs(),
        })
    }
}

/// Error metrics and timing of one schedule point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScaleRecord {
    /// Trials per run.
    pub requested_trials: u64,
    /// Root mean squared error of the run means.
    pub rmse: f64,
    /// Mean absolute error of the run means.
    pub mae: f64,
    /// Mean wall-clock time per run in microseconds.
    pub mean_wall_clock_micros: f64,
    /// Runs the metrics were computed from.
    pub runs: usize,
}

/// Root mean squared deviation of `values` from `target`.
pub fn rmse(values: &[f64], target: f64) -> f64 {
    mean(values.iter().map(|v| (v - target).powi(2))).sqrt()
}

/// Mean absolute deviation of `values` from `target`.
pub fn mae(values: &[f64], target: f64) -> f64 {
    mean(values.iter().map(|v| (v - target).abs()))
}

fn mean(values: impl ExactSizeIterator<Item = f64>) -> f64 {
    let n = values.len();
    if n == 0 {
        return 0.0;
    }
    values.sum::<f64>() / n as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_ones_against_half() {
        let mut point = ScalePoint::new(1000);
        for _ in 0..10 {
            point.record_run(1.0, 100);
        }
        let record = point.finalize(0.5).unwrap();
        assert_eq!(record.rmse, 0.5);
        assert_eq!(record.mae, 0.5);
        assert_eq!(record.mean_wall_clock_micros, 100.0);
        assert_eq!(record.runs, 10);
    }

    #[test]
    fn test_exact_estimates_have_zero_error() {
        let mut point = ScalePoint::new(1000);
        point.record_run(0.5, 10);
        point.record_run(0.5, 30);
        let record = point.finalize(0.5).unwrap();
        assert_eq!(record.rmse, 0.0);
        assert_eq!(record.mae, 0.0);
        assert_eq!(record.mean_wall_clock_micros, 20.0);
    }

    #[test]
    fn test_rmse_and_mae_differ() {
        // deviations 0.1 and 0.3
        let values = [0.6, 0.2];
        assert!((mae(&values, 0.5) - 0.2).abs() < 1e-12);
        assert!((rmse(&values, 0.5) - (0.05f64).sqrt()).abs() < 1e-12);
        assert!(rmse(&values, 0.5) > mae(&values, 0.5));
    }

    #[test]
    fn test_metrics_not_swapped() {
        let mut point = ScalePoint::new(10);
        point.record_run(0.6, 1);
        point.record_run(0.2, 1);
        let record = point.finalize(0.5).unwrap();
        assert!(record.rmse > record.mae);
    }

    #[test]
    fn test_custom_probability() {
        let mut point = ScalePoint::new(10);
        point.record_run(0.25, 5);
        let record = point.finalize(0.25).unwrap();
        assert_eq!(record.rmse, 0.0);
    }

    #[test]
    fn test_empty_point_insufficient() {
        let point = ScalePoint::new(42);
        assert!(matches!(
            point.finalize(0.5),
            Err(SweepError::InsufficientSamples {
                requested_trials: 42
            })
        ));
    }
}
