//! Error types for Monte Carlo sweeps.

use thiserror::Error;

/// Result type alias for sweep operations.
pub type Result<T> = std::result::Result<T, SweepError>;

/// Errors raised by the sweep core and accelerator backends.
#[derive(Error, Debug)]
pub enum SweepError {
    /// Schedule endpoints or length are out of range.
    #[error("Invalid schedule parameters: {0}")]
    InvalidScheduleParameters(String),

    /// A run was requested with no trials.
    #[error("Invalid trial count: {0}")]
    InvalidTrialCount(String),

    /// Configuration failed validation.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// No usable accelerator was found.
    #[error("Accelerator unavailable: {0}")]
    AcceleratorUnavailable(String),

    /// The Bernoulli kernel could not be compiled or resolved.
    #[error("Kernel compilation failed: {0}")]
    KernelCompilationFailed(String),

    /// The parameter table could not be read, even after wrapping around.
    #[error("Parameter load failed at record {record}: {reason}")]
    ParameterLoadFailed {
        /// Index of the record that could not be read.
        record: usize,
        /// Underlying cause.
        reason: String,
    },

    /// The accelerator reported an error while executing or transferring.
    #[error("Accelerator execution failed: {0}")]
    AcceleratorExecutionFailed(String),

    /// Statistics were finalized with no recorded runs.
    #[error("Insufficient samples for {requested_trials} trials: at least one run required")]
    InsufficientSamples {
        /// Schedule point that had no runs.
        requested_trials: u64,
    },

    /// The results file could not be written.
    #[error("Failed to write results to {path}: {source}")]
    OutputWriteFailed {
        /// Destination path.
        path: String,
        /// IO error.
        #[source]
        source: std::io::Error,
    },
}

impl SweepError {
    /// Returns true for failures that happen while building a session.
    ///
    /// These abort initialization and are never retried.
    pub fn is_initialization_error(&self) -> bool {
        matches!(
            self,
            SweepError::AcceleratorUnavailable(_)
                | SweepError::KernelCompilationFailed(_)
                | SweepError::ParameterLoadFailed { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SweepError::InvalidTrialCount("must be > 0".to_string());
        assert_eq!(err.to_string(), "Invalid trial count: must be > 0");

        let err = SweepError::ParameterLoadFailed {
            record: 7,
            reason: "short read".to_string(),
        };
        assert!(err.to_string().contains("record 7"));
    }

    #[test]
    fn test_initialization_errors() {
        assert!(SweepError::AcceleratorUnavailable("none".into()).is_initialization_error());
        assert!(SweepError::KernelCompilationFailed("bad".into()).is_initialization_error());
        assert!(!SweepError::AcceleratorExecutionFailed("lost".into()).is_initialization_error());
        assert!(!SweepError::InvalidTrialCount("0".into()).is_initialization_error());
    }
}
