//! Error types for the mtsweep CLI.

use mtsweep_core::SweepError;
use thiserror::Error;

/// CLI result type alias.
pub type CliResult<T> = Result<T, CliError>;

/// CLI error type.
#[derive(Error, Debug)]
pub enum CliError {
    /// Failure reported by the sweep library.
    #[error(transparent)]
    Sweep(#[from] SweepError),

    /// IO error during file operations.
    #[error("IO error: {0}")]
    #[allow(dead_code)]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Unknown backend name.
    #[error("Invalid backend: {0}")]
    InvalidBackend(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sweep_error_is_transparent() {
        let err: CliError = SweepError::InvalidTrialCount("0".to_string()).into();
        assert_eq!(
            err.to_string(),
            SweepError::InvalidTrialCount("0".to_string()).to_string()
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let err: CliError = std::io::Error::new(std::io::ErrorKind::NotFound, "missing").into();
        assert!(matches!(err, CliError::Io(_)));
        assert!(err.to_string().contains("missing"));
    }
}
