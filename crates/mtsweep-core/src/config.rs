//! Sweep configuration.
//!
//! All tunables of an experiment live in [`SweepConfig`]. It can be built
//! programmatically with [`SweepConfigBuilder`] or read from TOML, where
//! every field is optional and falls back to its default.
//!
//! ```toml
//! initial_trials = 1
//! final_trials = 100000000
//! schedule_length = 100
//! repeats_per_point = 10
//! true_probability = 0.5
//! oversubscription_factor = 100
//! work_group_size = 128
//! seed = 1
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SweepError};

/// Experiment configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    /// First schedule value.
    pub initial_trials: u64,
    /// Last schedule value.
    pub final_trials: u64,
    /// Number of schedule points.
    pub schedule_length: usize,
    /// Independent runs per schedule point.
    pub repeats_per_point: usize,
    /// Probability the sample means are compared against.
    pub true_probability: f64,
    /// Logical lanes per hardware lane.
    pub oversubscription_factor: u32,
    /// Lanes per work group.
    pub work_group_size: u32,
    /// Seed used to derive every lane's generator state.
    pub seed: u32,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            initial_trials: 1,
            final_trials: 100_000_000,
            schedule_length: 100,
            repeats_per_point: 10,
            true_probability: 0.5,
            oversubscription_factor: 100,
            work_group_size: 128,
            seed: 1,
        }
    }
}

impl SweepConfig {
    /// Create a builder starting from defaults.
    pub fn builder() -> SweepConfigBuilder {
        SweepConfigBuilder::new()
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| SweepError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            SweepError::InvalidConfig(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Serialize to TOML.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| SweepError::InvalidConfig(e.to_string()))
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.schedule_length < 2 {
            return Err(SweepError::InvalidConfig(
                "schedule_length must be at least 2".to_string(),
            ));
        }
        if self.initial_trials == 0 {
            return Err(SweepError::InvalidConfig(
                "initial_trials must be greater than 0".to_string(),
            ));
        }
        if self.final_trials < self.initial_trials {
            return Err(SweepError::InvalidConfig(format!(
                "final_trials ({}) must be >= initial_trials ({})",
                self.final_trials, self.initial_trials
            )));
        }
        if self.repeats_per_point == 0 {
            return Err(SweepError::InvalidConfig(
                "repeats_per_point must be greater than 0".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.true_probability) {
            return Err(SweepError::InvalidConfig(format!(
                "true_probability must be in [0, 1], got {}",
                self.true_probability
            )));
        }
        if self.oversubscription_factor == 0 {
            return Err(SweepError::InvalidConfig(
                "oversubscription_factor must be greater than 0".to_string(),
            ));
        }
        if self.work_group_size == 0 {
            return Err(SweepError::InvalidConfig(
                "work_group_size must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Fluent builder for [`SweepConfig`].
#[derive(Debug, Clone, Default)]
pub struct SweepConfigBuilder {
    config: SweepConfig,
}

impl SweepConfigBuilder {
    /// Create a builder with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing configuration.
    pub fn from_config(config: SweepConfig) -> Self {
        Self { config }
    }

    /// Set the schedule endpoints.
    pub fn trials(mut self, initial: u64, final_trials: u64) -> Self {
        self.config.initial_trials = initial;
        self.config.final_trials = final_trials;
        self
    }

    /// Set the number of schedule points.
    pub fn schedule_length(mut self, length: usize) -> Self {
        self.config.schedule_length = length;
        self
    }

    /// Set the runs per schedule point.
    pub fn repeats_per_point(mut self, repeats: usize) -> Self {
        self.config.repeats_per_point = repeats;
        self
    }

    /// Set the reference probability.
    pub fn true_probability(mut self, p: f64) -> Self {
        self.config.true_probability = p;
        self
    }

    /// Set the oversubscription factor.
    pub fn oversubscription_factor(mut self, factor: u32) -> Self {
        self.config.oversubscription_factor = factor;
        self
    }

    /// Set the work group size.
    pub fn work_group_size(mut self, size: u32) -> Self {
        self.config.work_group_size = size;
        self
    }

    /// Set the seed.
    pub fn seed(mut self, seed: u32) -> Self {
        self.config.seed = seed;
        self
    }

    /// Validate and return the configuration.
    pub fn build(self) -> Result<SweepConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SweepConfig::default();
        assert_eq!(config.initial_trials, 1);
        assert_eq!(config.final_trials, 100_000_000);
        assert_eq!(config.schedule_length, 100);
        assert_eq!(config.repeats_per_point, 10);
        assert_eq!(config.true_probability, 0.5);
        assert_eq!(config.oversubscription_factor, 100);
        assert_eq!(config.work_group_size, 128);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = SweepConfig::builder()
            .trials(10, 1000)
            .schedule_length(5)
            .repeats_per_point(3)
            .oversubscription_factor(4)
            .work_group_size(64)
            .seed(9)
            .build()
            .unwrap();

        assert_eq!(config.initial_trials, 10);
        assert_eq!(config.final_trials, 1000);
        assert_eq!(config.schedule_length, 5);
        assert_eq!(config.repeats_per_point, 3);
        assert_eq!(config.oversubscription_factor, 4);
        assert_eq!(config.work_group_size, 64);
        assert_eq!(config.seed, 9);
    }

    #[test]
    fn test_validation_failures() {
        let cases = [
            SweepConfig::builder().schedule_length(1),
            SweepConfig::builder().trials(0, 10),
            SweepConfig::builder().trials(100, 10),
            SweepConfig::builder().repeats_per_point(0),
            SweepConfig::builder().true_probability(1.5),
            SweepConfig::builder().true_probability(f64::NAN),
            SweepConfig::builder().oversubscription_factor(0),
            SweepConfig::builder().work_group_size(0),
        ];

        for builder in cases {
            assert!(matches!(builder.build(), Err(SweepError::InvalidConfig(_))));
        }
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = SweepConfig::from_toml_str(
            r#"
            final_trials = 5000
            repeats_per_point = 4
            "#,
        )
        .unwrap();

        assert_eq!(config.final_trials, 5000);
        assert_eq!(config.repeats_per_point, 4);
        assert_eq!(config.schedule_length, 100);
        assert_eq!(config.seed, 1);
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = SweepConfig::builder().seed(77).build().unwrap();
        let text = config.to_toml_string().unwrap();
        assert_eq!(SweepConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn test_invalid_toml() {
        assert!(matches!(
            SweepConfig::from_toml_str("repeats_per_point = \"ten\""),
            Err(SweepError::InvalidConfig(_))
        ));
        assert!(matches!(
            SweepConfig::from_toml_str("repeats_per_point = 0"),
            Err(SweepError::InvalidConfig(_))
        ));
    }
}
