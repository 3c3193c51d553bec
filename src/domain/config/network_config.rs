//! Network Configuration Domain Value Object
//!
//! This module defines the `NetworkConfig` value object, which encapsulates
//! the forecasting network's topology and training parameters with
//! validation logic.
//!
//! # Invariants
//!
//! - `window_size` and every hidden layer width must be > 0
//! - `learning_rate` must be positive, `momentum` in [0.0, 1.0)
//! - `max_iterations` must be > 0, `error_threshold` must be >= 0
//! - `normalization_scale` must be finite and non-zero

use crate::domain::ml::training::TrainingOptions;
use crate::domain::series::{NORMALIZATION_SCALE, Normalizer};
use thiserror::Error;

/// Error type for NetworkConfig validation
#[derive(Debug, Error, PartialEq)]
pub enum NetworkConfigError {
    #[error("Invalid size: {field} = {value}. Must be positive")]
    InvalidSize { field: String, value: usize },

    #[error("Invalid rate: {field} = {value}. {constraint}")]
    InvalidRate {
        field: String,
        value: f64,
        constraint: String,
    },

    #[error("Network needs at least one hidden layer")]
    NoHiddenLayers,
}

/// Forecasting network configuration value object
///
/// # Example
///
/// ```rust
/// use trendcast::domain::config::NetworkConfig;
///
/// let config = NetworkConfig {
///     window_size: 5,
///     ..NetworkConfig::default()
/// };
/// assert!(config.validate().is_ok());
/// assert_eq!(config.layer_sizes(), vec![5, 10, 10, 1]);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkConfig {
    /// Number of lagged values fed to the network
    pub window_size: usize,

    /// Widths of the hidden layers, input side first
    pub hidden_layers: Vec<usize>,

    /// Step size of each weight update
    pub learning_rate: f64,

    /// Fraction of the previous weight change carried into the next one
    pub momentum: f64,

    /// Hard cap on passes over the training set
    pub max_iterations: usize,

    /// Mean squared error at which training stops early
    pub error_threshold: f64,

    /// Divisor mapping raw values into network space
    pub normalization_scale: f64,

    /// Seed for weight initialisation (None = random)
    pub seed: Option<u64>,
}

impl NetworkConfig {
    /// Validate all invariants
    pub fn validate(&self) -> Result<(), NetworkConfigError> {
        Self::validate_size("window_size", self.window_size)?;

        if self.hidden_layers.is_empty() {
            return Err(NetworkConfigError::NoHiddenLayers);
        }
        for width in &self.hidden_layers {
            Self::validate_size("hidden_layers", *width)?;
        }

        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(NetworkConfigError::InvalidRate {
                field: "learning_rate".to_string(),
                value: self.learning_rate,
                constraint: "Must be positive".to_string(),
            });
        }

        if !(0.0..1.0).contains(&self.momentum) {
            return Err(NetworkConfigError::InvalidRate {
                field: "momentum".to_string(),
                value: self.momentum,
                constraint: "Must be in [0.0, 1.0)".to_string(),
            });
        }

        Self::validate_size("max_iterations", self.max_iterations)?;

        if !(self.error_threshold.is_finite() && self.error_threshold >= 0.0) {
            return Err(NetworkConfigError::InvalidRate {
                field: "error_threshold".to_string(),
                value: self.error_threshold,
                constraint: "Must be >= 0.0".to_string(),
            });
        }

        if !self.normalization_scale.is_finite() || self.normalization_scale == 0.0 {
            return Err(NetworkConfigError::InvalidRate {
                field: "normalization_scale".to_string(),
                value: self.normalization_scale,
                constraint: "Must be finite and non-zero".to_string(),
            });
        }

        Ok(())
    }

    fn validate_size(field: &str, value: usize) -> Result<(), NetworkConfigError> {
        if value == 0 {
            return Err(NetworkConfigError::InvalidSize {
                field: field.to_string(),
                value,
            });
        }
        Ok(())
    }

    /// Full layer layout: window, hidden layers, single output
    pub fn layer_sizes(&self) -> Vec<usize> {
        let mut sizes = Vec::with_capacity(self.hidden_layers.len() + 2);
        sizes.push(self.window_size);
        sizes.extend_from_slice(&self.hidden_layers);
        sizes.push(1);
        sizes
    }

    pub fn training_options(&self) -> TrainingOptions {
        TrainingOptions {
            max_iterations: self.max_iterations,
            error_threshold: self.error_threshold,
            learning_rate: self.learning_rate,
            momentum: self.momentum,
        }
    }

    pub fn normalizer(&self) -> Normalizer {
        Normalizer::new(self.normalization_scale)
    }
}

impl Default for NetworkConfig {
    /// Three-value lookback, two hidden layers of ten units
    fn default() -> Self {
        Self {
            window_size: 3,
            hidden_layers: vec![10, 10],
            learning_rate: 0.3,
            momentum: 0.1,
            max_iterations: 1000,
            error_threshold: 0.005,
            normalization_scale: NORMALIZATION_SCALE,
            seed: None,
        }
    }
}
