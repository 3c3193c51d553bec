//! Network configuration parsing from environment variables.
//!
//! This module handles loading topology and training parameters.

use crate::domain::config::NetworkConfig;
use anyhow::{Context, Result};
use std::env;

/// Network environment configuration
#[derive(Debug, Clone)]
pub struct NetworkEnvConfig {
    pub window_size: usize,
    pub hidden_layers: Vec<usize>,
    pub learning_rate: f64,
    pub momentum: f64,
    pub max_iterations: usize,
    pub error_threshold: f64,
    pub normalization_scale: f64,
    pub seed: Option<u64>,
}

impl NetworkEnvConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = NetworkConfig::default();

        let hidden_layers = match env::var("TRENDCAST_HIDDEN_LAYERS") {
            Ok(raw) => Self::parse_layers(&raw)?,
            Err(_) => defaults.hidden_layers.clone(),
        };

        let seed = match env::var("TRENDCAST_SEED") {
            Ok(raw) => Some(
                raw.trim()
                    .parse::<u64>()
                    .context("Failed to parse TRENDCAST_SEED")?,
            ),
            Err(_) => None,
        };

        Ok(Self {
            window_size: Self::parse_usize("TRENDCAST_WINDOW_SIZE", defaults.window_size)?,
            hidden_layers,
            learning_rate: Self::parse_f64("TRENDCAST_LEARNING_RATE", defaults.learning_rate)?,
            momentum: Self::parse_f64("TRENDCAST_MOMENTUM", defaults.momentum)?,
            max_iterations: Self::parse_usize("TRENDCAST_MAX_ITERATIONS", defaults.max_iterations)?,
            error_threshold: Self::parse_f64(
                "TRENDCAST_ERROR_THRESHOLD",
                defaults.error_threshold,
            )?,
            normalization_scale: Self::parse_f64(
                "TRENDCAST_NORMALIZATION_SCALE",
                defaults.normalization_scale,
            )?,
            seed,
        })
    }

    /// Parses a comma-separated list of layer widths, e.g. "10,10"
    pub fn parse_layers(raw: &str) -> Result<Vec<usize>> {
        raw.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| {
                s.parse::<usize>()
                    .with_context(|| format!("Invalid hidden layer width '{}'", s))
            })
            .collect()
    }

    /// Validated domain value object
    pub fn to_network_config(&self) -> Result<NetworkConfig> {
        let config = NetworkConfig {
            window_size: self.window_size,
            hidden_layers: self.hidden_layers.clone(),
            learning_rate: self.learning_rate,
            momentum: self.momentum,
            max_iterations: self.max_iterations,
            error_threshold: self.error_threshold,
            normalization_scale: self.normalization_scale,
            seed: self.seed,
        };
        config
            .validate()
            .map_err(|e| anyhow::anyhow!("Invalid network config: {}", e))?;
        Ok(config)
    }

    fn parse_usize(key: &str, default: usize) -> Result<usize> {
        env::var(key)
            .unwrap_or_else(|_| default.to_string())
            .parse::<usize>()
            .context(format!("Failed to parse {}", key))
    }

    fn parse_f64(key: &str, default: f64) -> Result<f64> {
        env::var(key)
            .unwrap_or_else(|_| default.to_string())
            .parse::<f64>()
            .context(format!("Failed to parse {}", key))
    }
}
