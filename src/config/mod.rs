//! Configuration module for trendcast.
//!
//! This module provides structured configuration loading from environment variables,
//! organized by concern: Network, Storage, and Observability.

mod network_env_config;
mod observability_config;
mod storage_config;

pub use network_env_config::NetworkEnvConfig;
pub use observability_config::ObservabilityEnvConfig;
pub use storage_config::StorageEnvConfig;

use crate::domain::config::NetworkConfig;
use anyhow::{Context, Result, ensure};
use std::path::PathBuf;

/// Main application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    // Storage (from StorageEnvConfig)
    pub data_path: PathBuf,
    pub value_column: String,
    pub model_path: PathBuf,
    pub display_window: usize,
    pub min_training_length: usize,
    pub poll_interval_secs: u64,

    // Network (from NetworkEnvConfig, validated)
    pub network: NetworkConfig,

    // Observability (from ObservabilityEnvConfig)
    pub observability_enabled: bool,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// This orchestrates loading from all sub-config modules and composes
    /// them into a unified Config struct.
    pub fn from_env() -> Result<Self> {
        let storage = StorageEnvConfig::from_env().context("Failed to load storage config")?;
        let network = NetworkEnvConfig::from_env()
            .context("Failed to load network config")?
            .to_network_config()?;
        let observability = ObservabilityEnvConfig::from_env();

        let config = Self {
            // Storage
            data_path: storage.data_path,
            value_column: storage.value_column,
            model_path: storage.model_path,
            display_window: storage.display_window,
            min_training_length: storage.min_training_length,
            poll_interval_secs: storage.poll_interval_secs,

            // Network
            network,

            // Observability
            observability_enabled: observability.enabled,
        };
        config.validate()?;
        Ok(config)
    }

    /// Cross-checks settings that come from different sub-configs
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.display_window >= self.network.window_size,
            "TRENDCAST_DISPLAY_WINDOW ({}) must be at least TRENDCAST_WINDOW_SIZE ({})",
            self.display_window,
            self.network.window_size
        );
        Ok(())
    }
}
