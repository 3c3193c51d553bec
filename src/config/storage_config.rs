//! Data and model location parsing from environment variables.

use crate::application::forecast_service::{DEFAULT_DISPLAY_WINDOW, DEFAULT_MIN_TRAINING_LENGTH};
use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;

/// Storage environment configuration
#[derive(Debug, Clone)]
pub struct StorageEnvConfig {
    pub data_path: PathBuf,
    pub value_column: String,
    pub model_path: PathBuf,
    pub display_window: usize,
    pub min_training_length: usize,
    pub poll_interval_secs: u64,
}

impl StorageEnvConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            data_path: PathBuf::from(
                env::var("TRENDCAST_DATA_PATH").unwrap_or_else(|_| "data.csv".to_string()),
            ),
            value_column: env::var("TRENDCAST_VALUE_COLUMN")
                .unwrap_or_else(|_| "value".to_string()),
            model_path: PathBuf::from(
                env::var("TRENDCAST_MODEL_PATH").unwrap_or_else(|_| "model.json".to_string()),
            ),
            display_window: env::var("TRENDCAST_DISPLAY_WINDOW")
                .unwrap_or_else(|_| DEFAULT_DISPLAY_WINDOW.to_string())
                .parse::<usize>()
                .context("Failed to parse TRENDCAST_DISPLAY_WINDOW")?,
            min_training_length: env::var("TRENDCAST_MIN_TRAINING_LENGTH")
                .unwrap_or_else(|_| DEFAULT_MIN_TRAINING_LENGTH.to_string())
                .parse::<usize>()
                .context("Failed to parse TRENDCAST_MIN_TRAINING_LENGTH")?,
            poll_interval_secs: env::var("TRENDCAST_POLL_INTERVAL_SECS")
                .unwrap_or_else(|_| "0".to_string())
                .parse::<u64>()
                .context("Failed to parse TRENDCAST_POLL_INTERVAL_SECS")?,
        })
    }
}
