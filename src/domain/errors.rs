use crate::domain::config::NetworkConfigError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while turning a raw series into training data
#[derive(Debug, Error, PartialEq)]
pub enum SeriesError {
    #[error("Non-finite value {value} at index {index}")]
    NonFinite { index: usize, value: f64 },

    #[error("Window size must be at least 1")]
    InvalidWindowSize,
}

/// Errors raised by the feed-forward network
#[derive(Debug, Error, PartialEq)]
pub enum NetworkError {
    #[error("Shape mismatch: expected {expected} values, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },

    #[error("Training set is empty")]
    EmptyTrainingSet,

    #[error("Training diverged at iteration {iteration} (error = {error})")]
    Diverged { iteration: usize, error: f64 },

    #[error("Malformed model state: {reason}")]
    MalformedState { reason: String },
}

/// Errors raised while persisting model state
#[derive(Debug, Error)]
pub enum ModelStoreError {
    #[error("Failed to serialize model state: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Failed to write model file {path:?}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Model store unavailable: {reason}")]
    Unavailable { reason: String },
}

/// Hard failures surfaced by the predictor engine.
///
/// Soft conditions (no new data, short series, numerical trouble) are
/// reported through `TrainOutcome` instead.
#[derive(Debug, Error)]
pub enum PredictorError {
    #[error("Invalid network configuration: {0}")]
    InvalidConfig(#[from] NetworkConfigError),

    #[error("Failed to persist trained model: {0}")]
    Persistence(#[from] ModelStoreError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_series_error_formatting() {
        let error = SeriesError::NonFinite {
            index: 4,
            value: f64::NAN,
        };

        let msg = error.to_string();
        assert!(msg.contains("index 4"));
        assert!(msg.contains("NaN"));
    }

    #[test]
    fn test_persistence_error_wraps_store_error() {
        let error = PredictorError::from(ModelStoreError::Unavailable {
            reason: "disk full".to_string(),
        });

        let msg = error.to_string();
        assert!(msg.contains("persist"));
        assert!(msg.contains("disk full"));
    }
}
