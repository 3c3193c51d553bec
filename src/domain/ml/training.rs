use serde::{Deserialize, Serialize};

/// Stopping rule and step sizes for one training pass
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainingOptions {
    pub max_iterations: usize,
    pub error_threshold: f64,
    pub learning_rate: f64,
    pub momentum: f64,
}

impl Default for TrainingOptions {
    fn default() -> Self {
        Self {
            max_iterations: 1000,
            error_threshold: 0.005,
            learning_rate: 0.3,
            momentum: 0.1,
        }
    }
}

/// Result of a completed training pass.
///
/// Hitting the iteration cap is a normal completion, `converged` only tells
/// whether the error threshold was reached first.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    pub iterations: usize,
    pub error: f64,
    pub converged: bool,
    pub examples: usize,
}
