//! Persisted network document.
//!
//! The layout is plain JSON: layer sizes, the activation, and per-layer
//! weight rows and biases. There is no version field; the document is
//! overwritten wholesale on every save.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    Sigmoid,
}

/// Weights of one fully connected layer.
///
/// `weights[j][i]` connects input `i` to output unit `j`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerState {
    pub weights: Vec<Vec<f64>>,
    pub biases: Vec<f64>,
}

/// Informational record of the pass that produced the weights
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingSummary {
    pub iterations: usize,
    pub error: f64,
    pub series_length: usize,
    pub trained_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelState {
    pub sizes: Vec<usize>,
    pub activation: Activation,
    pub layers: Vec<LayerState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub training: Option<TrainingSummary>,
}

impl ModelState {
    /// True when the document describes exactly the given layer layout
    pub fn matches_topology(&self, sizes: &[usize]) -> bool {
        self.sizes == sizes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny_state() -> ModelState {
        ModelState {
            sizes: vec![2, 1],
            activation: Activation::Sigmoid,
            layers: vec![LayerState {
                weights: vec![vec![0.1, -0.2]],
                biases: vec![0.05],
            }],
            training: None,
        }
    }

    #[test]
    fn test_document_layout() {
        let json = serde_json::to_value(tiny_state()).unwrap();
        assert_eq!(json["sizes"], serde_json::json!([2, 1]));
        assert_eq!(json["activation"], "sigmoid");
        assert_eq!(json["layers"][0]["biases"], serde_json::json!([0.05]));
        assert!(json.get("training").is_none());
    }

    #[test]
    fn test_missing_training_summary_is_accepted() {
        let json = r#"{"sizes":[2,1],"activation":"sigmoid","layers":[{"weights":[[0.1,-0.2]],"biases":[0.05]}]}"#;
        let state: ModelState = serde_json::from_str(json).unwrap();
        assert_eq!(state, tiny_state());
    }

    #[test]
    fn test_matches_topology() {
        let state = tiny_state();
        assert!(state.matches_topology(&[2, 1]));
        assert!(!state.matches_topology(&[3, 1]));
    }
}
