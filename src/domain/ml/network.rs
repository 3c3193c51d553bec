//! Fully connected feed-forward network with sigmoid units.
//!
//! Trained online (one weight update per example) with plain
//! backpropagation plus momentum on the weight changes. The topology is
//! fixed at construction and never changes afterwards.

use super::model_state::{Activation, LayerState, ModelState};
use super::training::{TrainingOptions, TrainingReport};
use crate::domain::errors::NetworkError;
use crate::domain::series::TrainingExample;
use ndarray::{Array1, Array2, Axis};
use rand::Rng;

/// Initial weights are drawn uniformly from this symmetric range.
const INIT_WEIGHT_RANGE: f64 = 0.2;

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

#[derive(Debug, Clone)]
struct Layer {
    /// Shape (outputs, inputs)
    weights: Array2<f64>,
    biases: Array1<f64>,
    /// Previous weight change, scaled by momentum on the next update
    changes: Array2<f64>,
}

impl Layer {
    fn random<R: Rng>(inputs: usize, outputs: usize, rng: &mut R) -> Self {
        let weights = Array2::from_shape_fn((outputs, inputs), |_| {
            rng.random_range(-INIT_WEIGHT_RANGE..INIT_WEIGHT_RANGE)
        });
        let biases = Array1::from_shape_fn(outputs, |_| {
            rng.random_range(-INIT_WEIGHT_RANGE..INIT_WEIGHT_RANGE)
        });
        Self {
            weights,
            biases,
            changes: Array2::zeros((outputs, inputs)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FeedForwardNetwork {
    sizes: Vec<usize>,
    layers: Vec<Layer>,
}

impl FeedForwardNetwork {
    /// Creates a randomly initialised network.
    ///
    /// `sizes` lists every layer width, input first and output last; it must
    /// hold at least two entries.
    pub fn new<R: Rng>(sizes: &[usize], rng: &mut R) -> Self {
        let mut layers = Vec::with_capacity(sizes.len().saturating_sub(1));
        for pair in sizes.windows(2) {
            layers.push(Layer::random(pair[0], pair[1], rng));
        }
        Self {
            sizes: sizes.to_vec(),
            layers,
        }
    }

    pub fn input_size(&self) -> usize {
        self.sizes.first().copied().unwrap_or(0)
    }

    pub fn output_size(&self) -> usize {
        self.sizes.last().copied().unwrap_or(0)
    }

    /// Outputs of every layer, starting with the input itself
    fn activations(&self, input: &Array1<f64>) -> Vec<Array1<f64>> {
        let mut acts = Vec::with_capacity(self.layers.len() + 1);
        acts.push(input.clone());
        for layer in &self.layers {
            let next = {
                let prev = &acts[acts.len() - 1];
                (layer.weights.dot(prev) + &layer.biases).mapv(sigmoid)
            };
            acts.push(next);
        }
        acts
    }

    /// Runs inference on a single input vector.
    pub fn run(&self, input: &[f64]) -> Result<Vec<f64>, NetworkError> {
        if input.len() != self.input_size() {
            return Err(NetworkError::ShapeMismatch {
                expected: self.input_size(),
                actual: input.len(),
            });
        }
        let acts = self.activations(&Array1::from(input.to_vec()));
        Ok(acts.last().map(|a| a.to_vec()).unwrap_or_default())
    }

    /// Mean squared error over a set of examples, without touching weights.
    pub fn evaluate(&self, examples: &[TrainingExample]) -> Result<f64, NetworkError> {
        let patterns = self.patterns(examples)?;
        let total: f64 = patterns
            .iter()
            .map(|(input, target)| {
                let acts = self.activations(input);
                let output = &acts[acts.len() - 1];
                let errors = target - output;
                errors.mapv(|e| e * e).sum() / errors.len() as f64
            })
            .sum();
        Ok(total / patterns.len() as f64)
    }

    /// Trains until the mean error drops to the threshold or the iteration
    /// cap is hit.
    ///
    /// Weights are updated in place; on `Err` the network may hold partially
    /// updated weights, so callers train a copy when they need rollback.
    pub fn train(
        &mut self,
        examples: &[TrainingExample],
        options: &TrainingOptions,
    ) -> Result<TrainingReport, NetworkError> {
        let patterns = self.patterns(examples)?;

        let mut iterations = 0;
        let mut error = f64::INFINITY;
        while iterations < options.max_iterations && error > options.error_threshold {
            let mut sum = 0.0;
            for (input, target) in &patterns {
                sum += self.train_pattern(input, target, options.learning_rate, options.momentum);
            }
            error = sum / patterns.len() as f64;
            iterations += 1;

            if !error.is_finite() {
                return Err(NetworkError::Diverged {
                    iteration: iterations,
                    error,
                });
            }
        }

        Ok(TrainingReport {
            iterations,
            error,
            converged: error <= options.error_threshold,
            examples: patterns.len(),
        })
    }

    fn patterns(
        &self,
        examples: &[TrainingExample],
    ) -> Result<Vec<(Array1<f64>, Array1<f64>)>, NetworkError> {
        if examples.is_empty() {
            return Err(NetworkError::EmptyTrainingSet);
        }
        if self.output_size() != 1 {
            return Err(NetworkError::ShapeMismatch {
                expected: self.output_size(),
                actual: 1,
            });
        }
        examples
            .iter()
            .map(|example| {
                let input = example.input.as_slice();
                if input.len() != self.input_size() {
                    return Err(NetworkError::ShapeMismatch {
                        expected: self.input_size(),
                        actual: input.len(),
                    });
                }
                Ok((
                    Array1::from(input.to_vec()),
                    Array1::from_elem(1, example.target),
                ))
            })
            .collect()
    }

    /// One backpropagation step; returns the squared error of this pattern
    /// before the update.
    fn train_pattern(
        &mut self,
        input: &Array1<f64>,
        target: &Array1<f64>,
        learning_rate: f64,
        momentum: f64,
    ) -> f64 {
        let acts = self.activations(input);
        let errors = target - &acts[acts.len() - 1];
        let squared_error = errors.mapv(|e| e * e).sum() / errors.len() as f64;

        // Deltas are computed for every layer before any weight moves.
        let mut deltas = vec![Array1::<f64>::zeros(0); self.layers.len()];
        let mut error = errors;
        for l in (0..self.layers.len()).rev() {
            let delta = &error * &acts[l + 1].mapv(|o| o * (1.0 - o));
            if l > 0 {
                error = self.layers[l].weights.t().dot(&delta);
            }
            deltas[l] = delta;
        }

        for (l, layer) in self.layers.iter_mut().enumerate() {
            let delta = &deltas[l];
            let gradient = delta
                .view()
                .insert_axis(Axis(1))
                .dot(&acts[l].view().insert_axis(Axis(0)));
            let change = gradient * learning_rate + &layer.changes * momentum;
            layer.weights += &change;
            layer.changes = change;
            layer.biases.scaled_add(learning_rate, delta);
        }

        squared_error
    }

    /// Snapshot of topology and weights, without a training summary.
    pub fn to_state(&self) -> ModelState {
        ModelState {
            sizes: self.sizes.clone(),
            activation: Activation::Sigmoid,
            layers: self
                .layers
                .iter()
                .map(|layer| LayerState {
                    weights: layer.weights.outer_iter().map(|row| row.to_vec()).collect(),
                    biases: layer.biases.to_vec(),
                })
                .collect(),
            training: None,
        }
    }

    /// Rebuilds a network from a persisted document, checking every
    /// dimension and rejecting non-finite weights.
    pub fn from_state(state: &ModelState) -> Result<Self, NetworkError> {
        let malformed = |reason: String| NetworkError::MalformedState { reason };

        if state.sizes.len() < 2 || state.sizes.contains(&0) {
            return Err(malformed(format!("invalid layer sizes {:?}", state.sizes)));
        }
        if state.layers.len() != state.sizes.len() - 1 {
            return Err(malformed(format!(
                "expected {} layers, found {}",
                state.sizes.len() - 1,
                state.layers.len()
            )));
        }

        let mut layers = Vec::with_capacity(state.layers.len());
        for (index, (layer, pair)) in state.layers.iter().zip(state.sizes.windows(2)).enumerate() {
            let (inputs, outputs) = (pair[0], pair[1]);
            if layer.weights.len() != outputs || layer.biases.len() != outputs {
                return Err(malformed(format!(
                    "layer {} should have {} units",
                    index, outputs
                )));
            }
            if layer.weights.iter().any(|row| row.len() != inputs) {
                return Err(malformed(format!(
                    "layer {} rows should have {} weights",
                    index, inputs
                )));
            }

            let flat: Vec<f64> = layer.weights.iter().flatten().copied().collect();
            if flat.iter().chain(layer.biases.iter()).any(|w| !w.is_finite()) {
                return Err(malformed(format!("layer {} has non-finite weights", index)));
            }

            let weights = Array2::from_shape_vec((outputs, inputs), flat)
                .map_err(|e| malformed(e.to_string()))?;
            layers.push(Layer {
                weights,
                biases: Array1::from(layer.biases.clone()),
                changes: Array2::zeros((outputs, inputs)),
            });
        }

        Ok(Self {
            sizes: state.sizes.clone(),
            layers,
        })
    }
}
