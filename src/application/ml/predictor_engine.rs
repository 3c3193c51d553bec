//! Incrementally trained next-value predictor.
//!
//! The engine owns the network, the trained flag and the training progress
//! marker. Training is gated on series growth and runs on a staged copy of
//! the network: the copy is persisted first and only then committed together
//! with the new marker, so a failed save leaves the engine exactly as it was.

use crate::domain::config::NetworkConfig;
use crate::domain::errors::{PredictorError, SeriesError};
use crate::domain::ml::{FeedForwardNetwork, ModelState, TrainingReport, TrainingSummary};
use crate::domain::ports::ModelStore;
use crate::domain::series::{self, FeatureWindow, Normalizer};
use crate::infrastructure::observability::Metrics;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Why a `train` call did not produce a new model
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    /// The series has not grown since the last completed pass
    NoNewData { length: usize, seen: usize },
    /// Not a single complete (window, target) example
    InsufficientData { length: usize, required: usize },
    /// The series holds a NaN or infinite value
    InvalidSeries { index: usize },
    /// Shape error or numerical divergence during the pass
    TrainingFailed { reason: String },
}

impl SkipReason {
    fn label(&self) -> &'static str {
        match self {
            SkipReason::NoNewData { .. } => "no_new_data",
            SkipReason::InsufficientData { .. } => "insufficient_data",
            SkipReason::InvalidSeries { .. } => "invalid_series",
            SkipReason::TrainingFailed { .. } => "failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TrainOutcome {
    Trained(TrainingReport),
    Skipped(SkipReason),
}

impl TrainOutcome {
    pub fn is_trained(&self) -> bool {
        matches!(self, TrainOutcome::Trained(_))
    }
}

pub struct PredictorEngine {
    config: NetworkConfig,
    normalizer: Normalizer,
    store: Arc<dyn ModelStore>,
    network: FeedForwardNetwork,
    trained: bool,
    last_data_length: usize,
    metrics: Metrics,
}

impl PredictorEngine {
    /// Builds a fresh network and tries to restore persisted weights.
    ///
    /// Fails only on an invalid `config`. A document that is missing,
    /// malformed or shaped for another topology leaves the engine untrained.
    pub fn new(config: NetworkConfig, store: Arc<dyn ModelStore>) -> Result<Self, PredictorError> {
        Self::with_metrics(config, store, Metrics::default())
    }

    pub fn with_metrics(
        config: NetworkConfig,
        store: Arc<dyn ModelStore>,
        metrics: Metrics,
    ) -> Result<Self, PredictorError> {
        config.validate()?;

        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_rng(&mut rand::rng()),
        };
        let network = FeedForwardNetwork::new(&config.layer_sizes(), &mut rng);

        let mut engine = Self {
            normalizer: config.normalizer(),
            config,
            store,
            network,
            trained: false,
            last_data_length: 0,
            metrics,
        };
        engine.restore();
        Ok(engine)
    }

    fn restore(&mut self) {
        let Some(state) = self.store.load() else {
            info!("No persisted model, predictor starts untrained");
            return;
        };

        let expected = self.config.layer_sizes();
        if !state.matches_topology(&expected) {
            warn!(
                "Persisted model has layers {:?}, expected {:?}; starting untrained",
                state.sizes, expected
            );
            return;
        }

        match FeedForwardNetwork::from_state(&state) {
            Ok(network) => {
                self.network = network;
                self.trained = true;
                info!("Restored persisted model with layers {:?}", state.sizes);
            }
            Err(e) => warn!("Discarding persisted model: {}", e),
        }
    }

    pub fn is_trained(&self) -> bool {
        self.trained
    }

    /// Series length already incorporated into the current weights
    pub fn last_data_length(&self) -> usize {
        self.last_data_length
    }

    pub fn window_size(&self) -> usize {
        self.config.window_size
    }

    /// Current weights as a persistable document
    pub fn model_state(&self) -> ModelState {
        self.network.to_state()
    }

    /// Trains on the full series when it grew since the last pass.
    ///
    /// Only a persistence failure is an `Err`; everything else that prevents
    /// training is reported as `TrainOutcome::Skipped` and leaves the engine
    /// untouched.
    pub fn train(&mut self, series: &[f64]) -> Result<TrainOutcome, PredictorError> {
        let length = series.len();

        if length <= self.last_data_length {
            debug!(
                "Series length {} <= last trained length {}, skipping",
                length, self.last_data_length
            );
            return Ok(self.skip(SkipReason::NoNewData {
                length,
                seen: self.last_data_length,
            }));
        }

        let required = self.config.window_size + 1;
        if length < required {
            debug!("Series length {} below minimum {}, skipping", length, required);
            return Ok(self.skip(SkipReason::InsufficientData { length, required }));
        }

        let examples =
            match series::build_training_set(series, self.config.window_size, &self.normalizer) {
                Ok(examples) => examples,
                Err(e) => {
                    warn!("Training skipped: {}", e);
                    let reason = match e {
                        SeriesError::NonFinite { index, .. } => SkipReason::InvalidSeries { index },
                        SeriesError::InvalidWindowSize => SkipReason::TrainingFailed {
                            reason: e.to_string(),
                        },
                    };
                    return Ok(self.skip(reason));
                }
            };

        let started = Instant::now();
        let mut staged = self.network.clone();
        let report = match staged.train(&examples, &self.config.training_options()) {
            Ok(report) => report,
            Err(e) => {
                error!("Training error: {}", e);
                return Ok(self.skip(SkipReason::TrainingFailed {
                    reason: e.to_string(),
                }));
            }
        };
        self.metrics
            .training_duration_seconds
            .observe(started.elapsed().as_secs_f64());

        let mut state = staged.to_state();
        state.training = Some(TrainingSummary {
            iterations: report.iterations,
            error: report.error,
            series_length: length,
            trained_at: chrono::Utc::now(),
        });

        if let Err(e) = self.store.save(&state) {
            error!("Failed to persist model trained on {} values: {}", length, e);
            self.metrics.inc_training("persistence_error");
            return Err(PredictorError::Persistence(e));
        }

        self.network = staged;
        self.trained = true;
        self.last_data_length = length;

        self.metrics.inc_training("trained");
        self.metrics.training_iterations.set(report.iterations as i64);
        self.metrics.training_error.set(report.error);
        self.metrics.last_data_length.set(length as i64);

        info!(
            "Trained on {} examples: {} iterations, error {:.6}{}",
            report.examples,
            report.iterations,
            report.error,
            if report.converged { "" } else { " (iteration cap)" }
        );
        Ok(TrainOutcome::Trained(report))
    }

    fn skip(&self, reason: SkipReason) -> TrainOutcome {
        self.metrics.inc_training(reason.label());
        TrainOutcome::Skipped(reason)
    }

    /// Forecasts the value following `window`.
    ///
    /// Returns `None` while untrained, when fewer than `window_size` values
    /// are supplied, or when the last window holds a non-finite value.
    pub fn predict(&self, window: &[f64]) -> Option<f64> {
        match self.forecast_next(window) {
            Ok(value) => {
                self.metrics.inc_predictions("ok");
                Some(value)
            }
            Err(result) => {
                self.metrics.inc_predictions(result);
                None
            }
        }
    }

    /// One forecast per prefix of `window`, aligned with it.
    ///
    /// Prefixes shorter than the window size are widened to the window size
    /// (capped at the full window), so the first few entries repeat the
    /// earliest possible forecast. These are not counted as prediction calls.
    pub fn predict_progressive(&self, window: &[f64]) -> Vec<Option<f64>> {
        let k = self.config.window_size;
        (1..=window.len())
            .map(|prefix| {
                self.forecast_next(&window[..prefix.max(k).min(window.len())])
                    .ok()
            })
            .collect()
    }

    /// Uncounted forecast; the error is the metrics label for the failure
    fn forecast_next(&self, window: &[f64]) -> Result<f64, &'static str> {
        if !self.trained {
            return Err("untrained");
        }

        let features = FeatureWindow::from_tail(window, self.config.window_size, &self.normalizer)
            .ok_or("insufficient_window")?;

        let output = self.network.run(features.as_slice()).map_err(|e| {
            error!("Prediction error: {}", e);
            "failed"
        })?;

        match output.first().map(|v| self.normalizer.denormalize(*v)) {
            Some(v) if v.is_finite() => Ok(v),
            _ => {
                warn!("Network produced no finite output");
                Err("failed")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::mock::InMemoryModelStore;

    fn config() -> NetworkConfig {
        NetworkConfig {
            seed: Some(17),
            ..NetworkConfig::default()
        }
    }

    fn trend(len: usize) -> Vec<f64> {
        (1..=len).map(|i| i as f64 * 10.0).collect()
    }

    fn engine_with(store: Arc<InMemoryModelStore>) -> PredictorEngine {
        PredictorEngine::new(config(), store).unwrap()
    }

    #[test]
    fn test_untrained_engine_never_predicts() {
        let engine = engine_with(Arc::new(InMemoryModelStore::new()));
        assert!(!engine.is_trained());
        assert_eq!(engine.predict(&[10.0, 20.0, 30.0]), None);
        assert_eq!(engine.predict(&trend(15)), None);
    }

    #[test]
    fn test_train_sets_marker_and_persists() {
        let store = Arc::new(InMemoryModelStore::new());
        let mut engine = engine_with(store.clone());

        let outcome = engine.train(&trend(8)).unwrap();
        match outcome {
            TrainOutcome::Trained(report) => assert_eq!(report.examples, 5),
            other => panic!("expected training, got {:?}", other),
        }
        assert!(engine.is_trained());
        assert_eq!(engine.last_data_length(), 8);
        assert_eq!(store.save_count(), 1);

        let stored = store.stored().unwrap();
        assert_eq!(stored.sizes, vec![3, 10, 10, 1]);
        assert_eq!(stored.training.unwrap().series_length, 8);
    }

    #[test]
    fn test_same_length_is_a_no_op() {
        let store = Arc::new(InMemoryModelStore::new());
        let mut engine = engine_with(store.clone());

        engine.train(&trend(8)).unwrap();
        let before = engine.model_state();

        let outcome = engine.train(&trend(8)).unwrap();
        assert_eq!(
            outcome,
            TrainOutcome::Skipped(SkipReason::NoNewData { length: 8, seen: 8 })
        );
        assert_eq!(engine.model_state(), before);
        assert_eq!(engine.last_data_length(), 8);
        assert_eq!(store.save_count(), 1);
    }

    #[test]
    fn test_shorter_series_never_lowers_marker() {
        let mut engine = engine_with(Arc::new(InMemoryModelStore::new()));
        engine.train(&trend(10)).unwrap();

        let outcome = engine.train(&trend(6)).unwrap();
        assert!(!outcome.is_trained());
        assert_eq!(engine.last_data_length(), 10);
    }

    #[test]
    fn test_growth_retrains() {
        let store = Arc::new(InMemoryModelStore::new());
        let mut engine = engine_with(store.clone());

        engine.train(&trend(8)).unwrap();
        let outcome = engine.train(&trend(10)).unwrap();

        assert!(outcome.is_trained());
        assert_eq!(engine.last_data_length(), 10);
        assert_eq!(store.save_count(), 2);
    }

    #[test]
    fn test_insufficient_series() {
        let mut engine = engine_with(Arc::new(InMemoryModelStore::new()));
        assert_eq!(
            engine.train(&[]).unwrap(),
            TrainOutcome::Skipped(SkipReason::NoNewData { length: 0, seen: 0 })
        );
        assert_eq!(
            engine.train(&[10.0, 20.0, 30.0]).unwrap(),
            TrainOutcome::Skipped(SkipReason::InsufficientData {
                length: 3,
                required: 4
            })
        );
        assert!(!engine.is_trained());
        assert_eq!(engine.last_data_length(), 0);
    }

    #[test]
    fn test_non_finite_series_is_skipped() {
        let store = Arc::new(InMemoryModelStore::new());
        let mut engine = engine_with(store.clone());

        let outcome = engine.train(&[10.0, 20.0, f64::NAN, 40.0, 50.0]).unwrap();
        assert_eq!(
            outcome,
            TrainOutcome::Skipped(SkipReason::InvalidSeries { index: 2 })
        );
        assert!(!engine.is_trained());
        assert_eq!(engine.last_data_length(), 0);
        assert_eq!(store.save_count(), 0);
    }

    #[test]
    fn test_persistence_failure_keeps_state() {
        let store = Arc::new(InMemoryModelStore::new());
        let mut engine = engine_with(store.clone());
        engine.train(&trend(8)).unwrap();
        let before = engine.model_state();

        store.set_fail_writes(true);
        let err = engine.train(&trend(10)).unwrap_err();
        assert!(matches!(err, PredictorError::Persistence(_)));
        assert_eq!(engine.last_data_length(), 8);
        assert_eq!(engine.model_state(), before);

        store.set_fail_writes(false);
        assert!(engine.train(&trend(10)).unwrap().is_trained());
        assert_eq!(engine.last_data_length(), 10);
    }

    #[test]
    fn test_failed_first_save_stays_untrained() {
        let store = Arc::new(InMemoryModelStore::new());
        store.set_fail_writes(true);
        let mut engine = engine_with(store);

        assert!(engine.train(&trend(8)).is_err());
        assert!(!engine.is_trained());
        assert_eq!(engine.predict(&trend(8)), None);
    }

    #[test]
    fn test_predict_requires_full_window() {
        let mut engine = engine_with(Arc::new(InMemoryModelStore::new()));
        engine.train(&trend(8)).unwrap();

        assert_eq!(engine.predict(&[70.0, 80.0]), None);
        assert_eq!(engine.predict(&[]), None);
        assert_eq!(engine.predict(&[60.0, f64::NAN, 80.0]), None);

        let value = engine.predict(&[60.0, 70.0, 80.0]).unwrap();
        assert!(value.is_finite());
        assert!(value > 0.0 && value < 100.0);
    }

    #[test]
    fn test_predict_uses_only_last_window() {
        let mut engine = engine_with(Arc::new(InMemoryModelStore::new()));
        engine.train(&trend(8)).unwrap();

        assert_eq!(
            engine.predict(&[1.0, 2.0, 60.0, 70.0, 80.0]),
            engine.predict(&[60.0, 70.0, 80.0])
        );
    }

    #[test]
    fn test_restores_persisted_model() {
        let store = Arc::new(InMemoryModelStore::new());
        let mut first = engine_with(store.clone());
        first.train(&trend(8)).unwrap();
        let expected = first.predict(&[60.0, 70.0, 80.0]);

        let second = PredictorEngine::new(
            NetworkConfig {
                seed: Some(99),
                ..NetworkConfig::default()
            },
            store,
        )
        .unwrap();
        assert!(second.is_trained());
        assert_eq!(second.last_data_length(), 0);
        assert_eq!(second.predict(&[60.0, 70.0, 80.0]), expected);
    }

    #[test]
    fn test_incompatible_persisted_model_is_ignored() {
        let store = Arc::new(InMemoryModelStore::new());
        let mut wide = PredictorEngine::new(
            NetworkConfig {
                window_size: 5,
                seed: Some(1),
                ..NetworkConfig::default()
            },
            store.clone(),
        )
        .unwrap();
        wide.train(&trend(12)).unwrap();

        let narrow = engine_with(store);
        assert!(!narrow.is_trained());
    }

    #[test]
    fn test_progressive_predictions_are_aligned() {
        let mut engine = engine_with(Arc::new(InMemoryModelStore::new()));
        engine.train(&trend(8)).unwrap();

        let window = trend(6);
        let predictions = engine.predict_progressive(&window);
        assert_eq!(predictions.len(), window.len());
        assert!(predictions.iter().all(|p| p.is_some()));
        assert_eq!(predictions[0], predictions[2]);
        assert_eq!(predictions[5], engine.predict(&window));
    }

    #[test]
    fn test_progressive_on_short_window() {
        let mut engine = engine_with(Arc::new(InMemoryModelStore::new()));
        engine.train(&trend(8)).unwrap();

        assert_eq!(engine.predict_progressive(&[10.0, 20.0]), vec![None, None]);
        assert!(engine.predict_progressive(&[]).is_empty());
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let result = PredictorEngine::new(
            NetworkConfig {
                window_size: 0,
                ..config()
            },
            Arc::new(InMemoryModelStore::new()),
        );
        assert!(matches!(result, Err(PredictorError::InvalidConfig(_))));
    }

    #[test]
    fn test_progressive_predictions_are_not_counted() {
        let metrics = Metrics::new().unwrap();
        let store = Arc::new(InMemoryModelStore::new());
        let mut engine = PredictorEngine::with_metrics(config(), store, metrics.clone()).unwrap();
        engine.train(&trend(8)).unwrap();

        let ok = || metrics.predictions_total.with_label_values(&["ok"]).get();
        engine.predict_progressive(&trend(6));
        assert_eq!(ok(), 0.0);

        engine.predict(&trend(6));
        assert_eq!(ok(), 1.0);
    }

    #[test]
    fn test_restores_from_preloaded_store() {
        let mut trained = engine_with(Arc::new(InMemoryModelStore::new()));
        trained.train(&trend(8)).unwrap();

        let engine = engine_with(Arc::new(InMemoryModelStore::with_state(trained.model_state())));
        assert!(engine.is_trained());
        assert_eq!(engine.predict(&trend(3)), trained.predict(&trend(3)));

        let mut broken = trained.model_state();
        broken.layers.pop();
        let engine = engine_with(Arc::new(InMemoryModelStore::with_state(broken)));
        assert!(!engine.is_trained());
    }
}
