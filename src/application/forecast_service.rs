//! Request handler for "get current prediction".
//!
//! Each request reloads the full series, gives the engine a chance to train
//! on new data, and forecasts from the most recent values. Failures never
//! escape: they are folded into the response next to safe defaults.

use crate::application::ml::predictor_engine::{PredictorEngine, TrainOutcome};
use crate::domain::ports::SeriesSource;
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, error, info};

/// Number of trailing values returned and used for forecasting
pub const DEFAULT_DISPLAY_WINDOW: usize = 15;

/// A series must be longer than this before training is attempted
pub const DEFAULT_MIN_TRAINING_LENGTH: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastResponse {
    pub last_values: Vec<f64>,
    /// Next-value forecast, 0 when none is available
    pub prediction: f64,
    /// One forecast per prefix of `last_values`, 0 where none is available
    pub predictions: Vec<f64>,
    pub trained: bool,
    pub last_data_length: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ForecastResponse {
    fn failed(engine: &PredictorEngine, message: String) -> Self {
        Self {
            last_values: Vec::new(),
            prediction: 0.0,
            predictions: Vec::new(),
            trained: engine.is_trained(),
            last_data_length: engine.last_data_length(),
            error: Some(message),
        }
    }
}

pub struct ForecastService {
    engine: Mutex<PredictorEngine>,
    source: Arc<dyn SeriesSource>,
    display_window: usize,
    min_training_length: usize,
}

impl ForecastService {
    pub fn new(engine: PredictorEngine, source: Arc<dyn SeriesSource>) -> Self {
        Self {
            engine: Mutex::new(engine),
            source,
            display_window: DEFAULT_DISPLAY_WINDOW,
            min_training_length: DEFAULT_MIN_TRAINING_LENGTH,
        }
    }

    pub fn with_display_window(mut self, display_window: usize) -> Self {
        self.display_window = display_window;
        self
    }

    pub fn with_min_training_length(mut self, min_training_length: usize) -> Self {
        self.min_training_length = min_training_length;
        self
    }

    fn lock_engine(&self) -> MutexGuard<'_, PredictorEngine> {
        // The engine commits state only after a successful save, so a
        // poisoned guard still holds a consistent engine.
        match self.engine.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                error!("ForecastService: engine lock poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    /// Loads the series from the source and forecasts from it.
    pub fn get_prediction(&self) -> ForecastResponse {
        match self.source.load_series() {
            Ok(values) => self.forecast(&values),
            Err(e) => {
                error!(
                    "Failed to load series from {}: {:#}",
                    self.source.describe(),
                    e
                );
                ForecastResponse::failed(&self.lock_engine(), format!("{:#}", e))
            }
        }
    }

    /// Trains on `values` when warranted, then forecasts from its tail.
    ///
    /// The forecast always sees at least one full network window, even when
    /// the displayed tail is shorter.
    pub fn forecast(&self, values: &[f64]) -> ForecastResponse {
        let mut engine = self.lock_engine();

        let context_len = self.display_window.max(engine.window_size());
        let context = &values[values.len().saturating_sub(context_len)..];
        let shown = context.len().min(self.display_window);
        let hidden = context.len() - shown;
        let last_values = context[hidden..].to_vec();

        let mut error = None;

        if values.len() > self.min_training_length {
            match engine.train(values) {
                Ok(TrainOutcome::Trained(report)) => {
                    info!(
                        "Model refreshed on {} values ({} iterations)",
                        values.len(),
                        report.iterations
                    );
                }
                Ok(TrainOutcome::Skipped(reason)) => {
                    debug!("Training skipped: {:?}", reason);
                }
                Err(e) => {
                    error!("Training failed: {}", e);
                    error = Some(e.to_string());
                }
            }
        }

        let prediction = engine.predict(context).unwrap_or(0.0);
        let predictions = engine
            .predict_progressive(context)
            .into_iter()
            .skip(hidden)
            .map(|p| p.unwrap_or(0.0))
            .collect();

        ForecastResponse {
            last_values,
            prediction,
            predictions,
            trained: engine.is_trained(),
            last_data_length: engine.last_data_length(),
            error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::config::NetworkConfig;
    use crate::infrastructure::mock::{InMemoryModelStore, StaticSeriesSource};
    use anyhow::anyhow;

    struct BrokenSource;

    impl SeriesSource for BrokenSource {
        fn load_series(&self) -> anyhow::Result<Vec<f64>> {
            Err(anyhow!("file vanished"))
        }

        fn describe(&self) -> String {
            "broken".to_string()
        }
    }

    fn engine() -> PredictorEngine {
        PredictorEngine::new(
            NetworkConfig {
                seed: Some(3),
                ..NetworkConfig::default()
            },
            Arc::new(InMemoryModelStore::new()),
        )
        .unwrap()
    }

    #[test]
    fn test_short_series_returns_defaults() {
        let service = ForecastService::new(engine(), Arc::new(StaticSeriesSource::new(vec![])));
        let response = service.forecast(&[10.0, 20.0, 30.0]);

        assert_eq!(response.last_values, vec![10.0, 20.0, 30.0]);
        assert_eq!(response.prediction, 0.0);
        assert_eq!(response.predictions, vec![0.0, 0.0, 0.0]);
        assert!(!response.trained);
        assert!(response.error.is_none());
    }

    #[test]
    fn test_last_values_are_capped_to_display_window() {
        let service = ForecastService::new(engine(), Arc::new(StaticSeriesSource::new(vec![])))
            .with_display_window(4);
        let values: Vec<f64> = (1..=10).map(|i| i as f64).collect();

        let response = service.forecast(&values);
        assert_eq!(response.last_values, vec![7.0, 8.0, 9.0, 10.0]);
        assert_eq!(response.predictions.len(), 4);
        assert_eq!(response.last_data_length, 10);
    }

    #[test]
    fn test_source_failure_is_reported_in_response() {
        let service = ForecastService::new(engine(), Arc::new(BrokenSource));
        let response = service.get_prediction();

        assert_eq!(response.error.as_deref(), Some("file vanished"));
        assert!(response.last_values.is_empty());
        assert_eq!(response.prediction, 0.0);
        assert!(!response.trained);
    }

    #[test]
    fn test_source_failure_keeps_engine_state_in_response() {
        let mut trained = engine();
        trained.train(&[10.0, 20.0, 30.0, 40.0, 50.0, 60.0, 70.0, 80.0]).unwrap();

        let service = ForecastService::new(trained, Arc::new(BrokenSource));
        let response = service.get_prediction();

        assert!(response.error.is_some());
        assert!(response.trained);
        assert_eq!(response.last_data_length, 8);
        assert_eq!(response.prediction, 0.0);
    }

    #[test]
    fn test_display_window_below_network_window_still_forecasts() {
        let values = [10.0, 20.0, 30.0, 40.0, 50.0, 60.0, 70.0, 80.0];
        let full = ForecastService::new(engine(), Arc::new(StaticSeriesSource::new(vec![])))
            .forecast(&values);
        let narrow = ForecastService::new(engine(), Arc::new(StaticSeriesSource::new(vec![])))
            .with_display_window(2)
            .forecast(&values);

        assert!(narrow.trained);
        assert!(narrow.error.is_none());
        assert_eq!(narrow.last_values, vec![70.0, 80.0]);
        assert_ne!(narrow.prediction, 0.0);
        assert_eq!(narrow.prediction, full.prediction);
        assert_eq!(narrow.predictions.len(), 2);
        assert_eq!(narrow.predictions[1], narrow.prediction);

        let hidden = ForecastService::new(engine(), Arc::new(StaticSeriesSource::new(vec![])))
            .with_display_window(0)
            .forecast(&values);
        assert!(hidden.last_values.is_empty());
        assert!(hidden.predictions.is_empty());
        assert_eq!(hidden.prediction, full.prediction);
    }

    #[test]
    fn test_response_serialization() {
        let service = ForecastService::new(engine(), Arc::new(StaticSeriesSource::new(vec![])));
        let json = serde_json::to_value(service.forecast(&[1.0, 2.0])).unwrap();

        assert_eq!(json["prediction"], 0.0);
        assert_eq!(json["last_values"], serde_json::json!([1.0, 2.0]));
        assert!(json.get("error").is_none());
    }
}
