//! Prometheus metrics definitions for trendcast
//!
//! All metrics use the `trendcast_` prefix and live in a private registry.

use prometheus::{
    CounterVec, Gauge, Histogram, HistogramOpts, IntGauge, Opts, Registry, TextEncoder,
};
use std::sync::Arc;

/// Prometheus metrics for the forecasting engine
#[derive(Clone)]
pub struct Metrics {
    registry: Arc<Registry>,
    /// Training calls by outcome
    pub training_runs_total: CounterVec,
    /// Iterations used by the last completed training pass
    pub training_iterations: IntGauge,
    /// Mean squared error reached by the last completed training pass
    pub training_error: Gauge,
    /// Wall time of completed training passes
    pub training_duration_seconds: Histogram,
    /// Series length incorporated into the current weights
    pub last_data_length: IntGauge,
    /// Prediction calls by result
    pub predictions_total: CounterVec,
}

impl Metrics {
    /// Create a new Metrics instance with all gauges and counters registered
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let training_runs_total = CounterVec::new(
            Opts::new("trendcast_training_runs_total", "Training calls by outcome"),
            &["outcome"],
        )?;
        registry.register(Box::new(training_runs_total.clone()))?;

        let training_iterations = IntGauge::with_opts(Opts::new(
            "trendcast_training_iterations",
            "Iterations used by the last training pass",
        ))?;
        registry.register(Box::new(training_iterations.clone()))?;

        let training_error = Gauge::with_opts(Opts::new(
            "trendcast_training_error",
            "Mean squared error after the last training pass",
        ))?;
        registry.register(Box::new(training_error.clone()))?;

        let training_duration_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "trendcast_training_duration_seconds",
                "Training pass duration in seconds",
            )
            .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 10.0]),
        )?;
        registry.register(Box::new(training_duration_seconds.clone()))?;

        let last_data_length = IntGauge::with_opts(Opts::new(
            "trendcast_last_data_length",
            "Series length incorporated into the current model",
        ))?;
        registry.register(Box::new(last_data_length.clone()))?;

        let predictions_total = CounterVec::new(
            Opts::new("trendcast_predictions_total", "Prediction calls by result"),
            &["result"],
        )?;
        registry.register(Box::new(predictions_total.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            training_runs_total,
            training_iterations,
            training_error,
            training_duration_seconds,
            last_data_length,
            predictions_total,
        })
    }

    /// Render all metrics in Prometheus text format
    pub fn render(&self) -> String {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        encoder
            .encode_to_string(&metric_families)
            .unwrap_or_default()
    }

    /// Increment training counter
    pub fn inc_training(&self, outcome: &str) {
        self.training_runs_total.with_label_values(&[outcome]).inc();
    }

    /// Increment prediction counter
    pub fn inc_predictions(&self, result: &str) {
        self.predictions_total.with_label_values(&[result]).inc();
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new().expect("Failed to create default Metrics")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_creation() {
        let metrics = Metrics::new().expect("Failed to create metrics");
        metrics.inc_training("trained");
        assert!(metrics.render().contains("trendcast_"));
    }

    #[test]
    fn test_training_counter_by_outcome() {
        let metrics = Metrics::new().expect("Failed to create metrics");
        metrics.inc_training("trained");
        metrics.inc_training("no_new_data");
        metrics.inc_training("no_new_data");

        let output = metrics.render();
        assert!(output.contains("trendcast_training_runs_total{outcome=\"trained\"} 1"));
        assert!(output.contains("trendcast_training_runs_total{outcome=\"no_new_data\"} 2"));
    }

    #[test]
    fn test_gauges_render() {
        let metrics = Metrics::new().expect("Failed to create metrics");
        metrics.last_data_length.set(8);
        metrics.training_iterations.set(250);

        let output = metrics.render();
        assert!(output.contains("trendcast_last_data_length 8"));
        assert!(output.contains("trendcast_training_iterations 250"));
    }
}
