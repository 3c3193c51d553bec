//! trendcast - next-value forecaster for a single CSV column
//!
//! Each poll reloads the CSV, refines the persisted network when the series
//! grew, and prints the forecast as one JSON line on stdout. Logs go to
//! stderr.
//!
//! # Usage
//! ```sh
//! trendcast --data data.csv --model model.json
//! trendcast --watch 30 --print-metrics
//! ```
//!
//! Every flag falls back to its `TRENDCAST_*` environment variable.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{Level, error, info};
use tracing_subscriber::prelude::*;
use trendcast::application::forecast_service::ForecastService;
use trendcast::application::ml::predictor_engine::PredictorEngine;
use trendcast::config::Config;
use trendcast::infrastructure::csv_source::CsvSeriesSource;
use trendcast::infrastructure::model_persistence::JsonModelStore;
use trendcast::infrastructure::observability::Metrics;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the CSV file holding the series
    #[arg(long)]
    data: Option<PathBuf>,

    /// Name of the CSV column holding the values
    #[arg(long)]
    column: Option<String>,

    /// Path to the persisted model document
    #[arg(long)]
    model: Option<PathBuf>,

    /// Poll every N seconds instead of running once
    #[arg(long)]
    watch: Option<u64>,

    /// Print Prometheus metrics to stderr after each poll
    #[arg(long)]
    print_metrics: bool,
}

fn poll(service: &ForecastService) -> Result<()> {
    let response = service.get_prediction();
    println!("{}", serde_json::to_string(&response)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(stderr_layer)
        .init();

    let args = Args::parse();

    let mut config = Config::from_env()?;
    if let Some(data) = args.data {
        config.data_path = data;
    }
    if let Some(column) = args.column {
        config.value_column = column;
    }
    if let Some(model) = args.model {
        config.model_path = model;
    }
    if let Some(watch) = args.watch {
        config.poll_interval_secs = watch;
    }

    info!("trendcast {} starting...", env!("CARGO_PKG_VERSION"));
    let metrics = Metrics::new().context("Failed to create metrics")?;
    let store = Arc::new(JsonModelStore::new(&config.model_path));
    let source = Arc::new(CsvSeriesSource::new(&config.data_path, &config.value_column));
    info!(
        "Data: {:?} (column '{}'), model: {:?}, layers: {:?}",
        config.data_path,
        config.value_column,
        store.path(),
        config.network.layer_sizes()
    );

    let engine = PredictorEngine::with_metrics(config.network.clone(), store, metrics.clone())
        .context("Invalid network configuration")?;

    let service = Arc::new(
        ForecastService::new(engine, source)
            .with_display_window(config.display_window)
            .with_min_training_length(config.min_training_length),
    );

    let print_metrics = args.print_metrics && config.observability_enabled;
    let run_once = {
        let service = service.clone();
        let metrics = metrics.clone();
        move || -> Result<()> {
            poll(&service)?;
            if print_metrics {
                eprintln!("{}", metrics.render());
            }
            Ok(())
        }
    };

    if config.poll_interval_secs == 0 {
        return tokio::task::spawn_blocking(run_once).await?;
    }

    // Training can take a while; keep it off the async workers.
    let run_once = Arc::new(run_once);
    let mut interval = tokio::time::interval(Duration::from_secs(config.poll_interval_secs));
    info!(
        "Polling every {}s. Press Ctrl+C to stop.",
        config.poll_interval_secs
    );

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let run_once = run_once.clone();
                match tokio::task::spawn_blocking(move || run_once()).await {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => error!("Poll failed: {:#}", e),
                    Err(e) => error!("Poll task panicked: {}", e),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received. Exiting...");
                break;
            }
        }
    }

    Ok(())
}
