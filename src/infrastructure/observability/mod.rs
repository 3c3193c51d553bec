//! Metrics for the forecasting engine
//!
//! Counters and gauges are kept in-process and rendered in Prometheus text
//! format on demand; nothing here opens a socket.

pub mod metrics;

pub use metrics::Metrics;
