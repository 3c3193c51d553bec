//! Configuration domain module
//!
//! Validated value objects built from the environment-level configuration.

pub mod network_config;

pub use network_config::{NetworkConfig, NetworkConfigError};
