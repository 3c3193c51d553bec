// Configuration value objects
pub mod config;

// Domain-specific error types
pub mod errors;

// Network, training and persisted model document
pub mod ml;

// Port interfaces
pub mod ports;

// Normalization and window construction
pub mod series;
