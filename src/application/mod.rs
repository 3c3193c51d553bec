// Incrementally trained predictor
pub mod ml;

// Request handler composing source, engine and response
pub mod forecast_service;
