use crate::domain::errors::ModelStoreError;
use crate::domain::ml::ModelState;
use anyhow::Result;

/// Durable home of the trained network.
pub trait ModelStore: Send + Sync {
    /// Reads the persisted document.
    ///
    /// An absent or unreadable document is not an error: implementations
    /// log it and return `None`, and the caller starts untrained.
    fn load(&self) -> Option<ModelState>;

    /// Replaces the persisted document with `state`.
    fn save(&self, state: &ModelState) -> Result<(), ModelStoreError>;
}

/// Supplies the full historical series on every request.
pub trait SeriesSource: Send + Sync {
    fn load_series(&self) -> Result<Vec<f64>>;

    /// Human-readable origin, used in logs
    fn describe(&self) -> String;
}
