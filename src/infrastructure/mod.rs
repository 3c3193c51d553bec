pub mod csv_source;
pub mod mock;
pub mod model_persistence;
pub mod observability;

pub use csv_source::CsvSeriesSource;
pub use mock::{InMemoryModelStore, StaticSeriesSource};
pub use model_persistence::JsonModelStore;
