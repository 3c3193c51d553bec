pub mod model_state;
pub mod network;
pub mod training;

pub use model_state::{Activation, LayerState, ModelState, TrainingSummary};
pub use network::FeedForwardNetwork;
pub use training::{TrainingOptions, TrainingReport};
