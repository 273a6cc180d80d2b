//! Model training
//!
//! Training loop, loss and metrics tracking.

pub mod metrics;
pub mod trainer;

pub use metrics::{Metrics, TrainingHistory};
pub use trainer::{train_network, NetworkTrainer};
