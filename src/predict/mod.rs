//! Prediction
//!
//! Causal history, predictor calls, denormalization and the wager decision.

pub mod orchestrator;
pub mod predictor;
pub mod wager;

pub use orchestrator::{
    build_data_set_until, build_full_data_set, causal_history, round_after, PredictedScore, Tip,
    Tipper,
};
pub use predictor::{NetworkPredictor, Predictor};
pub use wager::WagerRule;
