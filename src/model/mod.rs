//! Neural network used as the score predictor

pub mod mlp;

pub use mlp::{TipperNet, TipperNetConfig};
