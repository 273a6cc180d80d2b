//! Feed-forward score network
//!
//! Architecture: Input(scheme length) → [Linear → Sigmoid]* → Linear → Sigmoid(4)
//!
//! Outputs are normalized goals/behinds for home and away, so every layer
//! including the last is squashed into [0, 1].

use burn::module::Module;
use burn::nn::{Linear, LinearConfig};
use burn::record::{FullPrecisionSettings, Recorder};
use burn::tensor::activation::sigmoid;
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::features::scheme::OUTPUT_DIM;
use crate::{Result, TipperError};

/// Configuration for the network
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TipperNetConfig {
    /// Input dimension (interpretation scheme length)
    pub input_dim: usize,
    /// Hidden layer widths, e.g. [5] for one layer of five
    pub hidden_dims: Vec<usize>,
    pub output_dim: usize,
}

impl TipperNetConfig {
    pub fn new(input_dim: usize, hidden_dims: Vec<usize>) -> Self {
        TipperNetConfig {
            input_dim,
            hidden_dims,
            output_dim: OUTPUT_DIM,
        }
    }

    /// Sidecar file describing the network stored at `model_path`
    pub fn sidecar_path(model_path: &str) -> String {
        format!("{}.json", model_path)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

/// Multi-layer perceptron with sigmoid activations
#[derive(Module, Debug)]
pub struct TipperNet<B: Backend> {
    hidden: Vec<Linear<B>>,
    output: Linear<B>,
}

impl<B: Backend> TipperNet<B> {
    pub fn new(device: &B::Device, config: &TipperNetConfig) -> Self {
        let mut hidden = Vec::with_capacity(config.hidden_dims.len());
        let mut in_dim = config.input_dim;
        for &width in &config.hidden_dims {
            hidden.push(LinearConfig::new(in_dim, width).init(device));
            in_dim = width;
        }

        TipperNet {
            hidden,
            output: LinearConfig::new(in_dim, config.output_dim).init(device),
        }
    }

    /// Forward pass: [batch, input_dim] → [batch, output_dim]
    pub fn forward(&self, inputs: Tensor<B, 2>) -> Tensor<B, 2> {
        let mut x = inputs;
        for layer in &self.hidden {
            x = sigmoid(layer.forward(x));
        }
        sigmoid(self.output.forward(x))
    }

    /// Save weights to `path` (the recorder appends its own extension)
    pub fn save(&self, path: &str) -> Result<()> {
        if let Some(parent) = Path::new(path).parent() {
            std::fs::create_dir_all(parent)?;
        }
        let recorder = burn::record::NamedMpkFileRecorder::<FullPrecisionSettings>::new();
        recorder
            .record(self.clone().into_record(), path.into())
            .map_err(|e| TipperError::Predictor(format!("Failed to save model: {}", e)))
    }

    /// Load weights saved by [`TipperNet::save`]
    pub fn load(device: &B::Device, path: &str, config: &TipperNetConfig) -> Result<Self> {
        let recorder = burn::record::NamedMpkFileRecorder::<FullPrecisionSettings>::new();
        let record = recorder
            .load(path.into(), device)
            .map_err(|e| TipperError::Predictor(format!("Failed to load model: {}", e)))?;

        Ok(Self::new(device, config).load_record(record))
    }
}
