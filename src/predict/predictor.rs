//! Fixed-arity score predictors

use burn::tensor::backend::Backend;
use burn::tensor::Tensor;
use std::sync::Mutex;

use crate::model::{TipperNet, TipperNetConfig};
use crate::{Result, TipperError};

/// Vector-to-vector inference with fixed input and output widths
pub trait Predictor: Send + Sync {
    fn input_dim(&self) -> usize;

    fn output_dim(&self) -> usize;

    /// Run inference on one input vector.
    ///
    /// Fails with [`TipperError::ArityMismatch`] when `inputs` has the wrong width.
    fn predict(&self, inputs: &[f64]) -> Result<Vec<f64>>;
}

/// Fail unless `actual` equals `expected`
pub fn check_arity(what: &'static str, expected: usize, actual: usize) -> Result<()> {
    if expected != actual {
        return Err(TipperError::ArityMismatch {
            what,
            expected,
            actual,
        });
    }
    Ok(())
}

/// [`Predictor`] backed by a [`TipperNet`]
pub struct NetworkPredictor<B: Backend> {
    model: Mutex<TipperNet<B>>,
    config: TipperNetConfig,
    device: B::Device,
}

impl<B: Backend> NetworkPredictor<B> {
    pub fn new(model: TipperNet<B>, config: TipperNetConfig, device: B::Device) -> Self {
        NetworkPredictor {
            model: Mutex::new(model),
            config,
            device,
        }
    }

    /// Load a network saved by the trainer: weights at `model_path`, shape in its sidecar
    pub fn load(model_path: &str, device: B::Device) -> Result<Self> {
        let sidecar = TipperNetConfig::sidecar_path(model_path);
        if !std::path::Path::new(&sidecar).exists() {
            return Err(TipperError::NoModel);
        }
        let config = TipperNetConfig::load(&sidecar)?;
        let model = TipperNet::load(&device, model_path, &config)?;
        log::info!(
            "Loaded model from {} ({} inputs, hidden {:?})",
            model_path,
            config.input_dim,
            config.hidden_dims
        );
        Ok(Self::new(model, config, device))
    }

    pub fn config(&self) -> &TipperNetConfig {
        &self.config
    }
}

impl<B: Backend> Predictor for NetworkPredictor<B> {
    fn input_dim(&self) -> usize {
        self.config.input_dim
    }

    fn output_dim(&self) -> usize {
        self.config.output_dim
    }

    fn predict(&self, inputs: &[f64]) -> Result<Vec<f64>> {
        check_arity("predictor inputs", self.config.input_dim, inputs.len())?;

        let data: Vec<f32> = inputs.iter().map(|v| *v as f32).collect();
        let tensor = Tensor::<B, 1>::from_floats(data.as_slice(), &self.device)
            .reshape([1, self.config.input_dim]);

        let output = {
            let model = self
                .model
                .lock()
                .map_err(|_| TipperError::Predictor("model lock poisoned".to_string()))?;
            model.forward(tensor)
        };

        let values = output
            .into_data()
            .to_vec::<f32>()
            .map_err(|e| TipperError::Predictor(format!("{:?}", e)))?;
        check_arity("predictor outputs", self.config.output_dim, values.len())?;

        Ok(values.into_iter().map(f64::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray<f32>;

    fn predictor(input_dim: usize) -> NetworkPredictor<TestBackend> {
        let device = Default::default();
        let config = TipperNetConfig::new(input_dim, vec![5]);
        let model = TipperNet::new(&device, &config);
        NetworkPredictor::new(model, config, device)
    }

    #[test]
    fn test_predict_arity() {
        let p = predictor(18);
        assert_eq!(p.input_dim(), 18);
        assert_eq!(p.output_dim(), 4);

        let outputs = p.predict(&[0.5; 18]).unwrap();
        assert_eq!(outputs.len(), 4);
        assert!(outputs.iter().all(|v| (0.0..=1.0).contains(v)));
    }

    #[test]
    fn test_wrong_width_is_rejected() {
        let p = predictor(18);
        assert!(matches!(
            p.predict(&[0.5; 17]),
            Err(TipperError::ArityMismatch {
                expected: 18,
                actual: 17,
                ..
            })
        ));
    }

    #[test]
    fn test_load_without_model() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing");
        let result =
            NetworkPredictor::<TestBackend>::load(path.to_str().unwrap(), Default::default());
        assert!(matches!(result, Err(TipperError::NoModel)));
    }

    #[test]
    fn test_load_saved_model() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tipper_model");
        let path = path.to_str().unwrap();

        let device = Default::default();
        let config = TipperNetConfig::new(6, vec![3]);
        TipperNet::<TestBackend>::new(&device, &config).save(path).unwrap();
        config.save(TipperNetConfig::sidecar_path(path)).unwrap();

        let p = NetworkPredictor::<TestBackend>::load(path, device).unwrap();
        assert_eq!(p.config(), &config);
        assert_eq!(p.predict(&[0.1; 6]).unwrap().len(), 4);
    }
}
