//! Training loop for the score network
//!
//! Plain SGD on mean squared error over shuffled mini-batches. The best epoch
//! by validation loss is kept.

use burn::module::AutodiffModule;
use burn::optim::adaptor::OptimizerAdaptor;
use burn::optim::{GradientsParams, Optimizer, Sgd, SgdConfig};
use burn::tensor::backend::AutodiffBackend;
use burn::tensor::{ElementConversion, Tensor};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::data::{DataBatch, DataPoint, DataSet};
use crate::model::{TipperNet, TipperNetConfig};
use crate::training::metrics::{Metrics, TrainingHistory};
use crate::{Result, TipperError, TrainingConfig};

/// Log a progress line every this many epochs
const LOG_EVERY: usize = 50;

fn mse_loss<B: AutodiffBackend>(predictions: Tensor<B, 2>, targets: Tensor<B, 2>) -> Tensor<B, 1> {
    (predictions - targets).powf_scalar(2.0).mean()
}

fn to_vec<B: AutodiffBackend>(tensor: Tensor<B, 2>) -> Vec<f32> {
    tensor.into_data().to_vec::<f32>().unwrap_or_default()
}

/// Trainer for [`TipperNet`]
pub struct NetworkTrainer<B: AutodiffBackend> {
    model: TipperNet<B>,
    optimizer: OptimizerAdaptor<Sgd<B::InnerBackend>, TipperNet<B>, B>,
    net_config: TipperNetConfig,
    learning_rate: f64,
    batch_size: usize,
    seed: u64,
    device: B::Device,
}

impl<B: AutodiffBackend> NetworkTrainer<B> {
    /// Create a trainer around a freshly initialized network
    pub fn new(net_config: TipperNetConfig, training: &TrainingConfig, device: B::Device) -> Self {
        let model = TipperNet::new(&device, &net_config);

        NetworkTrainer {
            model,
            optimizer: SgdConfig::new().init(),
            net_config,
            learning_rate: training.learning_rate,
            batch_size: training.batch_size,
            seed: training.seed,
            device,
        }
    }

    pub fn net_config(&self) -> &TipperNetConfig {
        &self.net_config
    }

    /// Train for `epochs`, returning the best model (as an inference model) and the history.
    ///
    /// With an empty validation set the training loss picks the best epoch.
    pub fn train(
        mut self,
        train: &DataSet,
        val: &DataSet,
        epochs: usize,
    ) -> Result<(TipperNet<B::InnerBackend>, TrainingHistory)> {
        if train.is_empty() {
            return Err(TipperError::Corpus("no training data".to_string()));
        }
        train.check_arity(self.net_config.input_dim, self.net_config.output_dim)?;
        val.check_arity(self.net_config.input_dim, self.net_config.output_dim)?;

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut order: Vec<usize> = (0..train.len()).collect();
        let batch_size = if self.batch_size == 0 {
            train.len()
        } else {
            self.batch_size.min(train.len())
        };

        let mut history = TrainingHistory::new();
        let mut best_model = self.model.valid();

        log::info!(
            "Starting training for {} epochs ({} train, {} val, batch {})",
            epochs,
            train.len(),
            val.len(),
            batch_size
        );

        for epoch in 0..epochs {
            order.shuffle(&mut rng);
            let train_metrics = self.train_epoch(&train.points, &order, batch_size);
            let val_metrics = if val.is_empty() {
                train_metrics.clone()
            } else {
                self.evaluate(&val.points)
            };

            if history.record_epoch(epoch, &train_metrics, &val_metrics) {
                best_model = self.model.valid();
            }

            log::debug!(
                "Epoch {}/{}: Train: {} | Val: {}",
                epoch + 1,
                epochs,
                train_metrics,
                val_metrics
            );
            if epoch % LOG_EVERY == 0 || epoch + 1 == epochs {
                log::info!(
                    "Epoch {}/{}: Train: {} | Val: {}",
                    epoch + 1,
                    epochs,
                    train_metrics,
                    val_metrics
                );
            }
        }

        log::info!(
            "Best epoch {} (val loss {:.5})",
            history.best_epoch + 1,
            history.best_val_loss
        );
        Ok((best_model, history))
    }

    /// One pass over the training points in the given order
    fn train_epoch(&mut self, points: &[DataPoint], order: &[usize], batch_size: usize) -> Metrics {
        let mut metrics = Metrics::new();

        for chunk in order.chunks(batch_size) {
            let batch_points: Vec<&DataPoint> = chunk.iter().map(|&i| &points[i]).collect();
            let batch = DataBatch::<B>::from_points(&batch_points, &self.device);

            let predictions = self.model.forward(batch.inputs);
            let loss = mse_loss(predictions.clone(), batch.targets.clone());
            let loss_val: f32 = loss.clone().into_scalar().elem();

            let grads = loss.backward();
            let grads = GradientsParams::from_grads(grads, &self.model);
            self.model = self.optimizer.step(self.learning_rate, self.model.clone(), grads);

            metrics.update(loss_val, &to_vec(predictions), &to_vec(batch.targets));
        }

        metrics
    }

    /// Full-batch loss and metrics without updating weights
    fn evaluate(&self, points: &[DataPoint]) -> Metrics {
        let mut metrics = Metrics::new();
        let refs: Vec<&DataPoint> = points.iter().collect();
        let batch = DataBatch::<B>::from_points(&refs, &self.device);

        let predictions = self.model.forward(batch.inputs);
        let loss: f32 = mse_loss(predictions.clone(), batch.targets.clone())
            .into_scalar()
            .elem();
        metrics.update(loss, &to_vec(predictions), &to_vec(batch.targets));

        metrics
    }
}

/// Split chronologically and train a network sized to the data set
pub fn train_network<B: AutodiffBackend>(
    data: DataSet,
    hidden_dims: Vec<usize>,
    training: &TrainingConfig,
    device: B::Device,
) -> Result<(TipperNet<B::InnerBackend>, TipperNetConfig, TrainingHistory)> {
    let input_dim = data
        .input_dim()
        .ok_or_else(|| TipperError::Corpus("no training data".to_string()))?;
    let net_config = TipperNetConfig::new(input_dim, hidden_dims);

    let (train, val) = data.split(1.0 - training.validation_split);
    let trainer = NetworkTrainer::<B>::new(net_config.clone(), training, device);
    let (model, history) = trainer.train(&train, &val, training.epochs)?;

    Ok((model, net_config, history))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MatchReference, TeamId};
    use burn::backend::{Autodiff, NdArray};
    use chrono::NaiveDate;

    type TestBackend = Autodiff<NdArray<f32>>;

    fn data_set(n: usize, input_dim: usize) -> DataSet {
        let points = (0..n)
            .map(|i| {
                let x = (i % 10) as f64 / 10.0;
                DataPoint {
                    inputs: vec![x; input_dim],
                    outputs: vec![0.3 + 0.2 * x, 0.25, 0.3 - 0.1 * x, 0.25],
                    reference: MatchReference {
                        date: NaiveDate::from_ymd_opt(2015, 1, 1)
                            .unwrap()
                            .and_hms_opt(0, 0, 0)
                            .unwrap()
                            + chrono::Duration::days(i as i64),
                        home_team: TeamId(1),
                        away_team: TeamId(2),
                    },
                }
            })
            .collect();
        DataSet::new("test", points)
    }

    fn training(epochs: usize) -> TrainingConfig {
        TrainingConfig {
            epochs,
            learning_rate: 0.5,
            batch_size: 8,
            validation_split: 0.2,
            seed: 7,
        }
    }

    #[test]
    fn test_train_records_history() {
        let device = Default::default();
        let (model, config, history) =
            train_network::<TestBackend>(data_set(40, 3), vec![5], &training(20), device).unwrap();

        assert_eq!(config.input_dim, 3);
        assert_eq!(history.epochs(), 20);
        assert!(history.best_epoch < 20);
        assert!(history.train_losses.iter().all(|l| l.is_finite()));
        assert!(history.best_val_loss.is_finite());

        let device = Default::default();
        let out = model.forward(Tensor::zeros([1, 3], &device));
        assert_eq!(out.dims(), [1, 4]);
    }

    #[test]
    fn test_training_reduces_loss() {
        let device = Default::default();
        let (_, _, history) =
            train_network::<TestBackend>(data_set(60, 2), vec![4], &training(150), device).unwrap();

        let first = history.train_losses[0];
        let last = *history.train_losses.last().unwrap();
        assert!(last < first, "loss went from {} to {}", first, last);
    }

    #[test]
    fn test_arity_mismatch() {
        let device = Default::default();
        let trainer = NetworkTrainer::<TestBackend>::new(
            TipperNetConfig::new(5, vec![3]),
            &training(1),
            device,
        );
        let data = data_set(10, 4);
        assert!(matches!(
            trainer.train(&data, &DataSet::default(), 1),
            Err(TipperError::ArityMismatch { .. })
        ));
    }

    #[test]
    fn test_single_point_still_trains() {
        let device = Default::default();
        let (_, _, history) =
            train_network::<TestBackend>(data_set(1, 3), vec![2], &training(3), device).unwrap();
        assert_eq!(history.epochs(), 3);
    }

    #[test]
    fn test_empty_data() {
        let device = Default::default();
        let result =
            train_network::<TestBackend>(DataSet::default(), vec![5], &training(1), device);
        assert!(matches!(result, Err(TipperError::Corpus(_))));
    }
}
