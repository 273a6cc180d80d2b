//! Data points and data sets for offline training
//!
//! A data point is the (inputs, outputs, reference) triple built for one match.

use burn::tensor::backend::Backend;
use burn::tensor::Tensor;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::{MatchReference, Result, TipperError};

/// Feature vector, target vector and the match they describe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataPoint {
    pub inputs: Vec<f64>,
    pub outputs: Vec<f64>,
    pub reference: MatchReference,
}

/// Ordered collection of data points sharing one scheme
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DataSet {
    /// Scheme the inputs were built with
    pub scheme: String,
    pub points: Vec<DataPoint>,
}

impl DataSet {
    pub fn new(scheme: impl Into<String>, points: Vec<DataPoint>) -> Self {
        DataSet {
            scheme: scheme.into(),
            points,
        }
    }

    /// Get the number of samples
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Check if data set is empty
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn input_dim(&self) -> Option<usize> {
        self.points.first().map(|p| p.inputs.len())
    }

    pub fn output_dim(&self) -> Option<usize> {
        self.points.first().map(|p| p.outputs.len())
    }

    /// Fail unless every point has the given input and output widths
    pub fn check_arity(&self, inputs: usize, outputs: usize) -> Result<()> {
        for point in &self.points {
            if point.inputs.len() != inputs {
                return Err(TipperError::ArityMismatch {
                    what: "data point inputs",
                    expected: inputs,
                    actual: point.inputs.len(),
                });
            }
            if point.outputs.len() != outputs {
                return Err(TipperError::ArityMismatch {
                    what: "data point outputs",
                    expected: outputs,
                    actual: point.outputs.len(),
                });
            }
        }
        Ok(())
    }

    /// Split chronologically: the first `train_ratio` of points train, the rest validate.
    ///
    /// A non-empty set always keeps at least one training point.
    pub fn split(self, train_ratio: f32) -> (Self, Self) {
        let len = self.points.len();
        let split_idx = ((len as f32 * train_ratio) as usize).clamp(len.min(1), len);
        let mut points = self.points;
        let val_points = points.split_off(split_idx);

        (
            DataSet {
                scheme: self.scheme.clone(),
                points,
            },
            DataSet {
                scheme: self.scheme,
                points: val_points,
            },
        )
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
        std::fs::write(path, serde_json::to_string(self)?)?;
        Ok(())
    }
}

/// Batch of data points as tensors
#[derive(Debug, Clone)]
pub struct DataBatch<B: Backend> {
    /// Inputs: [batch, input_dim]
    pub inputs: Tensor<B, 2>,
    /// Targets: [batch, output_dim]
    pub targets: Tensor<B, 2>,
}

impl<B: Backend> DataBatch<B> {
    /// Stack points into tensors; all points must share the same widths
    pub fn from_points(points: &[&DataPoint], device: &B::Device) -> Self {
        let batch_size = points.len();
        let input_dim = points.first().map(|p| p.inputs.len()).unwrap_or(0);
        let output_dim = points.first().map(|p| p.outputs.len()).unwrap_or(0);

        let mut input_data = Vec::with_capacity(batch_size * input_dim);
        let mut target_data = Vec::with_capacity(batch_size * output_dim);
        for point in points {
            input_data.extend(point.inputs.iter().map(|v| *v as f32));
            target_data.extend(point.outputs.iter().map(|v| *v as f32));
        }

        let inputs = Tensor::<B, 1>::from_floats(input_data.as_slice(), device)
            .reshape([batch_size, input_dim]);
        let targets = Tensor::<B, 1>::from_floats(target_data.as_slice(), device)
            .reshape([batch_size, output_dim]);

        DataBatch { inputs, targets }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TeamId;
    use burn::backend::NdArray;
    use chrono::NaiveDate;

    type TestBackend = NdArray<f32>;

    fn point(day: u32, inputs: Vec<f64>) -> DataPoint {
        DataPoint {
            inputs,
            outputs: vec![0.25, 0.5, 0.125, 0.75],
            reference: MatchReference {
                date: NaiveDate::from_ymd_opt(2015, 4, day)
                    .unwrap()
                    .and_hms_opt(13, 40, 0)
                    .unwrap(),
                home_team: TeamId(1),
                away_team: TeamId(2),
            },
        }
    }

    #[test]
    fn test_split_is_chronological() {
        let data = DataSet::new(
            "test",
            (1..=10).map(|d| point(d, vec![0.1, 0.2])).collect(),
        );
        let (train, val) = data.split(0.8);

        assert_eq!(train.len(), 8);
        assert_eq!(val.len(), 2);
        assert!(train.points.last().unwrap().reference.date < val.points[0].reference.date);
        assert_eq!(val.scheme, "test");
    }

    #[test]
    fn test_split_keeps_a_training_point() {
        let data = DataSet::new("test", vec![point(1, vec![0.1])]);
        let (train, val) = data.split(0.15);
        assert_eq!(train.len(), 1);
        assert!(val.is_empty());

        let (train, val) = DataSet::default().split(0.8);
        assert!(train.is_empty());
        assert!(val.is_empty());
    }

    #[test]
    fn test_check_arity() {
        let data = DataSet::new("test", vec![point(1, vec![0.1, 0.2]), point(2, vec![0.3])]);
        assert!(matches!(
            data.check_arity(2, 4),
            Err(TipperError::ArityMismatch { actual: 1, .. })
        ));

        let data = DataSet::new("test", vec![point(1, vec![0.1, 0.2])]);
        assert!(data.check_arity(2, 4).is_ok());
        assert_eq!(data.input_dim(), Some(2));
        assert_eq!(data.output_dim(), Some(4));
    }

    #[test]
    fn test_batch_shapes() {
        let device = Default::default();
        let a = point(1, vec![0.1, 0.2, 0.3]);
        let b = point(2, vec![0.4, 0.5, 0.6]);
        let batch = DataBatch::<TestBackend>::from_points(&[&a, &b], &device);

        assert_eq!(batch.inputs.dims(), [2, 3]);
        assert_eq!(batch.targets.dims(), [2, 4]);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");

        let data = DataSet::new("latest_best", vec![point(3, vec![0.5, 0.25])]);
        data.save(&path).unwrap();
        let loaded = DataSet::load(&path).unwrap();

        assert_eq!(loaded.scheme, "latest_best");
        assert_eq!(loaded.points, data.points);
    }
}
