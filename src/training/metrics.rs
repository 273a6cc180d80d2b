//! Training metrics and evaluation

use std::fmt;

use crate::features::window::denormalize;
use crate::{GOAL_VALUE, MAX_GOALS, MAX_POINTS};

/// Metrics accumulated over the batches of one epoch
#[derive(Debug, Clone, Default)]
pub struct Metrics {
    /// Sum of batch losses
    pub total_loss: f64,
    /// Predictions whose winner matched the result
    pub correct_tips: usize,
    pub total_predictions: usize,
    /// Sum of absolute errors of the predicted margin (home minus away), in points
    pub margin_error_sum: f64,
    pub batch_count: usize,
}

/// Home minus away total from a normalized (hg, hp, ag, ap) row
fn signed_margin(row: &[f32]) -> f64 {
    let total = |goals: f32, points: f32| {
        GOAL_VALUE as f64 * denormalize(goals as f64, MAX_GOALS)
            + denormalize(points as f64, MAX_POINTS)
    };
    total(row[0], row[1]) - total(row[2], row[3])
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Update with one batch.
    ///
    /// `predictions` and `targets` are row-major `[batch, 4]` normalized outputs.
    pub fn update(&mut self, loss: f32, predictions: &[f32], targets: &[f32]) {
        for (pred, target) in predictions.chunks_exact(4).zip(targets.chunks_exact(4)) {
            let predicted = signed_margin(pred);
            let actual = signed_margin(target);

            // A drawn result is tipped correctly by nobody
            if predicted * actual > 0.0 {
                self.correct_tips += 1;
            }
            self.margin_error_sum += (predicted - actual).abs();
            self.total_predictions += 1;
        }
        self.total_loss += loss as f64;
        self.batch_count += 1;
    }

    /// Get average loss
    pub fn avg_loss(&self) -> f64 {
        if self.batch_count == 0 {
            0.0
        } else {
            self.total_loss / self.batch_count as f64
        }
    }

    /// Fraction of matches where the predicted winner won
    pub fn accuracy(&self) -> f64 {
        if self.total_predictions == 0 {
            0.0
        } else {
            self.correct_tips as f64 / self.total_predictions as f64
        }
    }

    /// Mean absolute margin error, in points
    pub fn margin_mae(&self) -> f64 {
        if self.total_predictions == 0 {
            0.0
        } else {
            self.margin_error_sum / self.total_predictions as f64
        }
    }
}

impl fmt::Display for Metrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Loss: {:.5} | Tips: {:.1}% | Margin MAE: {:.1}",
            self.avg_loss(),
            self.accuracy() * 100.0,
            self.margin_mae()
        )
    }
}

/// Training history for tracking progress
#[derive(Debug, Clone, Default)]
pub struct TrainingHistory {
    pub train_losses: Vec<f64>,
    pub val_losses: Vec<f64>,
    pub train_accuracies: Vec<f64>,
    pub val_accuracies: Vec<f64>,
    pub best_val_loss: f64,
    pub best_epoch: usize,
}

impl TrainingHistory {
    pub fn new() -> Self {
        Self {
            best_val_loss: f64::INFINITY,
            ..Default::default()
        }
    }

    /// Record metrics for an epoch; returns true if it is the best so far
    pub fn record_epoch(&mut self, epoch: usize, train: &Metrics, val: &Metrics) -> bool {
        self.train_losses.push(train.avg_loss());
        self.val_losses.push(val.avg_loss());
        self.train_accuracies.push(train.accuracy());
        self.val_accuracies.push(val.accuracy());

        if val.avg_loss() < self.best_val_loss {
            self.best_val_loss = val.avg_loss();
            self.best_epoch = epoch;
            true
        } else {
            false
        }
    }

    pub fn epochs(&self) -> usize {
        self.train_losses.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_update_tips_and_margin() {
        let mut metrics = Metrics::new();
        // Predicted 15.10.100 v 10.10.70; actual 12.12.84 v 10.4.64
        let predictions = [0.375, 0.25, 0.25, 0.25];
        let targets = [0.3, 0.3, 0.25, 0.1];
        metrics.update(0.02, &predictions, &targets);

        assert_eq!(metrics.total_predictions, 1);
        assert_relative_eq!(metrics.accuracy(), 1.0);
        assert_relative_eq!(metrics.margin_mae(), 10.0, epsilon = 1e-4);

        // Wrong tip: predicted home, away won
        metrics.update(0.04, &[0.5, 0.0, 0.0, 0.0], &[0.0, 0.0, 0.5, 0.0]);
        assert_relative_eq!(metrics.accuracy(), 0.5);
        assert_relative_eq!(metrics.avg_loss(), 0.03, epsilon = 1e-6);
    }

    #[test]
    fn test_empty_metrics() {
        let metrics = Metrics::new();
        assert_eq!(metrics.avg_loss(), 0.0);
        assert_eq!(metrics.accuracy(), 0.0);
        assert_eq!(metrics.margin_mae(), 0.0);
    }

    #[test]
    fn test_history_tracks_best_epoch() {
        let mut history = TrainingHistory::new();
        let with_loss = |loss: f32| {
            let mut m = Metrics::new();
            m.update(loss, &[], &[]);
            m
        };

        assert!(history.record_epoch(0, &with_loss(0.5), &with_loss(0.4)));
        assert!(history.record_epoch(1, &with_loss(0.3), &with_loss(0.2)));
        assert!(!history.record_epoch(2, &with_loss(0.2), &with_loss(0.25)));

        assert_eq!(history.best_epoch, 1);
        assert_relative_eq!(history.best_val_loss, 0.2, epsilon = 1e-6);
        assert_eq!(history.epochs(), 3);
    }
}
