//! Betting decision from a predicted margin

use crate::WagerConfig;

/// Fixed stake once the predicted margin clears a threshold
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WagerRule {
    pub threshold: f64,
    pub stake: f64,
}

impl WagerRule {
    pub fn new(threshold: f64, stake: f64) -> Self {
        WagerRule { threshold, stake }
    }

    /// Amount to bet on a match with this predicted margin
    pub fn stake(&self, margin: f64) -> f64 {
        if margin > self.threshold {
            self.stake
        } else {
            0.0
        }
    }
}

impl From<&WagerConfig> for WagerRule {
    fn from(config: &WagerConfig) -> Self {
        WagerRule::new(config.threshold, config.stake)
    }
}
