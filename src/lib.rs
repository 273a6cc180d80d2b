//! AFL match tipping
//!
//! Turns a chronological corpus of match results into fixed-shape feature vectors,
//! runs them through a neural predictor and converts the output back into
//! predicted scores and a wager decision.

pub mod data;
pub mod features;
pub mod model;
pub mod predict;
pub mod training;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Points awarded for a goal; a behind is worth one
pub const GOAL_VALUE: u32 = 6;

/// Upper bound on goals kicked by one side in a match (normalization ceiling)
pub const MAX_GOALS: f64 = 40.0;

/// Upper bound on behinds kicked by one side in a match (normalization ceiling)
pub const MAX_POINTS: f64 = 40.0;

/// Upper bound on one side's total score
pub const MAX_SCORE: f64 = GOAL_VALUE as f64 * MAX_GOALS + MAX_POINTS;

/// Unique identifier for a team
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TeamId(pub i64);

impl fmt::Display for TeamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Team({})", self.0)
    }
}

/// Unique identifier for a ground
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GroundId(pub i64);

impl fmt::Display for GroundId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ground({})", self.0)
    }
}

/// Which side of a fixture a team is on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Home,
    Away,
}

impl Side {
    pub const BOTH: [Side; 2] = [Side::Home, Side::Away];

    pub fn other(self) -> Side {
        match self {
            Side::Home => Side::Away,
            Side::Away => Side::Home,
        }
    }
}

/// A side's score: goals and behinds ("points")
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Score {
    pub goals: u32,
    pub points: u32,
}

impl Score {
    pub fn new(goals: u32, points: u32) -> Self {
        Score { goals, points }
    }

    /// Total score (6 per goal, 1 per behind)
    pub fn total(&self) -> u32 {
        GOAL_VALUE * self.goals + self.points
    }

    /// Whether the score fits inside the normalization ceilings
    pub fn is_plausible(&self) -> bool {
        (self.goals as f64) <= MAX_GOALS && (self.points as f64) <= MAX_POINTS
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{} ({})", self.goals, self.points, self.total())
    }
}

/// A single completed (or scheduled) match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub date: NaiveDateTime,
    pub home_team: TeamId,
    pub away_team: TeamId,
    pub ground: GroundId,
    pub home_score: Score,
    pub away_score: Score,
}

impl MatchRecord {
    /// Team playing on the given side
    pub fn team(&self, side: Side) -> TeamId {
        match side {
            Side::Home => self.home_team,
            Side::Away => self.away_team,
        }
    }

    /// Score of the given side
    pub fn score(&self, side: Side) -> Score {
        match side {
            Side::Home => self.home_score,
            Side::Away => self.away_score,
        }
    }

    /// Check if the team played in this match
    pub fn has_team(&self, team: TeamId) -> bool {
        self.home_team == team || self.away_team == team
    }

    /// Get the opponent for a given team
    pub fn opponent(&self, team: TeamId) -> Option<TeamId> {
        if team == self.home_team {
            Some(self.away_team)
        } else if team == self.away_team {
            Some(self.home_team)
        } else {
            None
        }
    }

    /// Get score for a specific team
    pub fn score_for(&self, team: TeamId) -> Option<Score> {
        if team == self.home_team {
            Some(self.home_score)
        } else if team == self.away_team {
            Some(self.away_score)
        } else {
            None
        }
    }

    /// Get score against a specific team
    pub fn score_against(&self, team: TeamId) -> Option<Score> {
        if team == self.home_team {
            Some(self.away_score)
        } else if team == self.away_team {
            Some(self.home_score)
        } else {
            None
        }
    }

    /// Match result from the team's point of view: 1 win, 0.5 draw, 0 loss
    pub fn result_for(&self, team: TeamId) -> Option<f64> {
        let ours = self.score_for(team)?.total();
        let theirs = self.score_against(team)?.total();
        Some(match ours.cmp(&theirs) {
            std::cmp::Ordering::Greater => 1.0,
            std::cmp::Ordering::Equal => 0.5,
            std::cmp::Ordering::Less => 0.0,
        })
    }

    /// Records that would poison aggregation (team playing itself, impossible scores)
    pub fn is_well_formed(&self) -> bool {
        self.home_team != self.away_team
            && self.home_score.is_plausible()
            && self.away_score.is_plausible()
    }

    /// Identity of this match
    pub fn reference(&self) -> MatchReference {
        MatchReference {
            home_team: self.home_team,
            away_team: self.away_team,
            date: self.date,
        }
    }
}

/// Opaque identity of a match: teams and kick-off
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MatchReference {
    pub date: NaiveDateTime,
    pub home_team: TeamId,
    pub away_team: TeamId,
}

/// Application-wide errors
#[derive(Debug, Error)]
pub enum TipperError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{what} arity mismatch: expected {expected}, got {actual}")]
    ArityMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Unknown interpretation scheme: {0}")]
    UnknownScheme(String),

    #[error("Unknown team: {0}")]
    UnknownTeam(String),

    #[error("Predictor failed: {0}")]
    Predictor(String),

    #[error("Predictor did not answer within {0:?}")]
    PredictorTimeout(Duration),

    #[error("Model not trained - run `tipper train` first")]
    NoModel,

    #[error("Match corpus unavailable: {0}")]
    Corpus(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Parse error: {0}")]
    Parse(String),
}

pub type Result<T> = std::result::Result<T, TipperError>;

/// Application configuration loaded from config.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub features: FeatureConfig,
    pub model: ModelConfig,
    pub training: TrainingConfig,
    pub wager: WagerConfig,
    #[serde(default)]
    pub predict: PredictConfig,
    pub data: DataConfig,
    /// Extra interpretation schemes, registered alongside the built-in ones
    #[serde(default)]
    pub schemes: Vec<features::scheme::SchemeDefinition>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureConfig {
    /// Active interpretation scheme (registry name)
    pub scheme: String,
    /// Matches older than this many days before the target are ignored
    pub expiry_days: i64,
    /// Distinct recent opponents considered by the opponent families
    pub recent_opponents: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    pub hidden_dims: Vec<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    pub epochs: usize,
    pub learning_rate: f64,
    pub batch_size: usize,
    /// Fraction of the (chronologically last) samples held out for validation
    pub validation_split: f32,
    pub seed: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WagerConfig {
    /// Predicted margin that must be exceeded before betting
    pub threshold: f64,
    /// Stake placed when the threshold is exceeded
    pub stake: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PredictConfig {
    /// Upper bound on a single predictor call, in milliseconds
    pub timeout_ms: Option<u64>,
}

impl PredictConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    pub league_path: String,
    /// Reference catalog; the built-in AFL catalog is used when unset
    pub catalog_path: Option<String>,
    pub model_path: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            features: FeatureConfig {
                scheme: features::scheme::LATEST_BEST.to_string(),
                expiry_days: 720,
                recent_opponents: 24,
            },
            model: ModelConfig {
                hidden_dims: vec![5],
            },
            training: TrainingConfig {
                epochs: 500,
                learning_rate: 0.5,
                batch_size: 32,
                validation_split: 0.15,
                seed: 42,
            },
            wager: WagerConfig {
                threshold: 27.0,
                stake: 15.0,
            },
            predict: PredictConfig::default(),
            data: DataConfig {
                league_path: "data/league.json".to_string(),
                catalog_path: None,
                model_path: "model/tipper_model".to_string(),
            },
            schemes: Vec::new(),
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            TipperError::Config(format!("Failed to read config file {}: {}", path, e))
        })?;
        toml::from_str(&content)
            .map_err(|e| TipperError::Config(format!("Failed to parse config: {}", e)))
    }

    pub fn save(&self, path: &str) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| TipperError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
