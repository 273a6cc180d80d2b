//! Interpretation schemes
//!
//! A scheme is a named list of tiers. Tier `i` holds the window sizes ("terms")
//! used by the feature family read at pipeline position `i`; a term <= 0 is
//! skipped. The scheme also carries the numeric mapping that turns a window of
//! matches into values, so schemes can be added as data without touching the
//! extraction code.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::families::Family;
use super::window::{self, OpponentResult};
use crate::{MatchRecord, Result, TeamId, TipperError, MAX_GOALS, MAX_POINTS, MAX_SCORE};

pub const DEFAULT: &str = "default";
pub const BESPOKE_LEGACY: &str = "bespoke_legacy";
pub const BESPOKE_API: &str = "bespoke_api";
pub const LATEST_BEST: &str = "latest_best";

/// Outputs per data point: goals and behinds for each side
pub const OUTPUT_DIM: usize = 4;

/// A per-side quantity summed over a window, with its per-match ceiling
#[derive(Clone, Copy)]
pub struct Measure {
    pub select: fn(&MatchRecord, TeamId) -> f64,
    pub ceiling: f64,
}

impl Measure {
    /// Window ceiling: `k` matches, each worth at most `ceiling`
    pub fn max_for(&self, k: f64) -> f64 {
        k * self.ceiling
    }
}

/// A quantity summed over second-hand opponent results
#[derive(Clone, Copy)]
pub struct ResultMeasure {
    pub select: fn(&OpponentResult) -> f64,
    pub ceiling: f64,
}

impl ResultMeasure {
    pub fn max_for(&self, k: f64) -> f64 {
        k * self.ceiling
    }
}

/// Numeric mapping used by the feature families
pub trait FeatureMapping {
    /// Score-valued measures, appended per side in this order
    fn score_measures(&self) -> Vec<Measure>;

    /// Outcome-valued measures
    fn win_measures(&self) -> Vec<Measure>;

    /// Measures over opponents' results against third parties
    fn result_measures(&self) -> Vec<ResultMeasure>;

    /// Normalized training targets for a match
    fn outputs(&self, m: &MatchRecord) -> Vec<f64>;
}

fn total_for(m: &MatchRecord, team: TeamId) -> f64 {
    m.score_for(team).map_or(0.0, |s| s.total() as f64)
}

fn goals_for(m: &MatchRecord, team: TeamId) -> f64 {
    m.score_for(team).map_or(0.0, |s| s.goals as f64)
}

fn points_for(m: &MatchRecord, team: TeamId) -> f64 {
    m.score_for(team).map_or(0.0, |s| s.points as f64)
}

fn result_for(m: &MatchRecord, team: TeamId) -> f64 {
    m.result_for(team).unwrap_or(0.0)
}

fn opponent_total(r: &OpponentResult) -> f64 {
    r.opponent_score.total() as f64
}

fn opposition_total(r: &OpponentResult) -> f64 {
    r.opposition_score.total() as f64
}

/// Concrete numeric mappings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FeatureScheme {
    /// One value per side: total score
    Total { max_score: f64 },
    /// Two values per side: goals, then behinds
    Components { max_goals: f64, max_points: f64 },
}

impl Default for FeatureScheme {
    fn default() -> Self {
        FeatureScheme::Total {
            max_score: MAX_SCORE,
        }
    }
}

impl FeatureScheme {
    fn score_ceiling(&self) -> f64 {
        match *self {
            FeatureScheme::Total { max_score } => max_score,
            FeatureScheme::Components {
                max_goals,
                max_points,
            } => crate::GOAL_VALUE as f64 * max_goals + max_points,
        }
    }
}

impl FeatureMapping for FeatureScheme {
    fn score_measures(&self) -> Vec<Measure> {
        match *self {
            FeatureScheme::Total { max_score } => vec![Measure {
                select: total_for,
                ceiling: max_score,
            }],
            FeatureScheme::Components {
                max_goals,
                max_points,
            } => vec![
                Measure {
                    select: goals_for,
                    ceiling: max_goals,
                },
                Measure {
                    select: points_for,
                    ceiling: max_points,
                },
            ],
        }
    }

    fn win_measures(&self) -> Vec<Measure> {
        vec![Measure {
            select: result_for,
            ceiling: 1.0,
        }]
    }

    fn result_measures(&self) -> Vec<ResultMeasure> {
        let ceiling = self.score_ceiling();
        vec![
            ResultMeasure {
                select: opponent_total,
                ceiling,
            },
            ResultMeasure {
                select: opposition_total,
                ceiling,
            },
        ]
    }

    fn outputs(&self, m: &MatchRecord) -> Vec<f64> {
        vec![
            window::normalize(m.home_score.goals as f64, MAX_GOALS),
            window::normalize(m.home_score.points as f64, MAX_POINTS),
            window::normalize(m.away_score.goals as f64, MAX_GOALS),
            window::normalize(m.away_score.points as f64, MAX_POINTS),
        ]
    }
}

/// One pipeline step: which family reads which tier, and how many tiers the
/// scheme needs before the step runs at all
#[derive(Debug, Clone, Copy)]
pub struct Step {
    pub family: Family,
    pub tier: usize,
    pub min_tiers: usize,
}

impl Step {
    const fn new(family: Family, tier: usize, min_tiers: usize) -> Self {
        Step {
            family,
            tier,
            min_tiers,
        }
    }
}

/// Order in which tiers are applied. Opponent quality reuses tier 4's terms but
/// only runs when a sixth tier is present.
pub const PIPELINE: [Step; 7] = [
    Step::new(Family::TeamScore, 0, 1),
    Step::new(Family::GroundScore, 1, 2),
    Step::new(Family::StateScore, 2, 3),
    Step::new(Family::DayOfWeek, 3, 4),
    Step::new(Family::SharedOpponent, 4, 5),
    Step::new(Family::OpponentQuality, 4, 6),
    Step::new(Family::TeamWin, 0, 6),
];

/// Scheme as written in configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemeDefinition {
    pub name: String,
    #[serde(default)]
    pub features: FeatureScheme,
    pub tiers: Vec<Vec<i32>>,
}

/// Named tier/window configuration plus its numeric mapping
#[derive(Debug, Clone, PartialEq)]
pub struct InterpretationScheme {
    pub name: String,
    pub tiers: Vec<Vec<i32>>,
    pub features: FeatureScheme,
}

impl InterpretationScheme {
    pub fn new(name: impl Into<String>, tiers: Vec<Vec<i32>>, features: FeatureScheme) -> Self {
        InterpretationScheme {
            name: name.into(),
            tiers,
            features,
        }
    }

    /// Active (family, term) pairs in extraction order.
    ///
    /// Stops at the first step the scheme has too few tiers for.
    pub fn active_terms(&self) -> Vec<(Family, usize)> {
        let mut terms = Vec::new();
        for step in PIPELINE {
            if self.tiers.len() < step.min_tiers {
                break;
            }
            for &term in &self.tiers[step.tier] {
                if term > 0 {
                    terms.push((step.family, term as usize));
                }
            }
        }
        terms
    }

    /// Length of the input vector this scheme produces
    pub fn input_len(&self) -> usize {
        self.active_terms()
            .iter()
            .map(|(family, _)| family.arity(&self.features))
            .sum()
    }

    pub fn output_len(&self) -> usize {
        OUTPUT_DIM
    }
}

impl From<SchemeDefinition> for InterpretationScheme {
    fn from(def: SchemeDefinition) -> Self {
        InterpretationScheme::new(def.name, def.tiers, def.features)
    }
}

/// Scheme name -> scheme
#[derive(Debug, Clone)]
pub struct SchemeRegistry {
    schemes: BTreeMap<String, InterpretationScheme>,
}

impl SchemeRegistry {
    /// Registry holding the built-in schemes
    pub fn builtin() -> Self {
        let subset = vec![1, 5, 11, 19, 29];
        let legacy = vec![1, 8, 21];
        let long = vec![25, 31, 37];
        let total = FeatureScheme::default();

        let builtin = [
            InterpretationScheme::new(DEFAULT, vec![subset; 6], total),
            InterpretationScheme::new(BESPOKE_LEGACY, vec![legacy; 5], total),
            InterpretationScheme::new(
                BESPOKE_API,
                vec![
                    vec![9, 13, 17],
                    long.clone(),
                    vec![1, 3, 5],
                    long.clone(),
                    long,
                ],
                total,
            ),
            InterpretationScheme::new(
                LATEST_BEST,
                vec![
                    vec![1, 5, 11],
                    vec![11],
                    vec![11],
                    vec![11],
                    vec![1, 5, 11],
                ],
                total,
            ),
        ];

        SchemeRegistry {
            schemes: builtin
                .into_iter()
                .map(|s| (s.name.clone(), s))
                .collect(),
        }
    }

    /// Built-in schemes plus those defined in configuration
    pub fn with_definitions(definitions: &[SchemeDefinition]) -> Result<Self> {
        let mut registry = Self::builtin();
        for def in definitions {
            registry.register(def.clone().into())?;
        }
        Ok(registry)
    }

    /// Add a scheme; replacing an existing name is allowed
    pub fn register(&mut self, scheme: InterpretationScheme) -> Result<()> {
        if scheme.name.trim().is_empty() {
            return Err(TipperError::Config("scheme name must not be empty".to_string()));
        }
        if let Some(previous) = self.schemes.get(&scheme.name) {
            log::warn!("Replacing interpretation scheme '{}'", previous.name);
        }
        self.schemes.insert(scheme.name.clone(), scheme);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<&InterpretationScheme> {
        self.schemes
            .get(name)
            .ok_or_else(|| TipperError::UnknownScheme(name.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &InterpretationScheme> {
        self.schemes.values()
    }
}

impl Default for SchemeRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_input_lengths() {
        let registry = SchemeRegistry::builtin();
        assert_eq!(registry.get(LATEST_BEST).unwrap().input_len(), 18);
        assert_eq!(registry.get(BESPOKE_LEGACY).unwrap().input_len(), 30);
        assert_eq!(registry.get(BESPOKE_API).unwrap().input_len(), 30);
        // 5 tiers x 5 terms x 2, opponent quality 5 x 4, team win 5 x 2
        assert_eq!(registry.get(DEFAULT).unwrap().input_len(), 80);
    }

    #[test]
    fn test_unknown_scheme() {
        let registry = SchemeRegistry::builtin();
        assert!(matches!(
            registry.get("nope"),
            Err(TipperError::UnknownScheme(_))
        ));
    }

    #[test]
    fn test_truncates_at_missing_tier() {
        let scheme = InterpretationScheme::new("short", vec![vec![3, 5]], FeatureScheme::default());
        assert_eq!(
            scheme.active_terms(),
            vec![(Family::TeamScore, 3), (Family::TeamScore, 5)]
        );
        assert_eq!(scheme.input_len(), 4);

        let empty = InterpretationScheme::new("empty", vec![], FeatureScheme::default());
        assert!(empty.active_terms().is_empty());
    }

    #[test]
    fn test_sentinels_are_skipped() {
        let scheme = InterpretationScheme::new(
            "sentinels",
            vec![vec![0, -1]; 6],
            FeatureScheme::default(),
        );
        assert_eq!(scheme.input_len(), 0);

        let scheme = InterpretationScheme::new(
            "mixed",
            vec![vec![0, 4], vec![-2], vec![7]],
            FeatureScheme::default(),
        );
        assert_eq!(
            scheme.active_terms(),
            vec![(Family::TeamScore, 4), (Family::StateScore, 7)]
        );
    }

    #[test]
    fn test_six_tiers_enable_quality_and_wins() {
        let scheme = InterpretationScheme::new(
            "six",
            vec![vec![2], vec![], vec![], vec![], vec![3], vec![]],
            FeatureScheme::default(),
        );
        assert_eq!(
            scheme.active_terms(),
            vec![
                (Family::TeamScore, 2),
                (Family::SharedOpponent, 3),
                (Family::OpponentQuality, 3),
                (Family::TeamWin, 2),
            ]
        );
        assert_eq!(scheme.input_len(), 2 + 2 + 4 + 2);
    }

    #[test]
    fn test_components_arity() {
        let scheme = InterpretationScheme::new(
            "components",
            vec![vec![3, 5]],
            FeatureScheme::Components {
                max_goals: MAX_GOALS,
                max_points: MAX_POINTS,
            },
        );
        assert_eq!(scheme.input_len(), 8);
    }

    #[test]
    fn test_register_definitions() {
        let defs = vec![SchemeDefinition {
            name: "custom".to_string(),
            features: FeatureScheme::default(),
            tiers: vec![vec![2, 4], vec![6]],
        }];
        let registry = SchemeRegistry::with_definitions(&defs).unwrap();
        assert_eq!(registry.get("custom").unwrap().input_len(), 6);
        assert!(registry.get(LATEST_BEST).is_ok());

        let bad = vec![SchemeDefinition {
            name: " ".to_string(),
            features: FeatureScheme::default(),
            tiers: vec![],
        }];
        assert!(SchemeRegistry::with_definitions(&bad).is_err());
    }

    #[test]
    fn test_definition_from_toml() {
        let def: SchemeDefinition = toml::from_str(
            r#"
            name = "split"
            tiers = [[1, 8], [21]]
            features = { kind = "components", max_goals = 40.0, max_points = 40.0 }
            "#,
        )
        .unwrap();
        let scheme: InterpretationScheme = def.into();
        assert_eq!(scheme.input_len(), 12);
    }
}
