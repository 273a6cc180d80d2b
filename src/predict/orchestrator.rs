//! Round predictions and training data from the match corpus
//!
//! Every call takes its own snapshot of the corpus, cuts it down to the causal
//! history of each target match at round granularity, and only then extracts
//! features. A round is usable for a target only if none of its matches kick
//! off at or after the target.

use chrono::NaiveDateTime;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;

use super::predictor::{check_arity, Predictor};
use super::wager::WagerRule;
use crate::data::{Catalog, DataPoint, DataSet, MatchCorpus, Round};
use crate::features::scheme::OUTPUT_DIM;
use crate::features::window::denormalize;
use crate::features::{FeatureExtractor, InterpretationScheme};
use crate::{MatchRecord, MatchReference, Result, TipperError, GOAL_VALUE, MAX_GOALS, MAX_POINTS};

/// Predicted (fractional) goals and behinds for one side
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictedScore {
    pub goals: f64,
    pub points: f64,
}

impl PredictedScore {
    pub fn total(&self) -> f64 {
        GOAL_VALUE as f64 * self.goals + self.points
    }
}

/// Prediction and betting decision for one match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tip {
    pub year: i32,
    pub round: u32,
    pub reference: MatchReference,
    pub home: PredictedScore,
    pub away: PredictedScore,
    /// Absolute difference of predicted totals
    pub margin: f64,
    pub bet: f64,
}

impl Tip {
    /// Predicted winner, `None` on an exact tie
    pub fn winner(&self) -> Option<crate::TeamId> {
        let (home, away) = (self.home.total(), self.away.total());
        if home > away {
            Some(self.reference.home_team)
        } else if away > home {
            Some(self.reference.away_team)
        } else {
            None
        }
    }

    /// `"<Home> Vs <Away>: {hg, hp, ht, ag, ap, at}, Bet: $<amount>"`
    pub fn report_line(&self, catalog: &Catalog) -> String {
        format!(
            "{} Vs {}: {{{:.1}, {:.1}, {:.1}, {:.1}, {:.1}, {:.1}}}, Bet: ${:.2}",
            catalog.display_name(self.reference.home_team),
            catalog.display_name(self.reference.away_team),
            self.home.goals,
            self.home.points,
            self.home.total(),
            self.away.goals,
            self.away.points,
            self.away.total(),
            self.bet,
        )
    }
}

/// Ties a match corpus, a predictor, a scheme and a wager rule together
pub struct Tipper<C: MatchCorpus> {
    corpus: C,
    predictor: Arc<dyn Predictor>,
    scheme: InterpretationScheme,
    catalog: Arc<Catalog>,
    wager: WagerRule,
    expiry_days: i64,
    recent_opponents: usize,
    timeout: Option<Duration>,
}

impl<C: MatchCorpus> Tipper<C> {
    /// Fails if the predictor's widths do not match the scheme
    pub fn new(
        corpus: C,
        predictor: Arc<dyn Predictor>,
        scheme: InterpretationScheme,
        catalog: Arc<Catalog>,
        wager: WagerRule,
    ) -> Result<Self> {
        check_arity("scheme inputs", predictor.input_dim(), scheme.input_len())?;
        check_arity("scheme outputs", predictor.output_dim(), scheme.output_len())?;

        Ok(Tipper {
            corpus,
            predictor,
            scheme,
            catalog,
            wager,
            expiry_days: 720,
            recent_opponents: 24,
            timeout: None,
        })
    }

    /// Override the expiry window and the number of recent opponents
    pub fn with_feature_settings(mut self, expiry_days: i64, recent_opponents: usize) -> Self {
        self.expiry_days = expiry_days;
        self.recent_opponents = recent_opponents;
        self
    }

    /// Bound every predictor call
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn scheme(&self) -> &InterpretationScheme {
        &self.scheme
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    fn extractor(&self) -> FeatureExtractor<'_> {
        FeatureExtractor::new(&self.catalog, self.expiry_days, self.recent_opponents)
    }

    /// First round whose earliest match is strictly after `date`
    pub fn round_after(&self, date: NaiveDateTime) -> Result<Option<Round>> {
        round_after(&self.corpus, date)
    }

    /// Tips for every match of (`year`, `round`); empty if the round is unknown
    pub fn predict(&self, year: i32, round: u32) -> Result<Vec<Tip>> {
        let rounds = sanitize(self.corpus.rounds_up_to(year, round)?);
        let Some(target) = rounds.iter().find(|r| r.year == year && r.number == round) else {
            log::info!("No matches for {} round {}", year, round);
            return Ok(Vec::new());
        };

        let extractor = self.extractor();
        let mut tips = Vec::with_capacity(target.matches.len());
        for m in &target.matches {
            let history = causal_history(&rounds, m);
            let inputs = extractor.build_inputs(&history, m, &self.scheme);
            let outputs = self.call_predictor(inputs)?;

            let home = PredictedScore {
                goals: denormalize(outputs[0], MAX_GOALS),
                points: denormalize(outputs[1], MAX_POINTS),
            };
            let away = PredictedScore {
                goals: denormalize(outputs[2], MAX_GOALS),
                points: denormalize(outputs[3], MAX_POINTS),
            };
            let margin = (home.total() - away.total()).abs();

            tips.push(Tip {
                year,
                round,
                reference: m.reference(),
                home,
                away,
                margin,
                bet: self.wager.stake(margin),
            });
        }

        log::info!(
            "Predicted {} matches for {} round {} ({} bets)",
            tips.len(),
            year,
            round,
            tips.iter().filter(|t| t.bet > 0.0).count()
        );
        Ok(tips)
    }

    /// Tips for the first round starting after `date`
    pub fn predict_next(&self, date: NaiveDateTime) -> Result<Vec<Tip>> {
        match self.round_after(date)? {
            Some(round) => self.predict(round.year, round.number),
            None => {
                log::info!("No round starts after {}", date);
                Ok(Vec::new())
            }
        }
    }

    /// One data point per match from (`from_year`, `from_round`) to (`to_year`, `to_round`)
    pub fn build_full_data_set(
        &self,
        from_year: i32,
        from_round: u32,
        to_year: i32,
        to_round: u32,
    ) -> Result<DataSet> {
        build_full_data_set(
            &self.corpus,
            &self.extractor(),
            &self.scheme,
            (from_year, from_round),
            (to_year, to_round),
        )
    }

    /// Data set from (`from_year`, `from_round`) up to the round after `date`
    pub fn build_data_set_until(
        &self,
        from_year: i32,
        from_round: u32,
        date: NaiveDateTime,
    ) -> Result<DataSet> {
        build_data_set_until(
            &self.corpus,
            &self.extractor(),
            &self.scheme,
            (from_year, from_round),
            date,
        )
    }

    fn call_predictor(&self, inputs: Vec<f64>) -> Result<Vec<f64>> {
        let outputs = match self.timeout {
            None => self.predictor.predict(&inputs)?,
            Some(timeout) => {
                let predictor = Arc::clone(&self.predictor);
                let (tx, rx) = mpsc::channel();
                // Detached: a timed-out call finishes in the background and is discarded
                std::thread::spawn(move || {
                    let _ = tx.send(predictor.predict(&inputs));
                });
                match rx.recv_timeout(timeout) {
                    Ok(result) => result?,
                    Err(mpsc::RecvTimeoutError::Timeout) => {
                        log::warn!("Predictor did not answer within {:?}", timeout);
                        return Err(TipperError::PredictorTimeout(timeout));
                    }
                    Err(mpsc::RecvTimeoutError::Disconnected) => {
                        return Err(TipperError::Predictor("predictor thread exited".to_string()));
                    }
                }
            }
        };
        check_arity("predictor outputs", OUTPUT_DIM, outputs.len())?;
        Ok(outputs)
    }
}

/// First round of `corpus` whose earliest match is strictly after `date`
pub fn round_after<C: MatchCorpus + ?Sized>(
    corpus: &C,
    date: NaiveDateTime,
) -> Result<Option<Round>> {
    Ok(corpus
        .all_seasons()?
        .into_iter()
        .flat_map(|s| s.rounds)
        .filter_map(|r| r.first_date().filter(|d| *d > date).map(|d| (d, r)))
        .min_by_key(|(d, _)| *d)
        .map(|(_, r)| r))
}

/// One data point per match of the rounds from `from` to `to` (year, round), inclusive.
///
/// Malformed records are dropped with a warning rather than failing the build.
/// Points are ordered by match date, then home id, then away id.
pub fn build_full_data_set<C: MatchCorpus + ?Sized>(
    corpus: &C,
    extractor: &FeatureExtractor<'_>,
    scheme: &InterpretationScheme,
    from: (i32, u32),
    to: (i32, u32),
) -> Result<DataSet> {
    let rounds = sanitize(corpus.rounds_up_to(to.0, to.1)?);
    let targets: Vec<&MatchRecord> = rounds
        .iter()
        .filter(|r| r.is_from(from.0, from.1))
        .flat_map(|r| r.matches.iter())
        .collect();

    let mut points: Vec<DataPoint> = targets
        .par_iter()
        .map(|m| {
            let history = causal_history(&rounds, m);
            extractor.build_data_point(&history, m, scheme)
        })
        .collect();
    points.sort_by(|a, b| a.reference.cmp(&b.reference));

    log::info!(
        "Built {} data points ({} round {} to {} round {}, scheme {})",
        points.len(),
        from.0,
        from.1,
        to.0,
        to.1,
        scheme.name
    );
    Ok(DataSet::new(scheme.name.clone(), points))
}

/// [`build_full_data_set`] up to the round after `date`, or to the end of the
/// corpus when no round follows it
pub fn build_data_set_until<C: MatchCorpus + ?Sized>(
    corpus: &C,
    extractor: &FeatureExtractor<'_>,
    scheme: &InterpretationScheme,
    from: (i32, u32),
    date: NaiveDateTime,
) -> Result<DataSet> {
    let end = match round_after(corpus, date)? {
        Some(round) => Some((round.year, round.number)),
        None => corpus
            .all_seasons()?
            .into_iter()
            .flat_map(|s| s.rounds)
            .last()
            .map(|r| (r.year, r.number)),
    };

    match end {
        Some(to) => build_full_data_set(corpus, extractor, scheme, from, to),
        None => Ok(DataSet::new(scheme.name.clone(), Vec::new())),
    }
}

/// Matches of every round that finishes before `target` kicks off.
///
/// A round with even one match at or after the target's date is excluded whole.
pub fn causal_history(rounds: &[Round], target: &MatchRecord) -> Vec<MatchRecord> {
    rounds
        .iter()
        .filter(|r| !r.has_match_on_or_after(target.date))
        .flat_map(|r| r.matches.iter().cloned())
        .collect()
}

/// Drop malformed records, logging each one
fn sanitize(mut rounds: Vec<Round>) -> Vec<Round> {
    for round in &mut rounds {
        round.matches.retain(|m| {
            let ok = m.is_well_formed();
            if !ok {
                log::warn!(
                    "Skipping malformed match {} vs {} on {} ({} round {})",
                    m.home_team,
                    m.away_team,
                    m.date,
                    round.year,
                    round.number
                );
            }
            ok
        });
    }
    rounds
}
