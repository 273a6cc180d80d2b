//! Feature families and the history filters behind them
//!
//! Every family reduces to one filter per side of the target match. Filters are
//! plain values built from (target match, side) and never see anything at or
//! after the target's kick-off.

use chrono::{Datelike, Duration, Months, NaiveDateTime, Weekday};

use super::scheme::FeatureMapping;
use super::window::{self, OpponentResult};
use crate::data::Catalog;
use crate::{GroundId, MatchRecord, Side, TeamId};

/// Ground form looks back at most this many years
pub const GROUND_YEARS: u32 = 12;

/// State form looks back at most this many years
pub const STATE_YEARS: u32 = 6;

/// Second-hand results are taken within this many months of the encounter
pub const ENCOUNTER_MONTHS: u32 = 1;

/// Feature families, in the order their tiers are read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
    TeamScore,
    GroundScore,
    StateScore,
    DayOfWeek,
    SharedOpponent,
    OpponentQuality,
    TeamWin,
}

impl Family {
    pub fn name(&self) -> &'static str {
        match self {
            Family::TeamScore => "team_score",
            Family::GroundScore => "ground_score",
            Family::StateScore => "state_score",
            Family::DayOfWeek => "day_of_week",
            Family::SharedOpponent => "shared_opponent",
            Family::OpponentQuality => "opponent_quality",
            Family::TeamWin => "team_win",
        }
    }

    /// Values one active term contributes (both sides)
    pub fn arity<M: FeatureMapping + ?Sized>(&self, mapping: &M) -> usize {
        let per_side = match self {
            Family::TeamWin => mapping.win_measures().len(),
            Family::OpponentQuality => mapping.result_measures().len(),
            _ => mapping.score_measures().len(),
        };
        per_side * Side::BOTH.len()
    }
}

/// Settings shared by all families
#[derive(Debug, Clone, Copy)]
pub struct FamilyContext<'a> {
    pub catalog: &'a Catalog,
    /// Matches older than this many days are ignored
    pub expiry_days: i64,
    /// Distinct recent opponents considered by the opponent families
    pub recent_opponents: usize,
}

/// Extra condition a family puts on top of "the side's team played"
#[derive(Debug, Clone)]
enum Scope<'a> {
    Team,
    Ground(GroundId),
    State(Option<&'a str>),
    Weekday(Weekday),
    Against(Vec<TeamId>),
}

/// History filter for one side of one family
#[derive(Debug, Clone)]
pub struct SideFilter<'a> {
    catalog: &'a Catalog,
    team: TeamId,
    kickoff: NaiveDateTime,
    /// Candidates must be strictly newer than this
    cutoff: NaiveDateTime,
    scope: Scope<'a>,
}

impl<'a> SideFilter<'a> {
    /// Filter for `family` on `side` of `target`.
    ///
    /// `history` is only consulted by the shared-opponent family, which needs the
    /// other side's recent opponents.
    pub fn new(
        ctx: &FamilyContext<'a>,
        family: Family,
        history: &[MatchRecord],
        target: &'a MatchRecord,
        side: Side,
    ) -> Self {
        // Saturates so an oversized expiry means "no expiry"
        let expiry = Duration::try_days(ctx.expiry_days.max(0))
            .and_then(|age| target.date.checked_sub_signed(age))
            .unwrap_or(NaiveDateTime::MIN);
        let years_back = |years: u32| {
            target
                .date
                .checked_sub_months(Months::new(12 * years))
                .map_or(expiry, |limit| limit.max(expiry))
        };

        let (cutoff, scope) = match family {
            Family::TeamScore | Family::TeamWin => (expiry, Scope::Team),
            Family::GroundScore => (years_back(GROUND_YEARS), Scope::Ground(target.ground)),
            Family::StateScore => (
                years_back(STATE_YEARS),
                Scope::State(ctx.catalog.state_of(target.ground)),
            ),
            Family::DayOfWeek => (expiry, Scope::Weekday(target.date.weekday())),
            Family::SharedOpponent | Family::OpponentQuality => {
                let other = side.other();
                let opponents = recent_opponents(
                    history,
                    target.team(other),
                    target.team(side),
                    target.date,
                    ctx.recent_opponents,
                )
                .into_iter()
                .map(|(team, _)| team)
                .collect();
                (expiry, Scope::Against(opponents))
            }
        };

        SideFilter {
            catalog: ctx.catalog,
            team: target.team(side),
            kickoff: target.date,
            cutoff,
            scope,
        }
    }

    /// The team whose matches this filter selects
    pub fn team(&self) -> TeamId {
        self.team
    }

    pub fn accepts(&self, candidate: &MatchRecord) -> bool {
        if !candidate.has_team(self.team)
            || candidate.date >= self.kickoff
            || candidate.date <= self.cutoff
        {
            return false;
        }

        match &self.scope {
            Scope::Team => true,
            Scope::Ground(ground) => candidate.ground == *ground,
            // A target at an uncatalogued ground has no state to match
            Scope::State(state) => match state {
                Some(state) => self.catalog.state_of(candidate.ground) == Some(*state),
                None => false,
            },
            Scope::Weekday(day) => candidate.date.weekday() == *day,
            Scope::Against(opponents) => candidate
                .opponent(self.team)
                .is_some_and(|o| opponents.contains(&o)),
        }
    }
}

/// Most recent distinct opponents of `team`, ignoring games against `excluded`.
///
/// Each opponent comes with the date of its latest encounter, newest first.
pub fn recent_opponents(
    history: &[MatchRecord],
    team: TeamId,
    excluded: TeamId,
    before: NaiveDateTime,
    limit: usize,
) -> Vec<(TeamId, NaiveDateTime)> {
    let encounters = window::recent(
        history,
        |m| m.has_team(team) && !m.has_team(excluded) && m.date < before,
        usize::MAX,
    );

    let mut opponents: Vec<(TeamId, NaiveDateTime)> = Vec::new();
    for encounter in encounters {
        if opponents.len() >= limit {
            break;
        }
        if let Some(opponent) = encounter.opponent(team) {
            if !opponents.iter().any(|(o, _)| *o == opponent) {
                opponents.push((opponent, encounter.date));
            }
        }
    }
    opponents
}

/// How the recent opponents of `side` fared against third parties around the
/// time they met `side`
pub fn opponent_results(
    ctx: &FamilyContext<'_>,
    history: &[MatchRecord],
    target: &MatchRecord,
    side: Side,
) -> Vec<OpponentResult> {
    let team = target.team(side);
    let opponents = recent_opponents(
        history,
        team,
        target.team(side.other()),
        target.date,
        ctx.recent_opponents,
    );

    let mut results = Vec::new();
    for (opponent, met) in opponents {
        let from = met
            .checked_sub_months(Months::new(ENCOUNTER_MONTHS))
            .unwrap_or(NaiveDateTime::MIN);
        let to = met
            .checked_add_months(Months::new(ENCOUNTER_MONTHS))
            .unwrap_or(NaiveDateTime::MAX);

        for m in history.iter().filter(|m| {
            m.has_team(opponent)
                && !m.has_team(team)
                && m.date >= from
                && m.date <= to
                && m.date < target.date
        }) {
            if let (Some(opponent_score), Some(opposition_score)) =
                (m.score_for(opponent), m.score_against(opponent))
            {
                results.push(OpponentResult {
                    opponent_score,
                    opposition_score,
                    date: m.date,
                });
            }
        }
    }
    results
}
