//! Seasons, rounds and the match corpus

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::{MatchRecord, Result};

/// Matches sharing a season year and round number
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Round {
    pub year: i32,
    pub number: u32,
    pub matches: Vec<MatchRecord>,
}

impl Round {
    pub fn new(year: i32, number: u32, matches: Vec<MatchRecord>) -> Self {
        Round {
            year,
            number,
            matches,
        }
    }

    /// Kick-off of the first match of the round
    pub fn first_date(&self) -> Option<NaiveDateTime> {
        self.matches.iter().map(|m| m.date).min()
    }

    /// True if any match in the round kicks off at or after `date`
    pub fn has_match_on_or_after(&self, date: NaiveDateTime) -> bool {
        self.matches.iter().any(|m| m.date >= date)
    }

    /// True if the round is at or before (`year`, `round`)
    pub fn is_up_to(&self, year: i32, round: u32) -> bool {
        self.year < year || (self.year == year && self.number <= round)
    }

    /// True if the round is at or after (`year`, `round`)
    pub fn is_from(&self, year: i32, round: u32) -> bool {
        self.year > year || (self.year == year && self.number >= round)
    }
}

/// One year of rounds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Season {
    pub year: i32,
    pub rounds: Vec<Round>,
}

/// Read-only source of match history
///
/// Every call returns an owned snapshot, so a caller works against a consistent
/// view even if the underlying store is appended to afterwards.
pub trait MatchCorpus {
    /// All rounds up to and including (`year`, `round`), chronologically ordered
    fn rounds_up_to(&self, year: i32, round: u32) -> Result<Vec<Round>>;

    /// All seasons, chronologically ordered
    fn all_seasons(&self) -> Result<Vec<Season>>;
}

/// In-memory league of seasons, persisted as JSON
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct League {
    pub seasons: Vec<Season>,
}

impl League {
    /// Build a league, ordering seasons by year and rounds by number
    pub fn new(mut seasons: Vec<Season>) -> Self {
        seasons.sort_by_key(|s| s.year);
        for season in &mut seasons {
            season.rounds.sort_by_key(|r| r.number);
        }
        League { seasons }
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let league: League = serde_json::from_str(&content)?;
        Ok(Self::new(league.seasons))
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn rounds(&self) -> impl Iterator<Item = &Round> {
        self.seasons.iter().flat_map(|s| s.rounds.iter())
    }

    pub fn matches(&self) -> impl Iterator<Item = &MatchRecord> {
        self.rounds().flat_map(|r| r.matches.iter())
    }

    pub fn stats(&self) -> LeagueStats {
        LeagueStats {
            season_count: self.seasons.len(),
            round_count: self.rounds().count(),
            match_count: self.matches().count(),
            earliest_match: self.matches().map(|m| m.date).min(),
            latest_match: self.matches().map(|m| m.date).max(),
        }
    }
}

impl MatchCorpus for League {
    fn rounds_up_to(&self, year: i32, round: u32) -> Result<Vec<Round>> {
        Ok(self
            .rounds()
            .filter(|r| r.is_up_to(year, round))
            .cloned()
            .collect())
    }

    fn all_seasons(&self) -> Result<Vec<Season>> {
        Ok(self.seasons.clone())
    }
}

/// League summary
#[derive(Debug, Clone)]
pub struct LeagueStats {
    pub season_count: usize,
    pub round_count: usize,
    pub match_count: usize,
    pub earliest_match: Option<NaiveDateTime>,
    pub latest_match: Option<NaiveDateTime>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{GroundId, Score, TeamId};
    use chrono::NaiveDate;

    fn make_match(y: i32, m: u32, d: u32) -> MatchRecord {
        MatchRecord {
            date: NaiveDate::from_ymd_opt(y, m, d)
                .unwrap()
                .and_hms_opt(19, 50, 0)
                .unwrap(),
            home_team: TeamId(1),
            away_team: TeamId(2),
            ground: GroundId(4),
            home_score: Score::new(12, 10),
            away_score: Score::new(11, 8),
        }
    }

    fn sample_league() -> League {
        League::new(vec![
            Season {
                year: 2015,
                rounds: vec![
                    Round::new(2015, 2, vec![make_match(2015, 4, 11)]),
                    Round::new(2015, 1, vec![make_match(2015, 4, 2)]),
                ],
            },
            Season {
                year: 2014,
                rounds: vec![Round::new(2014, 1, vec![make_match(2014, 3, 14)])],
            },
        ])
    }

    #[test]
    fn test_new_orders_rounds() {
        let league = sample_league();
        let order: Vec<_> = league.rounds().map(|r| (r.year, r.number)).collect();
        assert_eq!(order, vec![(2014, 1), (2015, 1), (2015, 2)]);
    }

    #[test]
    fn test_rounds_up_to() {
        let league = sample_league();
        let rounds = league.rounds_up_to(2015, 1).unwrap();
        assert_eq!(rounds.len(), 2);
        assert!(rounds.iter().all(|r| r.is_up_to(2015, 1)));

        assert!(league.rounds_up_to(2000, 1).unwrap().is_empty());
    }

    #[test]
    fn test_round_dates() {
        let round = Round::new(2015, 1, vec![make_match(2015, 4, 4), make_match(2015, 4, 2)]);
        assert_eq!(round.first_date(), Some(make_match(2015, 4, 2).date));
        assert!(round.has_match_on_or_after(make_match(2015, 4, 4).date));
        assert!(!round.has_match_on_or_after(make_match(2015, 4, 5).date));
        assert_eq!(Round::new(2015, 3, vec![]).first_date(), None);
    }

    #[test]
    fn test_stats() {
        let stats = sample_league().stats();
        assert_eq!(stats.season_count, 2);
        assert_eq!(stats.round_count, 3);
        assert_eq!(stats.match_count, 3);
        assert_eq!(stats.earliest_match, Some(make_match(2014, 3, 14).date));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("league.json");

        let league = sample_league();
        league.save(&path).unwrap();
        let loaded = League::load(&path).unwrap();

        assert_eq!(loaded.seasons, league.seasons);
    }
}
