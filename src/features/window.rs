//! Windowed aggregation over match history
//!
//! Select the matches a predicate accepts, keep the `term` most recent, sum a
//! selector over them and normalize by a ceiling that depends on how many were
//! actually taken.

use chrono::NaiveDateTime;

use crate::{MatchRecord, Score};

/// Normalize `value` against `max`; zero when the ceiling is not positive
pub fn normalize(value: f64, max: f64) -> f64 {
    if max > 0.0 {
        value / max
    } else {
        0.0
    }
}

/// Inverse of [`normalize`]
pub fn denormalize(normalized: f64, max: f64) -> f64 {
    normalized * max
}

/// The `term` most recent matches accepted by `predicate`, newest first.
///
/// Ties on date keep history order, so the result is reproducible.
pub fn recent<'a, P>(
    history: &'a [MatchRecord],
    predicate: P,
    term: usize,
) -> Vec<&'a MatchRecord>
where
    P: Fn(&MatchRecord) -> bool,
{
    let mut selected: Vec<&MatchRecord> = history.iter().filter(|m| predicate(*m)).collect();
    // Stable sort: equal dates stay in insertion order
    selected.sort_by(|a, b| b.date.cmp(&a.date));
    selected.truncate(term);
    selected
}

/// Sum `selector` over the window and divide by `max_fn(k)`, k = matches taken
pub fn aggregate<P, S, M>(
    history: &[MatchRecord],
    predicate: P,
    term: usize,
    selector: S,
    max_fn: M,
) -> f64
where
    P: Fn(&MatchRecord) -> bool,
    S: Fn(&MatchRecord) -> f64,
    M: Fn(f64) -> f64,
{
    let window = recent(history, predicate, term);
    let sum: f64 = window.iter().map(|m| selector(*m)).sum();
    normalize(sum, max_fn(window.len() as f64))
}

/// One second-hand result: an opponent's score, its opposition's score, and when
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OpponentResult {
    pub opponent_score: Score,
    pub opposition_score: Score,
    pub date: NaiveDateTime,
}

/// [`aggregate`] for opponent result tuples (already filtered)
pub fn aggregate_results<S, M>(
    results: &[OpponentResult],
    term: usize,
    selector: S,
    max_fn: M,
) -> f64
where
    S: Fn(&OpponentResult) -> f64,
    M: Fn(f64) -> f64,
{
    let mut ordered: Vec<&OpponentResult> = results.iter().collect();
    ordered.sort_by(|a, b| b.date.cmp(&a.date));
    ordered.truncate(term);
    let sum: f64 = ordered.iter().map(|r| selector(*r)).sum();
    normalize(sum, max_fn(ordered.len() as f64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{GroundId, TeamId};
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn make_match(day: u32, home: i64, away: i64, home_goals: u32) -> MatchRecord {
        MatchRecord {
            date: NaiveDate::from_ymd_opt(2016, 5, day)
                .unwrap()
                .and_hms_opt(14, 10, 0)
                .unwrap(),
            home_team: TeamId(home),
            away_team: TeamId(away),
            ground: GroundId(1),
            home_score: Score::new(home_goals, 0),
            away_score: Score::new(5, 5),
        }
    }

    #[test]
    fn test_normalize_zero_max() {
        assert_eq!(normalize(12.0, 0.0), 0.0);
        assert_eq!(normalize(12.0, -3.0), 0.0);
        assert_eq!(normalize(12.0, f64::NAN), 0.0);
        assert_eq!(normalize(0.0, 0.0), 0.0);
    }

    #[test]
    fn test_denormalize_inverts_normalize() {
        for (x, max) in [(0.0, 40.0), (17.0, 40.0), (93.5, 280.0), (1e-9, 3.0), (1234.5, 1e6)] {
            assert_relative_eq!(denormalize(normalize(x, max), max), x, max_relative = 1e-12);
        }
    }

    #[test]
    fn test_recent_orders_newest_first() {
        let history = vec![
            make_match(1, 1, 2, 10),
            make_match(20, 1, 3, 11),
            make_match(10, 1, 4, 12),
        ];
        let window = recent(&history, |m| m.has_team(TeamId(1)), 2);
        assert_eq!(window.len(), 2);
        assert_eq!(window[0].away_team, TeamId(3));
        assert_eq!(window[1].away_team, TeamId(4));
    }

    #[test]
    fn test_recent_ties_keep_history_order() {
        let history = vec![
            make_match(5, 1, 2, 10),
            make_match(5, 1, 3, 11),
            make_match(5, 1, 4, 12),
        ];
        let window = recent(&history, |_| true, 2);
        assert_eq!(window[0].away_team, TeamId(2));
        assert_eq!(window[1].away_team, TeamId(3));
    }

    #[test]
    fn test_aggregate_uses_taken_count() {
        let history = vec![make_match(1, 1, 2, 10), make_match(2, 1, 3, 20)];
        // Only 2 matches available for a window of 5: normalized by max_fn(2)
        let value = aggregate(
            &history,
            |m| m.has_team(TeamId(1)),
            5,
            |m| m.home_score.goals as f64,
            |k| k * 40.0,
        );
        assert_relative_eq!(value, 30.0 / 80.0);
    }

    #[test]
    fn test_aggregate_empty_window_is_zero() {
        let history = vec![make_match(1, 1, 2, 10)];
        let value = aggregate(&history, |m| m.has_team(TeamId(9)), 5, |_| 1.0, |k| k);
        assert_eq!(value, 0.0);
        assert!(!value.is_nan());

        let value = aggregate(&history, |_| true, 0, |_| 1.0, |k| k);
        assert_eq!(value, 0.0);
    }

    #[test]
    fn test_aggregate_results_window() {
        let at = |day: u32| {
            NaiveDate::from_ymd_opt(2016, 6, day)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap()
        };
        let results = vec![
            OpponentResult {
                opponent_score: Score::new(10, 0),
                opposition_score: Score::new(5, 0),
                date: at(1),
            },
            OpponentResult {
                opponent_score: Score::new(20, 0),
                opposition_score: Score::new(5, 0),
                date: at(3),
            },
            OpponentResult {
                opponent_score: Score::new(30, 0),
                opposition_score: Score::new(5, 0),
                date: at(2),
            },
        ];

        let value = aggregate_results(&results, 2, |r| r.opponent_score.goals as f64, |k| k * 40.0);
        // Newest two: 20 and 30 goals
        assert_relative_eq!(value, 50.0 / 80.0);
        assert_eq!(aggregate_results(&[], 3, |_| 1.0, |k| k), 0.0);
    }
}
