//! Score normalisation functions.
//!
//! A round ranking becomes points via a fixed table, and accumulated points
//! are mapped onto a bounded 0–100 scale.

use std::collections::{BTreeMap, HashSet};

use vocamatch_common::{Round, ValidationError};

/// Points by rank position: first place +4 down to last place −4.
pub const RANK_POINTS: [i32; 5] = [4, 2, 0, -2, -4];

/// Need code → points earned in one round.
pub type RoundPoints = BTreeMap<String, i32>;

/// Convert one ranking (most important first) into per-need points.
///
/// The ranking must be a permutation of the round's needs.
pub fn rank_points(round: &Round, ranking: &[String]) -> Result<RoundPoints, ValidationError> {
    if ranking.len() != round.needs.len() || ranking.len() != RANK_POINTS.len() {
        return Err(ValidationError::LengthMismatch {
            round: round.index,
            expected: round.needs.len(),
            actual: ranking.len(),
        });
    }

    let mut seen = HashSet::with_capacity(ranking.len());
    let mut points = RoundPoints::new();
    for (code, &pts) in ranking.iter().zip(RANK_POINTS.iter()) {
        if !round.contains(code) {
            return Err(ValidationError::UnknownNeed {
                round: round.index,
                need: code.clone(),
            });
        }
        if !seen.insert(code.as_str()) {
            return Err(ValidationError::DuplicateNeed {
                round: round.index,
                need: code.clone(),
            });
        }
        points.insert(code.clone(), pts);
    }

    Ok(points)
}

/// Min-max normalisation onto [0, 100].
/// A zero-width range is degenerate and maps to the midpoint.
pub fn std_score_0_100(raw: i32, min_possible: i32, max_possible: i32) -> f64 {
    let span = (max_possible - min_possible) as f64;
    if span.abs() < 1e-10 {
        return 50.0;
    }
    (100.0 * (raw - min_possible) as f64 / span).clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round() -> Round {
        Round {
            index: 3,
            needs: ["a", "b", "c", "d", "e"].iter().map(|s| s.to_string()).collect(),
            version: "v".into(),
        }
    }

    fn ranking(codes: &[&str]) -> Vec<String> {
        codes.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_points_follow_rank_table() {
        let pts = rank_points(&round(), &ranking(&["c", "a", "e", "b", "d"])).unwrap();
        assert_eq!(pts["c"], 4);
        assert_eq!(pts["a"], 2);
        assert_eq!(pts["e"], 0);
        assert_eq!(pts["b"], -2);
        assert_eq!(pts["d"], -4);
    }

    #[test]
    fn test_points_sum_to_zero_for_every_order() {
        let codes = ["a", "b", "c", "d", "e"];
        // every rotation and its reverse
        for shift in 0..codes.len() {
            let mut order: Vec<&str> = codes.iter().cycle().skip(shift).take(5).copied().collect();
            for _ in 0..2 {
                let pts = rank_points(&round(), &ranking(&order)).unwrap();
                assert_eq!(pts.values().sum::<i32>(), 0);
                let mut values: Vec<i32> = pts.values().copied().collect();
                values.sort_unstable();
                assert_eq!(values, vec![-4, -2, 0, 2, 4]);
                order.reverse();
            }
        }
    }

    #[test]
    fn test_rejects_short_ranking() {
        let err = rank_points(&round(), &ranking(&["a", "b", "c", "d"])).unwrap_err();
        assert_eq!(err, ValidationError::LengthMismatch { round: 3, expected: 5, actual: 4 });
    }

    #[test]
    fn test_rejects_duplicate() {
        let err = rank_points(&round(), &ranking(&["a", "b", "c", "d", "a"])).unwrap_err();
        assert_eq!(err, ValidationError::DuplicateNeed { round: 3, need: "a".into() });
    }

    #[test]
    fn test_rejects_need_outside_round() {
        let err = rank_points(&round(), &ranking(&["a", "b", "c", "d", "z"])).unwrap_err();
        assert_eq!(err, ValidationError::UnknownNeed { round: 3, need: "z".into() });
    }

    #[test]
    fn test_rank_points_is_idempotent() {
        let r = ranking(&["e", "d", "c", "b", "a"]);
        assert_eq!(rank_points(&round(), &r).unwrap(), rank_points(&round(), &r).unwrap());
    }

    #[test]
    fn test_std_score_bounds() {
        assert_eq!(std_score_0_100(-12, -12, 12), 0.0);
        assert_eq!(std_score_0_100(12, -12, 12), 100.0);
        assert_eq!(std_score_0_100(0, -12, 12), 50.0);
        assert_eq!(std_score_0_100(40, -12, 12), 100.0);
    }

    #[test]
    fn test_std_score_degenerate_range() {
        assert_eq!(std_score_0_100(0, 0, 0), 50.0);
    }

    #[test]
    fn test_std_score_monotonic() {
        let mut last = -1.0;
        for raw in -20..=20 {
            let s = std_score_0_100(raw, -20, 20);
            assert!(s >= last);
            assert!((0.0..=100.0).contains(&s));
            last = s;
        }
    }
}
