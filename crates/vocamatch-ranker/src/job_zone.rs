//! Job-zone ranking of match results.

use std::cmp::Ordering;

use vocamatch_common::MatchResult;

/// Within-zone order: correlation descending, then occupation code ascending.
fn by_correlation_then_code(a: &MatchResult, b: &MatchResult) -> Ordering {
    b.correlation
        .partial_cmp(&a.correlation)
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.occupation_code.cmp(&b.occupation_code))
}

/// Assign dense ranks per job zone and return results in presentation order.
///
/// Only minimum matches are ranked (1..N per zone); the rest keep `None` and
/// follow the ranked entries of their zone. Correlations are not touched.
pub fn rank_within_job_zones(mut results: Vec<MatchResult>) -> Vec<MatchResult> {
    results.sort_by(|a, b| {
        a.job_zone
            .cmp(&b.job_zone)
            .then_with(|| b.is_minimum_match.cmp(&a.is_minimum_match))
            .then_with(|| by_correlation_then_code(a, b))
    });

    let mut current_zone = None;
    let mut next_rank = 1u32;
    for result in &mut results {
        if current_zone != Some(result.job_zone) {
            current_zone = Some(result.job_zone);
            next_rank = 1;
        }
        result.rank_within_job_zone = if result.is_minimum_match {
            let rank = next_rank;
            next_rank += 1;
            Some(rank)
        } else {
            None
        };
    }

    results
}
