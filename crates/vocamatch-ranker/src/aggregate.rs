//! Need aggregation: accumulate round points into bounded need scores.
//!
//! This is a batch step. Bounds are only meaningful once every configured
//! round has been answered, so partial input is rejected.

use std::collections::BTreeMap;

use tracing::debug;
use uuid::Uuid;
use vocamatch_common::{Instrument, NeedScore, Result, ValidationError, VocaError};

use crate::normalise::{std_score_0_100, RoundPoints};

/// Compute one `NeedScore` per instrument need, in instrument order.
pub fn aggregate_needs(
    assessment_id: Uuid,
    instrument: &Instrument,
    round_points: &BTreeMap<u32, RoundPoints>,
) -> Result<Vec<NeedScore>> {
    if let Some(&unknown) = round_points.keys().find(|i| instrument.round(**i).is_none()) {
        return Err(ValidationError::UnknownRound(unknown).into());
    }

    let answered = instrument
        .rounds()
        .iter()
        .filter(|r| round_points.contains_key(&r.index))
        .count();
    if answered < instrument.round_count() {
        return Err(VocaError::IncompleteAssessment {
            assessment_id,
            answered,
            required: instrument.round_count(),
        });
    }

    let mut scores = Vec::with_capacity(instrument.needs().len());
    for need in instrument.needs() {
        let mut raw_score = 0;
        let mut appearances = 0u32;
        for round_index in instrument.rounds_containing(&need.code) {
            let pts = round_points
                .get(&round_index)
                .and_then(|p| p.get(&need.code))
                .ok_or_else(|| {
                    VocaError::Pipeline(format!(
                        "round {} has no points for need '{}'",
                        round_index, need.code
                    ))
                })?;
            raw_score += pts;
            appearances += 1;
        }

        let bounds = instrument.need_bounds(&need.code).ok_or_else(|| {
            VocaError::Pipeline(format!("no bounds for need '{}'", need.code))
        })?;
        debug_assert_eq!(bounds.appearances, appearances);

        scores.push(NeedScore {
            assessment_id,
            need_code: need.code.clone(),
            raw_score,
            appearances,
            min_possible: bounds.min_possible,
            max_possible: bounds.max_possible,
            std_score_0_100: std_score_0_100(raw_score, bounds.min_possible, bounds.max_possible),
        });
    }

    debug!(%assessment_id, n_needs = scores.len(), "Aggregated need scores");
    Ok(scores)
}
