//! Value aggregation: roll need scores up into their parent values.

use std::collections::HashMap;

use uuid::Uuid;
use vocamatch_common::{Instrument, NeedScore, Result, ValueScore, VocaError};

use crate::normalise::std_score_0_100;

/// Compute one `ValueScore` per instrument value, in value order.
///
/// Bounds come from the instrument's precomputed value bounds: the sums of
/// the member needs' own bounds, so values whose needs were shown a different
/// number of times still land on 0–100.
pub fn aggregate_values(
    assessment_id: Uuid,
    instrument: &Instrument,
    need_scores: &[NeedScore],
) -> Result<Vec<ValueScore>> {
    let by_code: HashMap<&str, &NeedScore> = need_scores
        .iter()
        .map(|s| (s.need_code.as_str(), s))
        .collect();

    let mut out = Vec::with_capacity(instrument.values().len());
    for value in instrument.values() {
        let bounds = instrument.value_bounds(&value.code).ok_or_else(|| {
            VocaError::Pipeline(format!("no bounds for value '{}'", value.code))
        })?;

        let mut raw_sum = 0;
        for need in instrument.needs_of(&value.code) {
            let score = by_code.get(need.code.as_str()).ok_or_else(|| {
                VocaError::Pipeline(format!("missing score for need '{}'", need.code))
            })?;
            raw_sum += score.raw_score;
        }
        let need_count = bounds.need_count;

        let raw_mean = if need_count == 0 {
            0.0
        } else {
            raw_sum as f64 / need_count as f64
        };

        out.push(ValueScore {
            assessment_id,
            value_code: value.code.clone(),
            raw_sum,
            raw_mean,
            std_score_0_100: std_score_0_100(raw_sum, bounds.min_possible, bounds.max_possible),
            need_count,
        });
    }

    Ok(out)
}
