//! Rankings and occupation profiles for the reference instrument.

use vocamatch_common::{Instrument, NeedScore, OccupationProfile};

pub fn reference_instrument() -> Instrument {
    Instrument::reference()
}

/// One ranking per round, consistent with a global preference order.
///
/// Needs earlier in `preference` rank higher; needs not listed keep
/// instrument order after the listed ones.
pub fn rankings_for_preference(instrument: &Instrument, preference: &[&str]) -> Vec<(u32, Vec<String>)> {
    let position = |code: &str| {
        preference
            .iter()
            .position(|p| *p == code)
            .unwrap_or(preference.len() + instrument.need_position(code).unwrap_or(0))
    };
    instrument
        .rounds()
        .iter()
        .map(|round| {
            let mut ranking = round.needs.clone();
            ranking.sort_by_key(|code| position(code));
            (round.index, ranking)
        })
        .collect()
}

/// Rankings where the first need in instrument order is most important.
pub fn rankings_by_need_order(instrument: &Instrument) -> Vec<(u32, Vec<String>)> {
    let order: Vec<&str> = instrument.needs().iter().map(|n| n.code.as_str()).collect();
    rankings_for_preference(instrument, &order)
}

/// Rankings that echo each round's configured order.
///
/// On the reference design every need then collects each point value once,
/// so all raw scores are zero and the subject vector is flat.
pub fn rankings_in_config_order(instrument: &Instrument) -> Vec<(u32, Vec<String>)> {
    instrument
        .rounds()
        .iter()
        .map(|r| (r.index, r.needs.clone()))
        .collect()
}

/// Profile with the given scores in instrument need order.
pub fn profile_from_values(
    instrument: &Instrument,
    code: &str,
    title: &str,
    job_zone: u8,
    values: &[f64],
) -> OccupationProfile {
    instrument
        .needs()
        .iter()
        .zip(values)
        .fold(OccupationProfile::new(code, title, job_zone), |p, (need, v)| {
            p.with_score(need.code.clone(), *v)
        })
}

/// Profile whose reference vector equals a subject's need scores.
pub fn profile_matching(need_scores: &[NeedScore], code: &str, job_zone: u8) -> OccupationProfile {
    need_scores
        .iter()
        .fold(OccupationProfile::new(code, code, job_zone), |p, s| {
            p.with_score(s.need_code.clone(), s.std_score_0_100)
        })
}

/// A small mixed catalog: rising, falling, flat and zig-zag profiles.
pub fn sample_profiles(instrument: &Instrument) -> Vec<OccupationProfile> {
    let n = instrument.needs().len();
    let falling: Vec<f64> = (0..n).map(|i| 100.0 - i as f64 * 100.0 / (n - 1) as f64).collect();
    let rising: Vec<f64> = falling.iter().rev().copied().collect();
    let flat = vec![50.0; n];
    let zigzag: Vec<f64> = (0..n).map(|i| if i % 2 == 0 { 80.0 } else { 20.0 }).collect();
    let mostly_falling: Vec<f64> = falling
        .iter()
        .enumerate()
        .map(|(i, v)| if i % 5 == 0 { 50.0 } else { *v })
        .collect();

    vec![
        profile_from_values(instrument, "11-1021.00", "General and Operations Managers", 4, &falling),
        profile_from_values(instrument, "15-1252.00", "Software Developers", 4, &mostly_falling),
        profile_from_values(instrument, "35-2014.00", "Cooks, Restaurant", 2, &rising),
        profile_from_values(instrument, "43-4051.00", "Customer Service Representatives", 2, &flat),
        profile_from_values(instrument, "47-2031.00", "Carpenters", 2, &zigzag),
        profile_from_values(instrument, "29-1141.00", "Registered Nurses", 3, &falling),
    ]
}
