//! Percentile thresholds over score distributions.

/// The `p`th percentile of `values`, `p` in `[0, 100]`.
///
/// Uses linear interpolation between the two closest ranks, so the 50th
/// percentile of `[1, 2, 3, 4]` is `2.5`. NaN values are ignored. Returns
/// `None` for an empty input or an out-of-range `p`.
pub fn percentile(values: &[f64], p: f64) -> Option<f64> {
    if !(0.0..=100.0).contains(&p) {
        return None;
    }
    let mut finite: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    if finite.is_empty() {
        return None;
    }

    let rank = p / 100.0 * (finite.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let frac = rank - lo as f64;

    let (_, lo_value, upper) = finite.select_nth_unstable_by(lo, f64::total_cmp);
    let lo_value = *lo_value;
    if frac == 0.0 || upper.is_empty() {
        return Some(lo_value);
    }
    let hi_value = upper.iter().copied().fold(f64::INFINITY, f64::min);
    Some(lo_value + (hi_value - lo_value) * frac)
}

/// Score cutoff that keeps the best `top_percent` of a distribution.
///
/// Keeping the top 20% sets the cutoff at the 80th percentile.
pub fn top_percent_threshold(scores: &[f64], top_percent: f64) -> Option<f64> {
    percentile(scores, (100.0 - top_percent).clamp(0.0, 100.0))
}
