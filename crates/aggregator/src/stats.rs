use cloudping_records::LatencyStats;

/// Percentile of `sorted` (ascending) with linear interpolation between the
/// closest ranks. `None` for an empty slice.
#[must_use]
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn percentile(sorted: &[f64], p: f64) -> Option<f64> {
    let last = sorted.len().checked_sub(1)?;
    let rank = (p.clamp(0.0, 100.0) / 100.0) * last as f64;
    let lower = sorted[rank.floor() as usize];
    let upper = sorted[rank.ceil() as usize];

    Some(lower + (upper - lower) * rank.fract())
}

/// Mean and percentiles of `values`, or `None` when there are none.
#[allow(clippy::cast_precision_loss)]
pub fn summarize(mut values: Vec<f64>) -> Option<LatencyStats> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);

    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let at = |p| percentile(&values, p);

    Some(LatencyStats {
        mean,
        p_10: at(10.0)?,
        p_25: at(25.0)?,
        p_50: at(50.0)?,
        p_75: at(75.0)?,
        p_90: at(90.0)?,
        p_98: at(98.0)?,
        p_99: at(99.0)?,
    })
}
