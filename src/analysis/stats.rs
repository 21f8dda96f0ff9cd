//! Distribution summaries
//!
//! Percentiles use linear interpolation between order statistics: the p-th
//! percentile sits at index `p * (n - 1)` of the sorted values. Every
//! statistic is computed from the sorted values, so reordering the input
//! never changes the result, not even in the last bit.

use serde::{Deserialize, Serialize};

use super::series::MetricSeries;

/// Descriptive statistics over the non-null values of one metric
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatsSummary {
    /// Number of non-null values
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    /// 50th percentile
    pub median: f64,
    pub p75: f64,
    pub p95: f64,
    /// Population standard deviation (divides by n)
    pub std_dev: f64,
}

/// Summarize a series; `None` when it has no non-null values
pub fn summarize(series: &MetricSeries) -> Option<StatsSummary> {
    let values: Vec<f64> = series.values().collect();
    summarize_values(&values)
}

/// Summarize raw values; non-finite entries are ignored
pub fn summarize_values(values: &[f64]) -> Option<StatsSummary> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(f64::total_cmp);

    let n = sorted.len() as f64;
    let mean = sorted.iter().sum::<f64>() / n;
    let variance = sorted.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;

    Some(StatsSummary {
        count: sorted.len(),
        min: sorted[0],
        max: sorted[sorted.len() - 1],
        mean,
        median: percentile(&sorted, 0.50)?,
        p75: percentile(&sorted, 0.75)?,
        p95: percentile(&sorted, 0.95)?,
        std_dev: variance.sqrt(),
    })
}

/// Interpolated percentile of already-sorted values, `p` in `0.0..=1.0`
pub fn percentile(sorted: &[f64], p: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let p = p.clamp(0.0, 1.0);
    let rank = p * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;

    let lo = sorted[lower];
    let hi = sorted[upper];
    if lower == upper {
        return Some(lo);
    }
    let frac = rank - lower as f64;
    // Clamp so rounding never pushes the value outside its bracket
    Some((lo + (hi - lo) * frac).clamp(lo, hi))
}
