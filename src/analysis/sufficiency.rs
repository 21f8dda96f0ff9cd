//! Utilization-sufficiency score

use super::stats::StatsSummary;

/// Percentile gap `p95 - p75` in the metric's own units.
///
/// A wide gap means bursty, mostly idle usage; a narrow one means sustained
/// load. Undefined when the summary is.
pub fn sufficiency_score(summary: Option<&StatsSummary>) -> Option<f64> {
    summary.map(|s| s.p95 - s.p75)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::stats::summarize_values;

    #[test]
    fn test_gap() {
        let stats = summarize_values(&[10.0, 20.0, 30.0, 40.0]).unwrap();
        let score = sufficiency_score(Some(&stats)).unwrap();
        assert_eq!(score, stats.p95 - stats.p75);
        assert!((score - 6.0).abs() < 1e-9);
    }

    #[test]
    fn test_constant_series_has_zero_gap() {
        let stats = summarize_values(&[55.5; 8]).unwrap();
        assert_eq!(sufficiency_score(Some(&stats)), Some(0.0));
    }

    #[test]
    fn test_undefined() {
        assert_eq!(sufficiency_score(None), None);
    }
}
