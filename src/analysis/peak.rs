//! Peak-usage window detection
//!
//! Windows are anchored at observed samples and cover the closed interval
//! `[anchor, anchor + length]`. Only anchors whose whole window lies inside
//! the recorded span compete; a series shorter than one window is treated as
//! a single window starting at its first sample.

use chrono::{Duration, NaiveDateTime};
use serde::Serialize;
use std::collections::VecDeque;

use super::series::MetricSeries;

/// Highest-average window of one metric
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PeakWindow {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub average: f64,
    pub max: f64,
    /// Non-null samples inside the window
    pub sample_count: usize,
}

impl PeakWindow {
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}

/// Find the window of `length` with the highest average.
///
/// Returns `None` when the series has no non-null values. Exact ties go to
/// the earliest start.
pub fn detect_peak_window(series: &MetricSeries, length: Duration) -> Option<PeakWindow> {
    let points = series.present();
    let (last_ts, _) = *points.last()?;
    let length = length.max(Duration::zero());

    let fits = |anchor: NaiveDateTime| anchor + length <= last_ts;
    let whole_series = !fits(points[0].0);

    let mut best: Option<PeakWindow> = None;
    let mut end = 0usize;
    // indices inside the current window with strictly decreasing values
    let mut maxima: VecDeque<usize> = VecDeque::new();

    for start in 0..points.len() {
        let anchor = points[start].0;
        if start > 0 && (whole_series || !fits(anchor)) {
            break;
        }

        let limit = anchor + length;
        while end < points.len() && (whole_series || points[end].0 <= limit) {
            while maxima.back().is_some_and(|&i| points[i].1 <= points[end].1) {
                maxima.pop_back();
            }
            maxima.push_back(end);
            end += 1;
        }
        while maxima.front().is_some_and(|&i| i < start) {
            maxima.pop_front();
        }

        // Samples sharing the previous anchor's timestamp already started a window
        if start > 0 && points[start - 1].0 == anchor {
            continue;
        }

        let count = end - start;
        // Summed per window so equal windows give bit-identical averages
        let average = points[start..end].iter().map(|(_, v)| v).sum::<f64>() / count as f64;
        let max = maxima.front().map(|&i| points[i].1).unwrap_or(average);

        if best.map_or(true, |b| average > b.average) {
            best = Some(PeakWindow {
                start: anchor,
                end: anchor + length,
                average,
                max,
                sample_count: count,
            });
        }
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::sample::Sample;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2023, 4, 1)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn series(points: &[(NaiveDateTime, f64)]) -> MetricSeries {
        let samples: Vec<Sample> = points
            .iter()
            .map(|(ts, v)| Sample::new(*ts).with("cpu", *v))
            .collect();
        MetricSeries::from_samples("cpu", &samples)
    }

    fn window() -> Duration {
        Duration::minutes(15)
    }

    #[test]
    fn test_single_window_span() {
        let s = series(&[
            (at(10, 0), 20.0),
            (at(10, 5), 80.0),
            (at(10, 10), 90.0),
            (at(10, 15), 85.0),
        ]);
        let peak = detect_peak_window(&s, window()).unwrap();
        assert_eq!(peak.start, at(10, 0));
        assert_eq!(peak.end, at(10, 15));
        assert!((peak.average - 68.75).abs() < 1e-9);
        assert_eq!(peak.max, 90.0);
        assert_eq!(peak.sample_count, 4);
    }

    #[test]
    fn test_short_series_is_one_window() {
        let s = series(&[(at(10, 0), 10.0), (at(10, 3), 30.0)]);
        let peak = detect_peak_window(&s, window()).unwrap();
        assert_eq!(peak.start, at(10, 0));
        assert!((peak.average - 20.0).abs() < 1e-9);
        assert_eq!(peak.max, 30.0);
        assert_eq!(peak.duration(), window());
    }

    #[test]
    fn test_finds_busiest_window() {
        let mut points = Vec::new();
        for m in 0..60 {
            let value = if (20..=35).contains(&m) { 90.0 } else { 10.0 };
            points.push((at(9, m), value));
        }
        points.push((at(10, 0), 10.0));

        let peak = detect_peak_window(&series(&points), window()).unwrap();
        assert_eq!(peak.start, at(9, 20));
        assert_eq!(peak.average, 90.0);
        assert_eq!(peak.max, 90.0);
        assert_eq!(peak.sample_count, 16);
    }

    #[test]
    fn test_tie_goes_to_earliest() {
        let s = series(&[
            (at(8, 0), 50.0),
            (at(8, 15), 50.0),
            (at(8, 30), 50.0),
            (at(8, 45), 50.0),
        ]);
        let peak = detect_peak_window(&s, window()).unwrap();
        assert_eq!(peak.start, at(8, 0));
    }

    #[test]
    fn test_tie_with_inexact_values() {
        // one sample per window; 0.1 has no exact binary form
        let s = series(&[
            (at(8, 0), 0.1),
            (at(8, 20), 0.1),
            (at(8, 40), 0.1),
            (at(9, 0), 0.1),
            (at(9, 20), 0.1),
            (at(9, 40), 0.1),
        ]);
        let peak = detect_peak_window(&s, window()).unwrap();
        assert_eq!(peak.start, at(8, 0));
        assert_eq!(peak.average, 0.1);
        assert_eq!(peak.sample_count, 1);
    }

    #[test]
    fn test_reordering_invariance() {
        let points = vec![
            (at(8, 0), 5.0),
            (at(8, 7), 70.0),
            (at(8, 14), 65.0),
            (at(8, 21), 20.0),
            (at(8, 28), 95.0),
            (at(8, 35), 10.0),
            (at(8, 42), 10.0),
        ];
        let mut shuffled = points.clone();
        shuffled.swap(0, 5);
        shuffled.swap(2, 6);
        shuffled.reverse();

        assert_eq!(
            detect_peak_window(&series(&points), window()),
            detect_peak_window(&series(&shuffled), window())
        );
    }

    #[test]
    fn test_duplicate_timestamps_share_window() {
        let s = series(&[
            (at(8, 0), 10.0),
            (at(8, 0), 90.0),
            (at(8, 10), 50.0),
            (at(8, 15), 50.0),
            (at(8, 30), 0.0),
        ]);
        let peak = detect_peak_window(&s, window()).unwrap();
        assert_eq!(peak.start, at(8, 0));
        assert_eq!(peak.sample_count, 4);
        assert!((peak.average - 50.0).abs() < 1e-9);
        assert_eq!(peak.max, 90.0);
    }

    #[test]
    fn test_gaps_do_not_shift_boundaries() {
        let mut gap = Sample::new(at(8, 10));
        gap.set("cpu", None);
        let samples = vec![
            Sample::new(at(8, 0)).with("cpu", 40.0),
            gap,
            Sample::new(at(8, 20)).with("cpu", 80.0),
            Sample::new(at(8, 40)).with("cpu", 20.0),
        ];
        let peak = detect_peak_window(&MetricSeries::from_samples("cpu", &samples), window())
            .unwrap();
        // 08:20 + 15m fits before 08:40 and holds only the 80% sample
        assert_eq!(peak.start, at(8, 20));
        assert_eq!(peak.sample_count, 1);
        assert_eq!(peak.average, 80.0);
    }

    #[test]
    fn test_no_values_is_undefined() {
        let mut s = Sample::new(at(8, 0));
        s.set("cpu", None);
        assert_eq!(
            detect_peak_window(&MetricSeries::from_samples("cpu", &[s]), window()),
            None
        );
        assert_eq!(detect_peak_window(&series(&[]), window()), None);
    }
}
