//! Analysis orchestrator
//!
//! Reads the samples of a date range, derives ratio metrics and computes the
//! statistics, heatmap, peak window and sufficiency score of every requested
//! metric. A metric whose column was never captured is reported as undefined
//! across the board instead of failing the whole analysis.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, info, warn};

use super::derived::apply_derived;
use super::heatmap::{build_heatmap, HeatmapGrid};
use super::peak::{detect_peak_window, PeakWindow};
use super::series::MetricSeries;
use super::stats::{summarize, StatsSummary};
use super::sufficiency::sufficiency_score;
use crate::core::config::AnalysisConfig;
use crate::core::sample::{DateRange, Sample};
use crate::store::{SampleReader, StoreError};

/// Errors that abort an analysis
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisError {
    /// No samples exist for the requested span
    NoData {
        start: chrono::NaiveDate,
        end: chrono::NaiveDate,
    },
    /// Start date after end date
    InvalidRange {
        start: chrono::NaiveDate,
        end: chrono::NaiveDate,
    },
    /// The store failed for another reason
    Store(StoreError),
}

impl fmt::Display for AnalysisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalysisError::NoData { start, end } if start == end => {
                write!(f, "No data for {}", start)
            }
            AnalysisError::NoData { start, end } => {
                write!(f, "No data between {} and {}", start, end)
            }
            AnalysisError::InvalidRange { start, end } => {
                write!(f, "Start date {} is after end date {}", start, end)
            }
            AnalysisError::Store(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for AnalysisError {}

impl From<StoreError> for AnalysisError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NoMatchingData { start, end } => AnalysisError::NoData { start, end },
            other => AnalysisError::Store(other),
        }
    }
}

/// Complete result of one analysis.
///
/// Every map holds an entry for each metric it covers; `None` marks an
/// undefined result and is never a stand-in for zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisBundle {
    pub requested_range: DateRange,
    /// Dates of the earliest and latest sample actually read
    pub covered_range: DateRange,
    pub total_records: usize,
    /// Primary metrics analyzed, in request order
    pub metrics: Vec<String>,
    /// Primary metrics whose column never appeared in the data
    pub unavailable: Vec<String>,
    /// Primary metrics plus the raw inputs of requested derived metrics
    pub statistics: BTreeMap<String, Option<StatsSummary>>,
    pub heatmaps: BTreeMap<String, Option<HeatmapGrid>>,
    pub peaks: BTreeMap<String, Option<PeakWindow>>,
    pub sufficiency: BTreeMap<String, Option<f64>>,
}

impl AnalysisBundle {
    pub fn summary(&self, metric: &str) -> Option<&StatsSummary> {
        self.statistics.get(metric).and_then(Option::as_ref)
    }

    pub fn heatmap(&self, metric: &str) -> Option<&HeatmapGrid> {
        self.heatmaps.get(metric).and_then(Option::as_ref)
    }

    pub fn peak(&self, metric: &str) -> Option<&PeakWindow> {
        self.peaks.get(metric).and_then(Option::as_ref)
    }

    pub fn score(&self, metric: &str) -> Option<f64> {
        self.sufficiency.get(metric).copied().flatten()
    }

    /// Whether some metric came out undefined
    pub fn has_undefined(&self) -> bool {
        self.statistics.values().any(Option::is_none)
    }
}

/// Analysis engine bound to a sample source
pub struct AnalysisEngine<R> {
    config: AnalysisConfig,
    reader: R,
}

impl<R: SampleReader> AnalysisEngine<R> {
    pub fn new(config: AnalysisConfig, reader: R) -> Self {
        Self { config, reader }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Analyze a date range (today when `None`) for the given metrics
    /// (the configured primary metrics when `None`).
    pub fn analyze(
        &self,
        range: Option<DateRange>,
        metrics: Option<&[String]>,
    ) -> Result<AnalysisBundle, AnalysisError> {
        let range = range.unwrap_or_else(DateRange::today);
        if !range.is_valid() {
            return Err(AnalysisError::InvalidRange {
                start: range.start,
                end: range.end,
            });
        }

        let samples = self.reader.read(&range)?;
        info!("Loaded {} samples for {}", samples.len(), range);

        let metrics = metrics.unwrap_or(self.config.primary_metrics.as_slice());
        analyze_samples(&self.config, &samples, range, metrics)
    }
}

/// Run the analysis over samples already in memory
pub fn analyze_samples(
    config: &AnalysisConfig,
    samples: &[Sample],
    requested_range: DateRange,
    metrics: &[String],
) -> Result<AnalysisBundle, AnalysisError> {
    let (first, last) = match (
        samples.iter().map(|s| s.timestamp).min(),
        samples.iter().map(|s| s.timestamp).max(),
    ) {
        (Some(first), Some(last)) => (first, last),
        _ => {
            return Err(AnalysisError::NoData {
                start: requested_range.start,
                end: requested_range.end,
            })
        }
    };

    let samples = apply_derived(samples, &config.derived_metrics);

    let mut bundle = AnalysisBundle {
        requested_range,
        covered_range: DateRange::new(first.date(), last.date()),
        total_records: samples.len(),
        metrics: dedup(metrics.iter().cloned()),
        unavailable: Vec::new(),
        statistics: BTreeMap::new(),
        heatmaps: BTreeMap::new(),
        peaks: BTreeMap::new(),
        sufficiency: BTreeMap::new(),
    };

    for metric in bundle.metrics.clone() {
        let series = MetricSeries::from_samples(&metric, &samples);
        if !series.captured {
            warn!("Metric '{}' not found in the data", metric);
            bundle.unavailable.push(metric.clone());
        }
        debug!(
            "Analyzing {} ({} of {} values present)",
            metric,
            series.non_null_count(),
            series.len()
        );

        let summary = summarize(&series);
        let heatmap = summary.map(|_| build_heatmap(&series));
        let peak = detect_peak_window(&series, config.peak_window);

        bundle.heatmaps.insert(metric.clone(), heatmap);
        bundle.peaks.insert(metric.clone(), peak);
        bundle.sufficiency.insert(metric.clone(), sufficiency_score(summary.as_ref()));
        bundle.statistics.insert(metric, summary);
    }

    // Raw inputs behind the requested derived metrics
    let inputs = config
        .derived_metrics
        .iter()
        .filter(|d| bundle.metrics.contains(&d.output))
        .flat_map(|d| [d.numerator.clone(), d.denominator.clone()]);
    for metric in dedup(inputs) {
        if bundle.statistics.contains_key(&metric) {
            continue;
        }
        let summary = summarize(&MetricSeries::from_samples(&metric, &samples));
        bundle.sufficiency.insert(metric.clone(), sufficiency_score(summary.as_ref()));
        bundle.statistics.insert(metric, summary);
    }

    Ok(bundle)
}

fn dedup(names: impl Iterator<Item = String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for name in names {
        if !out.contains(&name) {
            out.push(name);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::sample::{
        CPU_USAGE_PERCENT, GPU_USAGE_PERCENT, MEMORY_SWAP_USED, MEMORY_TOTAL, MEMORY_USED,
        RAM_PERCENT, SWAP_PRESSURE_PERCENT,
    };
    use crate::store::MemoryStore;
    use chrono::{NaiveDate, NaiveDateTime};
    use std::cell::Cell;

    // 2023-04-03 is a Monday
    fn at(day: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2023, 4, day)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn monday() -> DateRange {
        DateRange::single(NaiveDate::from_ymd_opt(2023, 4, 3).unwrap())
    }

    fn full_sample(ts: NaiveDateTime, cpu: f64, used: f64) -> Sample {
        Sample::new(ts)
            .with(CPU_USAGE_PERCENT, cpu)
            .with(GPU_USAGE_PERCENT, cpu / 2.0)
            .with(MEMORY_USED, used)
            .with(MEMORY_TOTAL, 16.0)
            .with(MEMORY_SWAP_USED, 1.0)
    }

    fn engine(samples: Vec<Sample>) -> AnalysisEngine<MemoryStore> {
        AnalysisEngine::new(AnalysisConfig::default(), MemoryStore::new(samples))
    }

    #[test]
    fn test_full_analysis() {
        let bundle = engine(vec![
            full_sample(at(3, 10, 0), 20.0, 8.0),
            full_sample(at(3, 10, 5), 80.0, 12.0),
            full_sample(at(3, 10, 10), 90.0, 8.0),
            full_sample(at(3, 10, 15), 85.0, 12.0),
        ])
        .analyze(Some(monday()), None)
        .unwrap();

        assert_eq!(bundle.total_records, 4);
        assert_eq!(bundle.covered_range, monday());
        assert!(bundle.unavailable.is_empty());
        assert!(!bundle.has_undefined());

        let cpu = bundle.summary(CPU_USAGE_PERCENT).unwrap();
        assert_eq!(cpu.min, 20.0);
        assert_eq!(cpu.max, 90.0);

        let ram = bundle.summary(RAM_PERCENT).unwrap();
        assert_eq!(ram.min, 50.0);
        assert_eq!(ram.max, 75.0);
        assert_eq!(bundle.summary(SWAP_PRESSURE_PERCENT).unwrap().mean, 6.25);

        // raw inputs of the derived metrics are summarized too
        assert!(bundle.summary(MEMORY_USED).is_some());
        assert!(bundle.summary(MEMORY_TOTAL).is_some());
        assert!(bundle.summary(MEMORY_SWAP_USED).is_some());
        assert!(!bundle.heatmaps.contains_key(MEMORY_USED));

        let peak = bundle.peak(CPU_USAGE_PERCENT).unwrap();
        assert_eq!(peak.start, at(3, 10, 0));
        assert!((peak.average - 68.75).abs() < 1e-9);
        assert_eq!(peak.max, 90.0);

        let heatmap = bundle.heatmap(CPU_USAGE_PERCENT).unwrap();
        assert_eq!(heatmap.len(), 1);
        assert!((heatmap.get(0, 10).unwrap() - 68.75).abs() < 1e-9);

        assert_eq!(
            bundle.score(CPU_USAGE_PERCENT),
            Some(cpu.p95 - cpu.p75)
        );
    }

    #[test]
    fn test_missing_memory_columns_are_undefined() {
        let samples = vec![
            Sample::new(at(3, 9, 0))
                .with(CPU_USAGE_PERCENT, 10.0)
                .with(GPU_USAGE_PERCENT, 5.0),
            Sample::new(at(3, 9, 1))
                .with(CPU_USAGE_PERCENT, 30.0)
                .with(GPU_USAGE_PERCENT, 15.0),
        ];
        let bundle = engine(samples).analyze(Some(monday()), None).unwrap();

        assert!(bundle.summary(CPU_USAGE_PERCENT).is_some());
        assert!(bundle.summary(GPU_USAGE_PERCENT).is_some());
        assert!(bundle.peak(GPU_USAGE_PERCENT).is_some());

        for metric in [RAM_PERCENT, SWAP_PRESSURE_PERCENT] {
            // explicit undefined entries, not missing keys
            assert_eq!(bundle.statistics.get(metric), Some(&None));
            assert_eq!(bundle.heatmaps.get(metric), Some(&None));
            assert_eq!(bundle.peaks.get(metric), Some(&None));
            assert_eq!(bundle.sufficiency.get(metric), Some(&None));
        }
        assert_eq!(
            bundle.unavailable,
            vec![RAM_PERCENT.to_string(), SWAP_PRESSURE_PERCENT.to_string()]
        );
        assert!(bundle.has_undefined());
    }

    #[test]
    fn test_no_data_skips_computation() {
        struct CountingReader(Cell<usize>);
        impl SampleReader for CountingReader {
            fn read(&self, range: &DateRange) -> Result<Vec<Sample>, StoreError> {
                self.0.set(self.0.get() + 1);
                Err(StoreError::no_data(range))
            }
        }

        let engine = AnalysisEngine::new(AnalysisConfig::default(), CountingReader(Cell::new(0)));
        let result = engine.analyze(Some(monday()), None);
        assert_eq!(
            result,
            Err(AnalysisError::NoData {
                start: monday().start,
                end: monday().end,
            })
        );
        assert_eq!(engine.reader.0.get(), 1);
    }

    #[test]
    fn test_empty_read_is_no_data() {
        struct EmptyReader;
        impl SampleReader for EmptyReader {
            fn read(&self, _: &DateRange) -> Result<Vec<Sample>, StoreError> {
                Ok(Vec::new())
            }
        }

        let engine = AnalysisEngine::new(AnalysisConfig::default(), EmptyReader);
        assert!(matches!(
            engine.analyze(Some(monday()), None),
            Err(AnalysisError::NoData { .. })
        ));
    }

    #[test]
    fn test_invalid_range() {
        let range = DateRange::new(
            NaiveDate::from_ymd_opt(2023, 4, 5).unwrap(),
            NaiveDate::from_ymd_opt(2023, 4, 3).unwrap(),
        );
        assert!(matches!(
            engine(vec![]).analyze(Some(range), None),
            Err(AnalysisError::InvalidRange { .. })
        ));
    }

    #[test]
    fn test_explicit_metric_list() {
        let samples = vec![full_sample(at(3, 9, 0), 10.0, 8.0)];
        let metrics = vec![CPU_USAGE_PERCENT.to_string(), CPU_USAGE_PERCENT.to_string()];
        let bundle = engine(samples)
            .analyze(Some(monday()), Some(metrics.as_slice()))
            .unwrap();

        assert_eq!(bundle.metrics, vec![CPU_USAGE_PERCENT.to_string()]);
        assert_eq!(bundle.statistics.len(), 1);
        assert_eq!(bundle.heatmaps.len(), 1);
    }

    #[test]
    fn test_reordered_input_gives_same_bundle() {
        let samples = vec![
            full_sample(at(3, 9, 0), 10.0, 4.0),
            full_sample(at(3, 9, 20), 70.0, 8.0),
            full_sample(at(3, 9, 40), 40.0, 12.0),
            full_sample(at(3, 11, 0), 95.0, 16.0),
            full_sample(at(4, 11, 0), 5.0, 0.0),
        ];
        let mut reversed = samples.clone();
        reversed.reverse();
        let range = DateRange::new(monday().start, NaiveDate::from_ymd_opt(2023, 4, 4).unwrap());

        let a = engine(samples).analyze(Some(range), None).unwrap();
        let b = engine(reversed).analyze(Some(range), None).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.covered_range, range);
    }

    #[test]
    fn test_error_messages() {
        let day = NaiveDate::from_ymd_opt(2023, 4, 3).unwrap();
        let err = AnalysisError::from(StoreError::NoMatchingData { start: day, end: day });
        assert_eq!(err.to_string(), "No data for 2023-04-03");

        let io = StoreError::Io {
            path: "/x".into(),
            message: "denied".into(),
        };
        assert_eq!(AnalysisError::from(io.clone()), AnalysisError::Store(io));
    }
}
