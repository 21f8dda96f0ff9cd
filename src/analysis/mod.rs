//! Analysis engine over recorded samples
//!
//! - **derived**: ratio metrics such as RAM% from raw columns
//! - **stats**: min/max/mean/percentiles/std-dev per metric
//! - **heatmap**: day-of-week × hour-of-day averages
//! - **peak**: highest-average fixed-length window
//! - **sufficiency**: p95 - p75 percentile gap
//! - **engine**: composes the above into an [`AnalysisBundle`]

pub mod derived;
pub mod engine;
pub mod heatmap;
pub mod peak;
pub mod series;
pub mod stats;
pub mod sufficiency;

pub use derived::{apply_derived, DerivedMetric};
pub use engine::{analyze_samples, AnalysisBundle, AnalysisEngine, AnalysisError};
pub use heatmap::{build_heatmap, HeatmapGrid};
pub use peak::{detect_peak_window, PeakWindow};
pub use series::{MetricSeries, SeriesPoint};
pub use stats::{percentile, summarize, StatsSummary};
pub use sufficiency::sufficiency_score;
