//! mactop Usage Reports
//!
//! Records the hardware-utilization samples served by `mactop -p PORT` into
//! daily CSV files and analyzes the recorded history.
//!
//! ## Features
//!
//! - **Recorder**: polls mactop's Prometheus endpoint and appends batches
//! - **Statistics**: min/max/mean/median/p75/p95/std-dev per metric
//! - **Heatmaps**: weekday × hour average usage
//! - **Peak Windows**: busiest fixed-length window per metric
//! - **Sufficiency**: p95 - p75 gap telling sustained load from bursts
//!
//! ## Undefined results
//!
//! A metric with no values yields `None` in every map of the
//! [`AnalysisBundle`]; it is never reported as zero.

pub mod analysis;
pub mod core;
pub mod recorder;
pub mod report;
pub mod store;

// Re-exports
pub use analysis::{AnalysisBundle, AnalysisEngine, AnalysisError};
pub use core::config::{AnalysisConfig, ConfigError, ReportConfig};
pub use core::sample::{DateRange, Sample};
pub use recorder::{Companion, MetricsClient, RecorderError, RecordingSession};
pub use report::{render_dashboard, render_plain};
pub use store::{CsvSampleStore, SampleReader, StoreError};
