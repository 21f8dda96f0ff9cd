//! Sample and date-range types shared by the store, recorder and analysis engine

use chrono::{Local, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Name of the timestamp column in the daily CSV files
pub const TIMESTAMP_FIELD: &str = "timestamp";

pub const CPU_USAGE_PERCENT: &str = "cpu_usage_percent";
pub const GPU_FREQ_MHZ: &str = "gpu_freq_mhz";
pub const GPU_USAGE_PERCENT: &str = "gpu_usage_percent";
pub const MEMORY_TOTAL: &str = "memory_total";
pub const MEMORY_USED: &str = "memory_used";
pub const MEMORY_SWAP_TOTAL: &str = "memory_swap_total";
pub const MEMORY_SWAP_USED: &str = "memory_swap_used";
pub const POWER_CPU: &str = "power_cpu";
pub const POWER_GPU: &str = "power_gpu";
pub const POWER_TOTAL: &str = "power_total";

/// Derived: memory_used / memory_total
pub const RAM_PERCENT: &str = "ram_percent";
/// Derived: memory_swap_used / memory_total
pub const SWAP_PRESSURE_PERCENT: &str = "swap_pressure_percent";

/// Raw columns written by the recorder, in file order (after `timestamp`)
pub const RAW_FIELDS: &[&str] = &[
    CPU_USAGE_PERCENT,
    GPU_FREQ_MHZ,
    GPU_USAGE_PERCENT,
    MEMORY_TOTAL,
    MEMORY_USED,
    MEMORY_SWAP_TOTAL,
    MEMORY_SWAP_USED,
    POWER_CPU,
    POWER_GPU,
    POWER_TOTAL,
];

/// One observation at an instant.
///
/// A column that is present with `None` was recorded but empty or malformed;
/// a column missing from `values` was never captured for this sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Local, timezone-naive time of the observation
    pub timestamp: NaiveDateTime,
    pub values: BTreeMap<String, Option<f64>>,
}

impl Sample {
    pub fn new(timestamp: NaiveDateTime) -> Self {
        Self {
            timestamp,
            values: BTreeMap::new(),
        }
    }

    /// Builder-style setter for a present value
    pub fn with(mut self, name: &str, value: f64) -> Self {
        self.set(name, Some(value));
        self
    }

    /// Set a column; non-finite values are stored as null
    pub fn set(&mut self, name: &str, value: Option<f64>) {
        let value = value.filter(|v| v.is_finite());
        self.values.insert(name.to_string(), value);
    }

    /// Numeric value of a column, `None` when absent, null or non-finite
    pub fn get(&self, name: &str) -> Option<f64> {
        self.values
            .get(name)
            .copied()
            .flatten()
            .filter(|v| v.is_finite())
    }

    /// Whether the column exists for this sample, even if null
    pub fn has_column(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn date(&self) -> NaiveDate {
        self.timestamp.date()
    }
}

/// Inclusive calendar-date span
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// A range covering a single day
    pub fn single(day: NaiveDate) -> Self {
        Self::new(day, day)
    }

    /// Today in local time
    pub fn today() -> Self {
        Self::single(Local::now().date_naive())
    }

    /// Resolve optional command-line bounds.
    ///
    /// No bounds means today; a single bound means that one day.
    pub fn resolve(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        match (start, end) {
            (Some(start), Some(end)) => Self::new(start, end),
            (Some(day), None) | (None, Some(day)) => Self::single(day),
            (None, None) => Self::today(),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.start <= self.end
    }

    pub fn contains(&self, day: NaiveDate) -> bool {
        self.start <= day && day <= self.end
    }

    /// Number of calendar days covered (0 for an inverted range)
    pub fn days(&self) -> i64 {
        if self.is_valid() {
            (self.end - self.start).num_days() + 1
        } else {
            0
        }
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{} to {}", self.start, self.end)
        }
    }
}
