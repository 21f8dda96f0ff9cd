//! Day-of-week × hour-of-day activity grid

use chrono::{Datelike, Timelike};
use serde::ser::{Serialize, SerializeSeq, Serializer};
use std::collections::BTreeMap;

use super::series::MetricSeries;

pub const DAYS_PER_WEEK: u8 = 7;
pub const HOURS_PER_DAY: u8 = 24;

/// Short names for day indices 0 (Monday) to 6 (Sunday)
pub const DAY_NAMES: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

/// `(day_of_week, hour)` with Monday = 0
pub type BucketKey = (u8, u8);

/// Average value per bucket; buckets without samples are absent, never zero
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeatmapGrid {
    cells: BTreeMap<BucketKey, f64>,
}

#[derive(serde::Serialize)]
struct HeatmapCell {
    day: u8,
    hour: u8,
    value: f64,
}

impl HeatmapGrid {
    pub fn get(&self, day: u8, hour: u8) -> Option<f64> {
        self.cells.get(&(day, hour)).copied()
    }

    pub fn contains(&self, day: u8, hour: u8) -> bool {
        self.cells.contains_key(&(day, hour))
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (BucketKey, f64)> + '_ {
        self.cells.iter().map(|(k, v)| (*k, *v))
    }

    /// Smallest and largest bucket average
    pub fn value_range(&self) -> Option<(f64, f64)> {
        let mut values = self.cells.values().copied();
        let first = values.next()?;
        Some(values.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v))))
    }
}

impl Serialize for HeatmapGrid {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.cells.len()))?;
        for (&(day, hour), &value) in &self.cells {
            seq.serialize_element(&HeatmapCell { day, hour, value })?;
        }
        seq.end()
    }
}

/// Bucket key for a timestamp
pub fn bucket_of(timestamp: &chrono::NaiveDateTime) -> BucketKey {
    (
        timestamp.weekday().num_days_from_monday() as u8,
        timestamp.hour() as u8,
    )
}

/// Average the non-null values of `series` per (weekday, hour).
///
/// Buckets aggregate the same weekday and hour across every week present.
pub fn build_heatmap(series: &MetricSeries) -> HeatmapGrid {
    let mut sums: BTreeMap<BucketKey, (f64, usize)> = BTreeMap::new();
    for (timestamp, value) in series.present() {
        let entry = sums.entry(bucket_of(&timestamp)).or_insert((0.0, 0));
        entry.0 += value;
        entry.1 += 1;
    }

    HeatmapGrid {
        cells: sums
            .into_iter()
            .map(|(key, (sum, count))| (key, sum / count as f64))
            .collect(),
    }
}
