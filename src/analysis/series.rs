//! Per-metric projection of a sample set

use chrono::NaiveDateTime;
use std::cmp::Ordering;

use crate::core::sample::Sample;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesPoint {
    pub timestamp: NaiveDateTime,
    /// `None` keeps the slot of a null observation
    pub value: Option<f64>,
}

/// One metric's values ordered by timestamp
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSeries {
    pub name: String,
    pub points: Vec<SeriesPoint>,
    /// Whether any sample carried the column at all
    pub captured: bool,
}

impl MetricSeries {
    /// Project `name` out of `samples`, sorted by timestamp.
    ///
    /// Equal timestamps are ordered by value so the result does not depend on
    /// the input order.
    pub fn from_samples(name: &str, samples: &[Sample]) -> Self {
        let mut points: Vec<SeriesPoint> = samples
            .iter()
            .map(|s| SeriesPoint {
                timestamp: s.timestamp,
                value: s.get(name),
            })
            .collect();
        points.sort_by(compare_points);

        Self {
            name: name.to_string(),
            points,
            captured: samples.iter().any(|s| s.has_column(name)),
        }
    }

    /// Build directly from points (tests, callers with pre-projected data)
    pub fn from_points(name: &str, mut points: Vec<SeriesPoint>) -> Self {
        points.sort_by(compare_points);
        Self {
            name: name.to_string(),
            points,
            captured: true,
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Non-null values in timestamp order
    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.points.iter().filter_map(|p| p.value)
    }

    /// Non-null `(timestamp, value)` pairs in timestamp order
    pub fn present(&self) -> Vec<(NaiveDateTime, f64)> {
        self.points
            .iter()
            .filter_map(|p| p.value.map(|v| (p.timestamp, v)))
            .collect()
    }

    pub fn non_null_count(&self) -> usize {
        self.points.iter().filter(|p| p.value.is_some()).count()
    }
}

fn compare_points(a: &SeriesPoint, b: &SeriesPoint) -> Ordering {
    a.timestamp.cmp(&b.timestamp).then_with(|| match (a.value, b.value) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    })
}
