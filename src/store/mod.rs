//! Sample storage
//!
//! The analysis engine only sees the [`SampleReader`] trait. The daily CSV
//! files written by the recorder are the production implementation;
//! [`MemoryStore`] backs tests and callers that already hold samples.

pub mod csv;

use chrono::NaiveDate;
use std::fmt;
use std::path::PathBuf;

use crate::core::sample::{DateRange, Sample};

pub use self::csv::CsvSampleStore;

/// Errors raised by sample stores
#[derive(Debug, Clone, PartialEq)]
pub enum StoreError {
    /// Nothing backs the requested span
    NoMatchingData { start: NaiveDate, end: NaiveDate },
    /// A file could not be read or written
    Io { path: PathBuf, message: String },
    /// A file exists but is not a sample file
    Malformed { path: PathBuf, message: String },
}

impl StoreError {
    pub fn no_data(range: &DateRange) -> Self {
        StoreError::NoMatchingData {
            start: range.start,
            end: range.end,
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        StoreError::Io {
            path: path.into(),
            message: err.to_string(),
        }
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::NoMatchingData { start, end } => {
                write!(f, "No data files found between {} and {}", start, end)
            }
            StoreError::Io { path, message } => {
                write!(f, "I/O error on {}: {}", path.display(), message)
            }
            StoreError::Malformed { path, message } => {
                write!(f, "Malformed data file {}: {}", path.display(), message)
            }
        }
    }
}

impl std::error::Error for StoreError {}

/// Source of historical samples for a date range.
///
/// Returned samples may come in any order.
pub trait SampleReader {
    fn read(&self, range: &DateRange) -> Result<Vec<Sample>, StoreError>;
}

/// Samples held in memory, filtered by date on read
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    samples: Vec<Sample>,
}

impl MemoryStore {
    pub fn new(samples: Vec<Sample>) -> Self {
        Self { samples }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

impl SampleReader for MemoryStore {
    fn read(&self, range: &DateRange) -> Result<Vec<Sample>, StoreError> {
        let samples: Vec<Sample> = self
            .samples
            .iter()
            .filter(|s| range.contains(s.date()))
            .cloned()
            .collect();
        if samples.is_empty() {
            return Err(StoreError::no_data(range));
        }
        Ok(samples)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2023, 4, d).unwrap()
    }

    #[test]
    fn test_memory_store_filters_by_date() {
        let store = MemoryStore::new(vec![
            Sample::new(day(1).and_hms_opt(23, 59, 59).unwrap()).with("cpu", 1.0),
            Sample::new(day(2).and_hms_opt(0, 0, 0).unwrap()).with("cpu", 2.0),
            Sample::new(day(3).and_hms_opt(12, 0, 0).unwrap()).with("cpu", 3.0),
        ]);

        let read = store.read(&DateRange::single(day(2))).unwrap();
        assert_eq!(read.len(), 1);
        assert_eq!(read[0].get("cpu"), Some(2.0));

        assert_eq!(store.read(&DateRange::new(day(1), day(3))).unwrap().len(), 3);
    }

    #[test]
    fn test_memory_store_no_data() {
        let store = MemoryStore::default();
        let range = DateRange::single(day(5));
        assert_eq!(store.read(&range), Err(StoreError::no_data(&range)));
        assert!(store
            .read(&range)
            .unwrap_err()
            .to_string()
            .contains("2023-04-05"));
    }
}
