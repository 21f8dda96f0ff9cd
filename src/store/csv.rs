//! Daily CSV files
//!
//! One file per calendar day, named `mactop_data_YYYY-MM-DD.csv`, with a
//! header row followed by one row per sample. Fields are plain numbers, so
//! no quoting is needed.

use chrono::{NaiveDate, NaiveDateTime};
use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::{SampleReader, StoreError};
use crate::core::sample::{DateRange, Sample, RAW_FIELDS, TIMESTAMP_FIELD};

const FILE_PREFIX: &str = "mactop_data_";
const FILE_SUFFIX: &str = ".csv";

/// Format written by the recorder
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const ISO_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// Store over a directory of daily CSV files
#[derive(Debug, Clone)]
pub struct CsvSampleStore {
    data_dir: PathBuf,
}

impl CsvSampleStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// Create the store, making sure its directory exists
    pub fn open(data_dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let store = Self::new(data_dir);
        fs::create_dir_all(&store.data_dir).map_err(|e| StoreError::io(&store.data_dir, e))?;
        Ok(store)
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Path of the file holding `date`'s samples
    pub fn daily_path(&self, date: NaiveDate) -> PathBuf {
        self.data_dir
            .join(format!("{}{}{}", FILE_PREFIX, date.format("%Y-%m-%d"), FILE_SUFFIX))
    }

    /// Date embedded in a daily file name, if it is one
    pub fn parse_file_date(file_name: &str) -> Option<NaiveDate> {
        let date = file_name
            .strip_prefix(FILE_PREFIX)?
            .strip_suffix(FILE_SUFFIX)?;
        NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()
    }

    /// Daily files whose date falls within `range`, oldest first
    pub fn find_files(&self, range: &DateRange) -> Result<Vec<(NaiveDate, PathBuf)>, StoreError> {
        let entries = match fs::read_dir(&self.data_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::io(&self.data_dir, e)),
        };

        let mut files: Vec<(NaiveDate, PathBuf)> = entries
            .flatten()
            .filter_map(|entry| {
                let path = entry.path();
                let date = Self::parse_file_date(path.file_name()?.to_str()?)?;
                range.contains(date).then_some((date, path))
            })
            .collect();
        files.sort();
        Ok(files)
    }

    /// Parse one daily file
    pub fn read_file(path: &Path) -> Result<Vec<Sample>, StoreError> {
        let file = fs::File::open(path).map_err(|e| StoreError::io(path, e))?;
        let mut lines = BufReader::new(file).split(b'\n');
        let mut invalid_utf8 = 0usize;
        let mut decode = |bytes: Vec<u8>| match String::from_utf8(bytes) {
            Ok(line) => line,
            Err(e) => {
                invalid_utf8 += 1;
                String::from_utf8_lossy(e.as_bytes()).into_owned()
            }
        };

        let header: Vec<String> = match lines.next() {
            Some(line) => decode(line.map_err(|e| StoreError::io(path, e))?)
                .split(',')
                .map(|c| c.trim().to_string())
                .collect(),
            None => return Ok(Vec::new()),
        };
        let ts_index = header
            .iter()
            .position(|c| c == TIMESTAMP_FIELD)
            .ok_or_else(|| StoreError::Malformed {
                path: path.to_path_buf(),
                message: "missing timestamp column".into(),
            })?;

        let mut samples = Vec::new();
        let mut skipped = 0usize;
        for line in lines {
            let line = decode(line.map_err(|e| StoreError::io(path, e))?);
            if line.trim().is_empty() {
                continue;
            }
            let fields: Vec<&str> = line.split(',').map(str::trim).collect();

            let timestamp = match fields.get(ts_index).and_then(|f| parse_timestamp(f)) {
                Some(ts) => ts,
                None => {
                    skipped += 1;
                    continue;
                }
            };

            let mut sample = Sample::new(timestamp);
            for (index, column) in header.iter().enumerate() {
                if index == ts_index || column.is_empty() {
                    continue;
                }
                let value = fields.get(index).and_then(|f| f.parse::<f64>().ok());
                sample.set(column, value);
            }
            samples.push(sample);
        }

        if skipped > 0 {
            warn!("{}: skipped {} rows with unreadable timestamps", path.display(), skipped);
        }
        if invalid_utf8 > 0 {
            warn!("{}: {} rows contained invalid UTF-8", path.display(), invalid_utf8);
        }
        Ok(samples)
    }

    /// Write the header row when the file is missing or empty
    pub fn ensure_header(path: &Path) -> Result<(), StoreError> {
        let empty = match fs::metadata(path) {
            Ok(meta) => meta.len() == 0,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => true,
            Err(e) => return Err(StoreError::io(path, e)),
        };
        if empty {
            fs::write(path, format!("{}\n", header_row())).map_err(|e| StoreError::io(path, e))?;
            debug!("Created data file {}", path.display());
        }
        Ok(())
    }

    /// Append samples, each to the file of its own date. Returns rows written.
    pub fn append(&self, samples: &[Sample]) -> Result<usize, StoreError> {
        let mut by_day: BTreeMap<NaiveDate, Vec<&Sample>> = BTreeMap::new();
        for sample in samples {
            by_day.entry(sample.date()).or_default().push(sample);
        }

        fs::create_dir_all(&self.data_dir).map_err(|e| StoreError::io(&self.data_dir, e))?;

        for (date, rows) in &by_day {
            let path = self.daily_path(*date);
            Self::ensure_header(&path)?;

            let file = OpenOptions::new()
                .append(true)
                .open(&path)
                .map_err(|e| StoreError::io(&path, e))?;
            let mut writer = BufWriter::new(file);
            for sample in rows {
                writeln!(writer, "{}", format_row(sample)).map_err(|e| StoreError::io(&path, e))?;
            }
            writer.flush().map_err(|e| StoreError::io(&path, e))?;
        }

        Ok(samples.len())
    }
}

impl SampleReader for CsvSampleStore {
    fn read(&self, range: &DateRange) -> Result<Vec<Sample>, StoreError> {
        let files = self.find_files(range)?;
        if files.is_empty() {
            return Err(StoreError::no_data(range));
        }
        debug!("Reading {} data files for {}", files.len(), range);

        let mut samples = Vec::new();
        let mut loaded = 0usize;
        let mut last_error = None;
        for (_, path) in &files {
            match Self::read_file(path) {
                Ok(mut rows) => {
                    loaded += 1;
                    samples.append(&mut rows);
                }
                Err(e) => {
                    warn!("Error loading data from {}: {}", path.display(), e);
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) if loaded == 0 => Err(e),
            _ => Ok(samples),
        }
    }
}

/// Parse the recorder's format, falling back to ISO 8601 with fractions
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(value, ISO_TIMESTAMP_FORMAT))
        .ok()
}

fn header_row() -> String {
    std::iter::once(TIMESTAMP_FIELD)
        .chain(RAW_FIELDS.iter().copied())
        .collect::<Vec<_>>()
        .join(",")
}

fn format_row(sample: &Sample) -> String {
    let mut row = sample.timestamp.format(TIMESTAMP_FORMAT).to_string();
    for field in RAW_FIELDS {
        row.push(',');
        if let Some(value) = sample.get(field) {
            row.push_str(&value.to_string());
        }
    }
    row
}
