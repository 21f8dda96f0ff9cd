//! Configuration for recording and analysis

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::analysis::derived::DerivedMetric;
use crate::core::sample::{
    CPU_USAGE_PERCENT, GPU_USAGE_PERCENT, MEMORY_SWAP_USED, MEMORY_TOTAL, MEMORY_USED,
    RAM_PERCENT, SWAP_PRESSURE_PERCENT,
};

/// Port mactop serves its Prometheus endpoint on
pub const DEFAULT_PORT: u16 = 8888;
/// Directory name under `$HOME` holding the daily CSV files
pub const DEFAULT_DATA_DIR_NAME: &str = ".mactop-report-data";
const CONFIG_DIR_NAME: &str = "mactop-report";
const CONFIG_FILE_NAME: &str = "config.toml";

/// Errors loading or saving the configuration file
#[derive(Debug, Clone)]
pub enum ConfigError {
    Io(String),
    Parse(String),
    Serialize(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(msg) => write!(f, "Config I/O error: {}", msg),
            ConfigError::Parse(msg) => write!(f, "Invalid config: {}", msg),
            ConfigError::Serialize(msg) => write!(f, "Cannot serialize config: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Main configuration, stored as TOML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Port of the mactop metrics endpoint
    pub port: u16,

    /// Seconds between two samples
    pub interval_secs: f64,

    /// Samples buffered before they are appended to disk
    pub batch_size: usize,

    /// Directory with the daily CSV files (defaults to ~/.mactop-report-data)
    pub data_dir: Option<PathBuf>,

    /// Start mactop ourselves when the endpoint is not reachable
    pub launch_companion: bool,

    /// Refresh interval handed to mactop (milliseconds)
    pub companion_refresh_ms: u64,

    /// Metrics analyzed when none are requested explicitly
    pub primary_metrics: Vec<String>,

    /// Length of the peak-usage window
    pub peak_window_minutes: u32,

    /// Ratio metrics computed from raw columns before analysis
    pub derived_metrics: Vec<DerivedMetric>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            interval_secs: 1.0,
            batch_size: 60,
            data_dir: None,
            launch_companion: true,
            companion_refresh_ms: 250,
            primary_metrics: vec![
                CPU_USAGE_PERCENT.into(),
                GPU_USAGE_PERCENT.into(),
                RAM_PERCENT.into(),
                SWAP_PRESSURE_PERCENT.into(),
            ],
            peak_window_minutes: 15,
            derived_metrics: vec![
                DerivedMetric::new(RAM_PERCENT, MEMORY_USED, MEMORY_TOTAL),
                DerivedMetric::new(SWAP_PRESSURE_PERCENT, MEMORY_SWAP_USED, MEMORY_TOTAL),
            ],
        }
    }
}

impl ReportConfig {
    /// Load config from TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Load config from TOML file, falling back to defaults when it does not exist
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::debug!("No config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Save config to TOML file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Io(e.to_string()))?;
        }
        std::fs::write(path, content).map_err(|e| ConfigError::Io(e.to_string()))
    }

    /// Default config file location
    ///
    /// - **macOS**: `~/Library/Application Support/mactop-report/config.toml`
    /// - **Linux**: `~/.config/mactop-report/config.toml`
    pub fn default_path() -> PathBuf {
        let mut p = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        p.push(CONFIG_DIR_NAME);
        p.push(CONFIG_FILE_NAME);
        p
    }

    /// Resolve the data directory, preferring an explicit override
    pub fn resolve_data_dir(&self, user_path: Option<&Path>) -> PathBuf {
        if let Some(path) = user_path {
            return path.to_path_buf();
        }
        if let Some(path) = &self.data_dir {
            return path.clone();
        }
        let mut p = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        p.push(DEFAULT_DATA_DIR_NAME);
        p
    }

    /// Immutable engine configuration
    pub fn analysis(&self) -> AnalysisConfig {
        AnalysisConfig {
            primary_metrics: self.primary_metrics.clone(),
            derived_metrics: self.derived_metrics.clone(),
            peak_window: chrono::Duration::minutes(i64::from(self.peak_window_minutes.max(1))),
        }
    }
}

/// Configuration handed to the analysis engine at construction
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisConfig {
    pub primary_metrics: Vec<String>,
    pub derived_metrics: Vec<DerivedMetric>,
    pub peak_window: chrono::Duration,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        ReportConfig::default().analysis()
    }
}
