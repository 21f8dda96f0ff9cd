//! Polling loop that buffers samples and appends them in batches

use std::collections::BTreeMap;
use std::future::Future;
use std::time::Duration;

use chrono::{Local, NaiveDateTime, Timelike};
use serde::Serialize;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use super::client::MetricsClient;
use super::RecorderError;
use crate::core::config::ReportConfig;
use crate::core::sample::{Sample, RAW_FIELDS};
use crate::store::CsvSampleStore;

const MIN_INTERVAL: Duration = Duration::from_millis(50);

/// Counters reported when a session ends
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    pub samples_recorded: usize,
    pub rows_written: usize,
    pub fetch_failures: usize,
    pub batches_flushed: usize,
}

/// Build a sample with every raw column; metrics mactop did not report are null
pub fn sample_from_metrics(timestamp: NaiveDateTime, metrics: &BTreeMap<String, f64>) -> Sample {
    let mut sample = Sample::new(timestamp);
    for field in RAW_FIELDS {
        sample.set(field, metrics.get(*field).copied());
    }
    sample
}

/// A recording session writing to one store
pub struct RecordingSession {
    client: MetricsClient,
    store: CsvSampleStore,
    interval: Duration,
    batch_size: usize,
    buffer: Vec<Sample>,
    stats: SessionStats,
}

impl RecordingSession {
    pub fn new(
        client: MetricsClient,
        store: CsvSampleStore,
        interval: Duration,
        batch_size: usize,
    ) -> Self {
        Self {
            client,
            store,
            interval: interval.max(MIN_INTERVAL),
            batch_size: batch_size.max(1),
            buffer: Vec::new(),
            stats: SessionStats::default(),
        }
    }

    pub fn from_config(config: &ReportConfig, store: CsvSampleStore) -> Result<Self, RecorderError> {
        let interval = if config.interval_secs.is_finite() && config.interval_secs > 0.0 {
            Duration::from_secs_f64(config.interval_secs)
        } else {
            warn!(
                "Invalid interval {}s, recording every second",
                config.interval_secs
            );
            Duration::from_secs(1)
        };
        Ok(Self::new(
            MetricsClient::new(config.port)?,
            store,
            interval,
            config.batch_size,
        ))
    }

    pub fn client(&self) -> &MetricsClient {
        &self.client
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    /// Samples waiting for the next flush
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Take one sample. Returns false when the endpoint could not be read.
    pub async fn poll_once(&mut self) -> Result<bool, RecorderError> {
        let metrics = match self.client.fetch().await {
            Ok(metrics) => metrics,
            Err(e) => {
                self.stats.fetch_failures += 1;
                warn!("Skipping sample: {}", e);
                return Ok(false);
            }
        };

        let now = Local::now().naive_local();
        let timestamp = now.with_nanosecond(0).unwrap_or(now);
        self.buffer.push(sample_from_metrics(timestamp, &metrics));
        self.stats.samples_recorded += 1;

        if self.buffer.len() >= self.batch_size {
            self.flush()?;
        }
        Ok(true)
    }

    /// Append buffered samples to the store. The buffer is kept on failure.
    pub fn flush(&mut self) -> Result<usize, RecorderError> {
        if self.buffer.is_empty() {
            return Ok(0);
        }
        let written = self.store.append(&self.buffer)?;
        debug!("Saved {} samples", written);
        self.buffer.clear();
        self.stats.rows_written += written;
        self.stats.batches_flushed += 1;
        Ok(written)
    }

    /// Record until `shutdown` completes, then flush what is left
    pub async fn run_until<F>(&mut self, shutdown: F) -> Result<SessionStats, RecorderError>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(
            "Recording from {} every {:?} into {}",
            self.client.url(),
            self.interval,
            self.store.data_dir().display()
        );

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Stopping recorder");
                    break;
                }
                _ = ticker.tick() => {
                    self.poll_once().await?;
                }
            }
        }

        self.flush()?;
        info!(
            "Recorded {} samples ({} failed requests)",
            self.stats.samples_recorded, self.stats.fetch_failures
        );
        Ok(self.stats)
    }

    /// Record until Ctrl+C
    pub async fn run(&mut self) -> Result<SessionStats, RecorderError> {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for Ctrl+C: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await
    }
}
