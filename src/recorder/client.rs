//! HTTP client for mactop's Prometheus endpoint

use std::collections::BTreeMap;
use std::time::Duration;

use tracing::debug;

use super::prometheus::parse_metrics;
use super::RecorderError;

/// Per-request timeout; a sample that takes longer is skipped
const REQUEST_TIMEOUT: Duration = Duration::from_secs(1);

/// Client for the `/metrics` endpoint served by `mactop -p PORT`
pub struct MetricsClient {
    url: String,
    client: reqwest::Client,
}

impl MetricsClient {
    /// Client for mactop listening on localhost at `port`
    pub fn new(port: u16) -> Result<Self, RecorderError> {
        Self::with_url(&format!("http://localhost:{}/metrics", port))
    }

    /// Client for an explicit metrics URL
    pub fn with_url(url: &str) -> Result<Self, RecorderError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| RecorderError::Http(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            url: url.to_string(),
            client,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Check whether the endpoint answers with a success status
    pub async fn is_available(&self) -> bool {
        match self.client.get(&self.url).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                debug!("Metrics endpoint not reachable: {}", e);
                false
            }
        }
    }

    /// Fetch the raw exposition text
    pub async fn fetch_text(&self) -> Result<String, RecorderError> {
        let resp = self.client.get(&self.url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(RecorderError::Status(status.as_u16()));
        }
        Ok(resp.text().await?)
    }

    /// Fetch and parse one set of metric values
    pub async fn fetch(&self) -> Result<BTreeMap<String, f64>, RecorderError> {
        let text = self.fetch_text().await?;
        Ok(parse_metrics(&text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::sample::{CPU_USAGE_PERCENT, MEMORY_TOTAL};
    use crate::recorder::test_server::{closed_port, serve, METRICS_BODY};

    #[test]
    fn test_default_url() {
        let client = MetricsClient::new(8888).unwrap();
        assert_eq!(client.url(), "http://localhost:8888/metrics");
    }

    #[tokio::test]
    async fn test_fetch_parses_metrics() {
        let port = serve(200, METRICS_BODY).await;
        let client = MetricsClient::with_url(&format!("http://127.0.0.1:{}/metrics", port)).unwrap();

        assert!(client.is_available().await);
        let metrics = client.fetch().await.unwrap();
        assert_eq!(metrics[CPU_USAGE_PERCENT], 25.5);
        assert_eq!(metrics[MEMORY_TOTAL], 16.0);
    }

    #[tokio::test]
    async fn test_error_status() {
        let port = serve(500, "").await;
        let client = MetricsClient::with_url(&format!("http://127.0.0.1:{}/metrics", port)).unwrap();

        assert!(!client.is_available().await);
        assert!(matches!(client.fetch().await, Err(RecorderError::Status(500))));
    }

    #[tokio::test]
    async fn test_unreachable() {
        let port = closed_port().await;
        let client = MetricsClient::with_url(&format!("http://127.0.0.1:{}/metrics", port)).unwrap();

        assert!(!client.is_available().await);
        assert!(matches!(client.fetch().await, Err(RecorderError::Http(_))));
    }
}
