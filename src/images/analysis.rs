//! Background reporting of detected images to a remote analysis service
//!
//! Best effort only: failures are logged at debug level and never reach the
//! command that triggered the report.

use crate::config::AnalysisConfig;
use crate::error::{ChunkError, Result};
use reqwest::blocking::Client;
use std::thread::JoinHandle;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct AnalysisClient {
    endpoint: String,
    health_timeout: Duration,
    analysis_timeout: Duration,
}

impl AnalysisClient {
    /// Client for the configured endpoint, or `None` when analysis is disabled
    pub fn from_config(config: &AnalysisConfig) -> Option<Self> {
        let endpoint = config.endpoint.as_deref()?.trim_end_matches('/');
        if endpoint.is_empty() {
            return None;
        }

        Some(Self {
            endpoint: endpoint.to_string(),
            health_timeout: Duration::from_millis(config.health_timeout_ms),
            analysis_timeout: Duration::from_millis(config.analysis_timeout_ms),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn health_url(&self) -> String {
        format!("{}/health", self.endpoint)
    }

    pub fn batch_url(&self) -> String {
        format!("{}/batch/image", self.endpoint)
    }

    fn client(timeout: Duration) -> Result<Client> {
        Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ChunkError::AnalysisFailed(format!("Failed to build HTTP client: {}", e)))
    }

    pub fn check_health(&self) -> Result<()> {
        Self::client(self.health_timeout)?
            .get(self.health_url())
            .send()
            .and_then(|response| response.error_for_status())
            .map_err(|e| ChunkError::AnalysisFailed(format!("Health check failed: {}", e)))?;
        Ok(())
    }

    /// Submit image sources for analysis and return the service's response body
    pub fn analyze(&self, sources: &[String]) -> Result<serde_json::Value> {
        let response = Self::client(self.analysis_timeout)?
            .post(self.batch_url())
            .json(sources)
            .send()
            .and_then(|response| response.error_for_status())
            .map_err(|e| ChunkError::AnalysisFailed(format!("Batch request failed: {}", e)))?;

        response
            .json()
            .map_err(|e| ChunkError::AnalysisFailed(format!("Invalid analysis response: {}", e)))
    }

    /// Check health then submit, reporting any failure as an error
    pub fn report(&self, sources: &[String]) -> Result<serde_json::Value> {
        self.check_health()?;
        self.analyze(sources)
    }

    /// Run [`AnalysisClient::report`] on a detached worker thread
    pub fn spawn(self, sources: Vec<String>) -> Option<JoinHandle<()>> {
        if sources.is_empty() {
            return None;
        }

        let spawned = std::thread::Builder::new()
            .name("image-analysis".to_string())
            .spawn(move || match self.report(&sources) {
                Ok(_) => log::debug!("Submitted {} images for analysis", sources.len()),
                Err(e) => log::debug!("Image analysis skipped: {}", e),
            });

        match spawned {
            Ok(handle) => Some(handle),
            Err(e) => {
                log::debug!("Failed to start image analysis worker: {}", e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(endpoint: Option<&str>) -> AnalysisConfig {
        AnalysisConfig {
            endpoint: endpoint.map(str::to_string),
            health_timeout_ms: 500,
            analysis_timeout_ms: 500,
        }
    }

    #[test]
    fn test_disabled_without_endpoint() {
        assert!(AnalysisClient::from_config(&config(None)).is_none());
        assert!(AnalysisClient::from_config(&config(Some(""))).is_none());
    }

    #[test]
    fn test_urls() {
        let client = AnalysisClient::from_config(&config(Some("http://localhost:8000/"))).unwrap();
        assert_eq!(client.endpoint(), "http://localhost:8000");
        assert_eq!(client.health_url(), "http://localhost:8000/health");
        assert_eq!(client.batch_url(), "http://localhost:8000/batch/image");
    }

    #[test]
    fn test_unreachable_service_is_an_error() {
        // Port 9 (discard) is closed on test machines
        let client = AnalysisClient::from_config(&config(Some("http://127.0.0.1:9"))).unwrap();
        assert!(matches!(client.report(&["https://x/a.png".to_string()]), Err(ChunkError::AnalysisFailed(_))));
    }

    #[test]
    fn test_spawn_swallows_failures() {
        let client = AnalysisClient::from_config(&config(Some("http://127.0.0.1:9"))).unwrap();
        assert!(client.clone().spawn(Vec::new()).is_none());

        let handle = client.spawn(vec!["https://x/a.png".to_string()]).unwrap();
        assert!(handle.join().is_ok());
    }
}
