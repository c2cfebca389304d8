//! Statistics Backend REST Client
//!
//! HTTP client for the classification backend's statistics and history
//! endpoints.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use super::error::{FetchError, FetchResult};
use super::StatsSource;
use crate::model::{ClassificationEvent, StatisticsSnapshot};

/// Configuration for the backend client
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Base URL of the backend (e.g., "http://localhost:8000")
    pub base_url: String,
    /// Request timeout
    pub request_timeout: Duration,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            request_timeout: Duration::from_secs(10),
        }
    }
}

/// REST client for `/api/stats` and `/api/history`
#[derive(Clone)]
pub struct BackendClient {
    client: Client,
    config: BackendConfig,
}

#[derive(Debug, Deserialize)]
struct HistoryResponse {
    #[serde(default)]
    history: Vec<ClassificationEvent>,
}

impl BackendClient {
    /// Create a new backend client
    pub fn new(config: BackendConfig) -> FetchResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(&self, url: &str) -> FetchResult<T> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(FetchError::from_transport)?;

        if response.status().is_success() {
            Ok(response.json().await?)
        } else {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            Err(FetchError::ApiError {
                status: status.as_u16(),
                message: text,
            })
        }
    }
}

#[async_trait]
impl StatsSource for BackendClient {
    async fn fetch_statistics(&self) -> FetchResult<StatisticsSnapshot> {
        let snapshot: StatisticsSnapshot = self.get_json(&self.url("/api/stats")).await?;
        Ok(snapshot.sanitized())
    }

    async fn fetch_history(&self, limit: usize) -> FetchResult<Vec<ClassificationEvent>> {
        let url = format!("{}?limit={}", self.url("/api/history"), limit);
        let response: HistoryResponse = self.get_json(&url).await?;
        Ok(response.history)
    }
}
