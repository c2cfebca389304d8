//! Classification Backend API
//!
//! Client side of the backend's HTTP endpoints.
//!
//! # Endpoints
//!
//! - `GET /api/stats` - Current [`StatisticsSnapshot`]
//! - `GET /api/history?limit=N` - `{"history": [ClassificationEvent, ...]}`, newest first
//!
//! The live client only depends on the [`StatsSource`] trait, so tests and
//! alternative data paths can stand in for the HTTP client.

mod client;
mod error;

pub use client::{BackendClient, BackendConfig};
pub use error::{FetchError, FetchResult};

use async_trait::async_trait;

use crate::model::{ClassificationEvent, StatisticsSnapshot};

/// Source of authoritative statistics and history
#[async_trait]
pub trait StatsSource: Send + Sync {
    /// Fetch the current statistics snapshot
    async fn fetch_statistics(&self) -> FetchResult<StatisticsSnapshot>;

    /// Fetch up to `limit` most recent classifications, newest first
    async fn fetch_history(&self, limit: usize) -> FetchResult<Vec<ClassificationEvent>>;
}
