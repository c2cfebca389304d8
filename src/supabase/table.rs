//! Table queries

use chrono::{DateTime, NaiveDateTime};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::SupabaseResult;
use super::SupabaseClient;
use crate::model::{Category, CategoryCounts, ClassificationEvent, StatisticsSnapshot};

/// Role assumed when a user's role cannot be read
pub const DEFAULT_ROLE: &str = "viewer";

/// A row of the classifications table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationRow {
    #[serde(default)]
    pub id: Option<Value>,
    /// ISO-8601 timestamp
    #[serde(default)]
    pub timestamp: Option<String>,
    pub classification: Category,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub device_id: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub image_path: Option<String>,
}

impl ClassificationRow {
    /// Seconds since the epoch; zone-less timestamps are taken as UTC
    pub fn epoch_seconds(&self) -> Option<f64> {
        let raw = self.timestamp.as_deref()?;
        let millis = match DateTime::parse_from_rfc3339(raw) {
            Ok(dt) => dt.timestamp_millis(),
            Err(_) => NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()?
                .and_utc()
                .timestamp_millis(),
        };
        Some(millis as f64 / 1000.0)
    }

    /// View as a feed entry
    pub fn to_event(&self) -> ClassificationEvent {
        let mut event = ClassificationEvent::new(
            self.classification.clone(),
            self.confidence.unwrap_or(0.0),
        );
        event.timestamp = self.epoch_seconds();
        event
    }
}

/// Aggregates computed client-side over the classifications table
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TableStatistics {
    pub total: u64,
    pub fresh_fruit: u64,
    pub spoiled_fruit: u64,
    pub other: u64,
    pub avg_confidence: f64,
}

impl TableStatistics {
    /// View as a dashboard snapshot; the table carries no processing times
    pub fn to_snapshot(&self) -> StatisticsSnapshot {
        StatisticsSnapshot {
            category_counts: CategoryCounts::new(self.fresh_fruit, self.spoiled_fruit, self.other),
            total: self.total,
            avg_confidence: self.avg_confidence,
            avg_processing_time: 0.0,
        }
    }
}

/// Count rows by category and average their confidence
///
/// Any category other than fresh or spoiled counts as other, and a missing
/// confidence counts as zero.
pub fn aggregate_rows<'a, I>(rows: I) -> TableStatistics
where
    I: IntoIterator<Item = &'a ClassificationRow>,
{
    let mut stats = TableStatistics::default();
    let mut confidence_sum = 0.0;

    for row in rows {
        stats.total += 1;
        match row.classification {
            Category::FreshFruit => stats.fresh_fruit += 1,
            Category::SpoiledFruit => stats.spoiled_fruit += 1,
            _ => stats.other += 1,
        }
        confidence_sum += row.confidence.filter(|c| c.is_finite()).unwrap_or(0.0);
    }

    if stats.total > 0 {
        stats.avg_confidence = confidence_sum / stats.total as f64;
    }
    stats
}

#[derive(Debug, Deserialize)]
struct RoleRow {
    #[serde(default)]
    role: Option<String>,
}

impl SupabaseClient {
    /// Most recent classification rows, newest first
    pub async fn get_recent_classifications(&self, limit: usize) -> SupabaseResult<Vec<ClassificationRow>> {
        let path = format!(
            "/rest/v1/{}?select=*&order=timestamp.desc&limit={}",
            self.config.table, limit
        );
        let rows = self.send(self.request(Method::GET, &path)).await?.json().await?;
        Ok(rows)
    }

    /// Role of a user, or [`DEFAULT_ROLE`] when it cannot be determined
    pub async fn get_user_role(&self, user_id: &str) -> String {
        match self.fetch_user_role(user_id).await {
            Ok(Some(role)) if !role.is_empty() => role,
            Ok(_) => DEFAULT_ROLE.to_string(),
            Err(e) => {
                tracing::debug!(error = %e, user_id, "Role lookup failed, using default");
                DEFAULT_ROLE.to_string()
            }
        }
    }

    async fn fetch_user_role(&self, user_id: &str) -> SupabaseResult<Option<String>> {
        let path = format!(
            "/rest/v1/{}?select=role&id=eq.{}",
            self.config.users_table,
            urlencoding::encode(user_id)
        );
        let builder = self
            .request(Method::GET, &path)
            .header("Accept", "application/vnd.pgrst.object+json");
        let row: RoleRow = self.send(builder).await?.json().await?;
        Ok(row.role)
    }

    /// Category counts and average confidence over the whole table
    pub async fn get_statistics(&self) -> SupabaseResult<TableStatistics> {
        let path = format!("/rest/v1/{}?select=classification,confidence", self.config.table);
        let rows: Vec<ClassificationRow> = self.send(self.request(Method::GET, &path)).await?.json().await?;
        Ok(aggregate_rows(&rows))
    }
}
