//! Core data types for classification results
//!
//! This module defines the values that flow from the backend into the dashboard:
//! - `Category`: The closed set of classifier labels (plus unrecognized ones)
//! - `StatisticsSnapshot`: Aggregate counts and averages
//! - `ClassificationEvent`: A single inference result
//! - `ImageQuality`: Per-image quality sub-scores
//! - `ClassProbabilities`: Per-class probabilities in wire order

use chrono::{DateTime, Local, TimeZone, Utc};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use super::recommendation::Recommendation;

/// Classifier output label
///
/// Labels outside the closed set are kept verbatim in `Unknown` so that a
/// newer backend never breaks decoding.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Category {
    /// Fresh fruit
    FreshFruit,
    /// Spoiled fruit
    SpoiledFruit,
    /// Anything that is not fruit
    Other,
    /// Label not known to this client
    Unknown(String),
}

impl Category {
    /// Wire name of the category
    pub fn as_str(&self) -> &str {
        match self {
            Category::FreshFruit => "fresh_fruit",
            Category::SpoiledFruit => "spoiled_fruit",
            Category::Other => "other",
            Category::Unknown(raw) => raw,
        }
    }

    /// Icon shown next to the category
    pub fn icon(&self) -> &'static str {
        match self {
            Category::FreshFruit => "🍏",
            Category::SpoiledFruit => "🍎",
            Category::Other => "📦",
            Category::Unknown(_) => "❓",
        }
    }

    /// Human-readable label; unrecognized labels are shown verbatim
    pub fn label(&self) -> &str {
        match self {
            Category::FreshFruit => "Fresh Fruit",
            Category::SpoiledFruit => "Spoiled Fruit",
            Category::Other => "Other Object",
            Category::Unknown(raw) => raw,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Category::Unknown(_))
    }
}

impl From<String> for Category {
    fn from(value: String) -> Self {
        match value.as_str() {
            "fresh_fruit" => Category::FreshFruit,
            "spoiled_fruit" => Category::SpoiledFruit,
            "other" => Category::Other,
            _ => Category::Unknown(value),
        }
    }
}

impl From<&str> for Category {
    fn from(value: &str) -> Self {
        Category::from(value.to_string())
    }
}

impl From<Category> for String {
    fn from(value: Category) -> Self {
        match value {
            Category::Unknown(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-category counts inside a statistics snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCounts {
    #[serde(default, deserialize_with = "zero_if_null")]
    pub fresh_fruit: u64,
    #[serde(default, deserialize_with = "zero_if_null")]
    pub spoiled_fruit: u64,
    #[serde(default, deserialize_with = "zero_if_null")]
    pub other: u64,
}

impl CategoryCounts {
    pub fn new(fresh_fruit: u64, spoiled_fruit: u64, other: u64) -> Self {
        Self {
            fresh_fruit,
            spoiled_fruit,
            other,
        }
    }

    pub fn sum(&self) -> u64 {
        self.fresh_fruit + self.spoiled_fruit + self.other
    }
}

/// Aggregate statistics over all classifications
///
/// A snapshot always replaces the previous one wholesale; the dashboard never
/// merges two snapshots.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatisticsSnapshot {
    #[serde(default, deserialize_with = "zero_if_null")]
    pub category_counts: CategoryCounts,
    #[serde(default, deserialize_with = "zero_if_null")]
    pub total: u64,
    /// Mean confidence, 0.0 - 1.0
    #[serde(default, deserialize_with = "zero_if_null")]
    pub avg_confidence: f64,
    /// Mean processing time in seconds
    #[serde(default, deserialize_with = "zero_if_null")]
    pub avg_processing_time: f64,
}

impl StatisticsSnapshot {
    /// Clamp averages so that every field is a finite, non-negative number
    pub fn sanitized(mut self) -> Self {
        self.avg_confidence = non_negative(self.avg_confidence);
        self.avg_processing_time = non_negative(self.avg_processing_time);
        self
    }
}

fn non_negative(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

/// Image quality sub-scores, each 0.0 - 1.0
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageQuality {
    #[serde(default)]
    pub brightness: f64,
    #[serde(default)]
    pub sharpness: f64,
    /// Higher is less blurry; shown as "focus"
    #[serde(default)]
    pub blur: f64,
    #[serde(default)]
    pub contrast: f64,
    /// Weighted overall score, when the backend provides it
    #[serde(default)]
    pub overall: Option<f64>,
}

/// Per-class probabilities in the order the backend listed them
///
/// A repeated key replaces the earlier value but keeps its position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassProbabilities(Vec<(String, f64)>);

impl ClassProbabilities {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a class probability
    pub fn insert(&mut self, class: impl Into<String>, probability: f64) {
        let class = class.into();
        match self.0.iter_mut().find(|(key, _)| *key == class) {
            Some(entry) => entry.1 = probability,
            None => self.0.push((class, probability)),
        }
    }

    pub fn get(&self, class: &str) -> Option<f64> {
        self.0.iter().find(|(key, _)| key == class).map(|(_, p)| *p)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(key, p)| (key.as_str(), *p))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, f64)> for ClassProbabilities {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        let mut probabilities = Self::new();
        for (class, probability) in iter {
            probabilities.insert(class, probability);
        }
        probabilities
    }
}

impl Serialize for ClassProbabilities {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (class, probability) in &self.0 {
            map.serialize_entry(class, probability)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ClassProbabilities {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ProbabilityVisitor;

        impl<'de> Visitor<'de> for ProbabilityVisitor {
            type Value = ClassProbabilities;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of class name to probability")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut probabilities = ClassProbabilities::new();
                while let Some((class, probability)) = access.next_entry::<String, f64>()? {
                    probabilities.insert(class, probability);
                }
                Ok(probabilities)
            }
        }

        deserializer.deserialize_map(ProbabilityVisitor)
    }
}

/// A single inference result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationEvent {
    pub classification: Category,
    /// Confidence of the top class, 0.0 - 1.0
    pub confidence: f64,
    /// Seconds since the Unix epoch
    #[serde(default)]
    pub timestamp: Option<f64>,
    /// Processing time in seconds
    #[serde(default)]
    pub processing_time: Option<f64>,
    #[serde(default)]
    pub image_quality: Option<ImageQuality>,
    /// Per-category probabilities as delivered (never re-normalized)
    #[serde(default)]
    pub all_probabilities: Option<ClassProbabilities>,
    /// Overall quality score, 0 - 100
    #[serde(default)]
    pub quality_score: Option<f64>,
    #[serde(default)]
    pub recommendation: Option<Recommendation>,
}

impl ClassificationEvent {
    /// Create a minimal event
    pub fn new(classification: impl Into<Category>, confidence: f64) -> Self {
        Self {
            classification: classification.into(),
            confidence,
            timestamp: None,
            processing_time: None,
            image_quality: None,
            all_probabilities: None,
            quality_score: None,
            recommendation: None,
        }
    }

    /// Builder method: set the timestamp (seconds since epoch)
    pub fn timestamp(mut self, timestamp: f64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Builder method: set the processing time (seconds)
    pub fn processing_time(mut self, seconds: f64) -> Self {
        self.processing_time = Some(seconds);
        self
    }

    /// Builder method: add a class probability
    pub fn probability(mut self, class: impl Into<String>, probability: f64) -> Self {
        self.all_probabilities
            .get_or_insert_with(ClassProbabilities::new)
            .insert(class, probability);
        self
    }

    /// Builder method: set the recommendation
    pub fn recommendation(mut self, recommendation: impl Into<Recommendation>) -> Self {
        self.recommendation = Some(recommendation.into());
        self
    }

    /// Timestamp as a UTC datetime, if present and representable
    pub fn occurred_at(&self) -> Option<DateTime<Utc>> {
        let ts = self.timestamp?;
        if !ts.is_finite() {
            return None;
        }
        let millis = (ts * 1000.0).round() as i64;
        Utc.timestamp_millis_opt(millis).single()
    }

    /// Local wall-clock time of day, e.g. "14:03:27"
    pub fn local_time(&self) -> Option<String> {
        self.occurred_at()
            .map(|dt| dt.with_timezone(&Local).format("%H:%M:%S").to_string())
    }
}

/// Treat an explicit JSON `null` the same as a missing field
pub(crate) fn zero_if_null<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_round_trip_names() {
        assert_eq!(Category::from("fresh_fruit"), Category::FreshFruit);
        assert_eq!(Category::from("spoiled_fruit"), Category::SpoiledFruit);
        assert_eq!(Category::from("other"), Category::Other);
        assert_eq!(
            Category::from("banana"),
            Category::Unknown("banana".to_string())
        );
        assert_eq!(Category::Unknown("banana".into()).to_string(), "banana");
    }

    #[test]
    fn test_unknown_category_falls_back() {
        let cat = Category::from("mystery");
        assert_eq!(cat.icon(), "❓");
        assert_eq!(cat.label(), "mystery");
        assert!(!cat.is_known());
    }

    #[test]
    fn test_snapshot_missing_and_null_fields() {
        let json = r#"{"category_counts": {"fresh_fruit": 2, "mango": 9}, "total": 2, "avg_confidence": null}"#;
        let snapshot: StatisticsSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(snapshot.category_counts, CategoryCounts::new(2, 0, 0));
        assert_eq!(snapshot.total, 2);
        assert_eq!(snapshot.avg_confidence, 0.0);
        assert_eq!(snapshot.avg_processing_time, 0.0);
    }

    #[test]
    fn test_snapshot_rejects_negative_counts() {
        let json = r#"{"category_counts": {"fresh_fruit": -1}, "total": 0}"#;
        assert!(serde_json::from_str::<StatisticsSnapshot>(json).is_err());
    }

    #[test]
    fn test_snapshot_sanitized() {
        let snapshot = StatisticsSnapshot {
            avg_confidence: -0.5,
            avg_processing_time: f64::NAN,
            ..Default::default()
        }
        .sanitized();
        assert_eq!(snapshot.avg_confidence, 0.0);
        assert_eq!(snapshot.avg_processing_time, 0.0);
    }

    #[test]
    fn test_event_requires_classification() {
        let json = r#"{"confidence": 0.9}"#;
        assert!(serde_json::from_str::<ClassificationEvent>(json).is_err());
    }

    #[test]
    fn test_event_full_payload() {
        let json = r#"{
            "classification": "fresh_fruit",
            "confidence": 0.91,
            "timestamp": 1700000000.5,
            "processing_time": 0.12,
            "image_quality": {"brightness": 0.8, "sharpness": 0.7, "blur": 0.6, "contrast": 0.5, "overall": 0.66},
            "all_probabilities": {"fresh_fruit": 0.91, "spoiled_fruit": 0.06, "other": 0.03},
            "quality_score": 82.5,
            "recommendation": "✅ High confidence - reliable result | 🌟 Excellent quality"
        }"#;
        let event: ClassificationEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.classification, Category::FreshFruit);
        assert_eq!(event.processing_time, Some(0.12));
        assert_eq!(event.image_quality.unwrap().overall, Some(0.66));
        assert_eq!(event.all_probabilities.as_ref().unwrap().len(), 3);
        assert_eq!(event.quality_score, Some(82.5));
        assert_eq!(
            event.occurred_at().unwrap().timestamp_millis(),
            1_700_000_000_500
        );
    }

    #[test]
    fn test_event_builder() {
        let event = ClassificationEvent::new("other", 0.4)
            .timestamp(10.0)
            .processing_time(0.2)
            .probability("other", 0.4)
            .probability("fresh_fruit", 0.6);
        assert_eq!(event.classification, Category::Other);
        assert_eq!(event.all_probabilities.unwrap().get("fresh_fruit"), Some(0.6));
    }

    #[test]
    fn test_probabilities_keep_wire_order() {
        let json = r#"{"spoiled_fruit": 0.5, "fresh_fruit": 0.5, "other": 0.0, "spoiled_fruit": 0.4}"#;
        let probabilities: ClassProbabilities = serde_json::from_str(json).unwrap();
        let keys: Vec<&str> = probabilities.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["spoiled_fruit", "fresh_fruit", "other"]);
        assert_eq!(probabilities.get("spoiled_fruit"), Some(0.4));

        let out = serde_json::to_string(&probabilities).unwrap();
        assert_eq!(out, r#"{"spoiled_fruit":0.4,"fresh_fruit":0.5,"other":0.0}"#);
    }
}
