//! Ranked probability breakdown

use serde::Serialize;

use super::format;
use crate::model::{Category, ClassProbabilities};

/// One row of the probability breakdown
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProbabilityRow {
    pub category: Category,
    pub icon: &'static str,
    pub label: String,
    pub probability: f64,
    /// e.g. "70.0%"
    pub percentage: String,
    /// The classifier's top class
    pub is_top: bool,
}

/// Rank probabilities in descending order, flagging the top class
///
/// Values are shown as delivered. Ties keep the order the backend sent.
pub fn rank(probabilities: &ClassProbabilities, top: &Category) -> Vec<ProbabilityRow> {
    let mut rows: Vec<ProbabilityRow> = probabilities
        .iter()
        .map(|(key, probability)| {
            let category = Category::from(key);
            ProbabilityRow {
                icon: category.icon(),
                label: category.label().to_string(),
                is_top: &category == top,
                percentage: format::percent(probability),
                probability,
                category,
            }
        })
        .collect();

    rows.sort_by(|a, b| b.probability.total_cmp(&a.probability));
    rows
}
