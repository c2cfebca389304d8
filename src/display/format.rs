//! Text formatting and presentation tiers

use serde::Serialize;

/// Format a 0-1 ratio as a one-decimal percentage, e.g. `0.92` -> `"92.0%"`
pub fn percent(ratio: f64) -> String {
    format!("{:.1}%", finite_or_zero(ratio) * 100.0)
}

/// Format a duration in seconds as whole milliseconds, e.g. `0.15` -> `"150ms"`
pub fn millis(seconds: f64) -> String {
    format!("{:.0}ms", finite_or_zero(seconds) * 1000.0)
}

/// Round a 0-1 ratio to a whole percentage, clamped to 0..=100
pub fn whole_percent(ratio: f64) -> u8 {
    (finite_or_zero(ratio) * 100.0).round().clamp(0.0, 100.0) as u8
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

/// Four-step presentation tier used for quality bars and the overall score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl Tier {
    /// Tier for a 0-1 sub-score (thresholds 0.8, 0.6, 0.4)
    pub fn for_ratio(score: f64) -> Self {
        Self::classify(score, [0.8, 0.6, 0.4])
    }

    /// Tier for a 0-100 score (thresholds 80, 60, 40)
    pub fn for_score(score: f64) -> Self {
        Self::classify(score, [80.0, 60.0, 40.0])
    }

    fn classify(value: f64, [excellent, good, fair]: [f64; 3]) -> Self {
        if value > excellent {
            Tier::Excellent
        } else if value > good {
            Tier::Good
        } else if value > fair {
            Tier::Fair
        } else {
            Tier::Poor
        }
    }
}

/// Confidence badge shown on activity items
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceBadge {
    High,
    Medium,
    Low,
}

impl ConfidenceBadge {
    pub fn for_confidence(confidence: f64) -> Self {
        if confidence < 0.6 {
            ConfidenceBadge::Low
        } else if confidence < 0.8 {
            ConfidenceBadge::Medium
        } else {
            ConfidenceBadge::High
        }
    }
}
