//! Image quality panel

use serde::Serialize;

use super::format::{self, Tier};
use crate::model::ImageQuality;

/// A single proportional quality bar
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualityBar {
    pub name: &'static str,
    /// Bar width and label, 0-100
    pub percent: u8,
    pub tier: Tier,
}

impl QualityBar {
    fn new(name: &'static str, score: f64) -> Self {
        Self {
            name,
            percent: format::whole_percent(score),
            tier: Tier::for_ratio(score),
        }
    }
}

/// Brightness, sharpness, focus and contrast bars plus the overall score
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualityPanel {
    pub bars: Vec<QualityBar>,
    /// Overall quality score, 0-100, rounded
    pub overall: u8,
    pub overall_tier: Tier,
}

impl QualityPanel {
    pub fn new(quality: &ImageQuality, overall_score: f64) -> Self {
        let overall_score = if overall_score.is_finite() { overall_score } else { 0.0 };
        Self {
            bars: vec![
                QualityBar::new("brightness", quality.brightness),
                QualityBar::new("sharpness", quality.sharpness),
                // blur is reported as "higher is sharper"
                QualityBar::new("focus", quality.blur),
                QualityBar::new("contrast", quality.contrast),
            ],
            overall: overall_score.round().clamp(0.0, 100.0) as u8,
            overall_tier: Tier::for_score(overall_score),
        }
    }

    pub fn bar(&self, name: &str) -> Option<&QualityBar> {
        self.bars.iter().find(|b| b.name == name)
    }
}
