//! Render instructions and the sink that consumes them

use serde::Serialize;

use super::counter::CounterAnimation;
use super::format::{self, ConfidenceBadge};
use super::probability::ProbabilityRow;
use super::quality::QualityPanel;
use crate::live::ConnectionState;
use crate::model::{Category, CategoryCounts, ClassificationEvent, Clause};

/// Which aggregate counter a frame belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CounterKind {
    Fresh,
    Spoiled,
    Other,
    Total,
}

/// One slice of the distribution chart
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSlice {
    pub category: Category,
    pub value: u64,
    /// Share of the three slices, e.g. "75.0%"
    pub share: String,
}

/// Build the fresh / spoiled / other distribution chart
pub fn chart_slices(counts: &CategoryCounts) -> Vec<ChartSlice> {
    let sum = counts.sum();
    let slice = |category: Category, value: u64| ChartSlice {
        share: if sum > 0 {
            format!("{:.1}%", value as f64 / sum as f64 * 100.0)
        } else {
            "0%".to_string()
        },
        category,
        value,
    };

    vec![
        slice(Category::FreshFruit, counts.fresh_fruit),
        slice(Category::SpoiledFruit, counts.spoiled_fruit),
        slice(Category::Other, counts.other),
    ]
}

/// One entry of the activity feed as displayed
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityItem {
    pub icon: &'static str,
    pub title: String,
    /// Local time of day, if the event carries a timestamp
    pub time: Option<String>,
    /// e.g. "120ms"
    pub processing: Option<String>,
    /// e.g. "91.0%"
    pub confidence: String,
    pub badge: ConfidenceBadge,
}

impl ActivityItem {
    pub fn from_event(event: &ClassificationEvent) -> Self {
        let title = if event.classification.is_known() {
            event.classification.label().to_string()
        } else {
            "Unknown".to_string()
        };

        Self {
            icon: event.classification.icon(),
            title,
            time: event.local_time(),
            processing: event
                .processing_time
                .filter(|secs| *secs > 0.0)
                .map(format::millis),
            confidence: format::percent(event.confidence),
            badge: ConfidenceBadge::for_confidence(event.confidence),
        }
    }
}

/// A single display update
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum RenderOp {
    /// Status indicator changed
    ConnectionStatus { state: ConnectionState },
    /// Aggregate counter changed; `animation` is `None` when the value is unchanged
    Counter {
        kind: CounterKind,
        value: u64,
        #[serde(skip)]
        animation: Option<CounterAnimation>,
    },
    /// Average confidence and processing time text
    Metrics { confidence: String, processing: String },
    /// Distribution chart data
    Chart { slices: Vec<ChartSlice> },
    /// Image quality bars and overall score
    Quality { panel: QualityPanel },
    /// Ranked probability breakdown
    Probabilities { rows: Vec<ProbabilityRow> },
    /// Recommendation clauses with their severities
    Recommendations { clauses: Vec<Clause> },
    /// Whole feed replaced (history load)
    ActivityReplaced { items: Vec<ActivityItem> },
    /// Newest entry added at the top; `evicted` entries fell off the bottom
    ActivityPrepended { item: ActivityItem, evicted: usize },
}

/// Consumer of render instructions
///
/// Implementations decide how the dashboard is actually drawn.
pub trait DisplaySink: Send {
    fn render(&mut self, op: RenderOp);
}

impl<F> DisplaySink for F
where
    F: FnMut(RenderOp) + Send,
{
    fn render(&mut self, op: RenderOp) {
        self(op)
    }
}
