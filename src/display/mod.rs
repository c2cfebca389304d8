//! Display Aggregator
//!
//! Turns the latest statistics snapshot or classification event into a list
//! of [`RenderOp`]s. The only state kept here is the last displayed value of
//! each counter, which drives the counter animations.
//!
//! ## Render flow
//!
//! - `stats` snapshot → four counters, metrics text, distribution chart
//! - `classification` event → quality panel, probability ranking,
//!   recommendation clauses (each only when present in the event)
//! - feed changes → activity items

mod counter;
mod format;
mod probability;
mod quality;
mod render;
mod terminal;

pub use counter::{Counter, CounterAnimation, DEFAULT_DURATION, DEFAULT_STEPS};
pub use format::{millis, percent, whole_percent, ConfidenceBadge, Tier};
pub use probability::{rank, ProbabilityRow};
pub use quality::{QualityBar, QualityPanel};
pub use render::{chart_slices, ActivityItem, ChartSlice, CounterKind, DisplaySink, RenderOp};
pub use terminal::TerminalSink;

use std::time::Duration;

use crate::live::ConnectionState;
use crate::model::{ActivityFeed, ClassificationEvent, StatisticsSnapshot};

/// Derives render instructions from snapshots and events
#[derive(Debug, Clone)]
pub struct DisplayAggregator {
    fresh: Counter,
    spoiled: Counter,
    other: Counter,
    total: Counter,
    steps: u32,
    duration: Duration,
}

impl DisplayAggregator {
    pub fn new(steps: u32, duration: Duration) -> Self {
        Self {
            fresh: Counter::default(),
            spoiled: Counter::default(),
            other: Counter::default(),
            total: Counter::default(),
            steps,
            duration,
        }
    }

    /// Render a statistics snapshot
    pub fn statistics(&mut self, snapshot: &StatisticsSnapshot) -> Vec<RenderOp> {
        let counts = snapshot.category_counts;
        let (steps, duration) = (self.steps, self.duration);

        let mut ops = Vec::with_capacity(6);
        for (kind, counter, value) in [
            (CounterKind::Fresh, &mut self.fresh, counts.fresh_fruit),
            (CounterKind::Spoiled, &mut self.spoiled, counts.spoiled_fruit),
            (CounterKind::Other, &mut self.other, counts.other),
            (CounterKind::Total, &mut self.total, snapshot.total),
        ] {
            let animation = counter.set(value, steps, duration);
            ops.push(RenderOp::Counter {
                kind,
                value,
                animation,
            });
        }

        ops.push(RenderOp::Chart {
            slices: chart_slices(&counts),
        });
        ops.push(RenderOp::Metrics {
            confidence: format::percent(snapshot.avg_confidence),
            processing: format::millis(snapshot.avg_processing_time),
        });
        ops
    }

    /// Render the detail panels of a classification event
    pub fn classification(&self, event: &ClassificationEvent) -> Vec<RenderOp> {
        let mut ops = Vec::new();

        if let Some(quality) = &event.image_quality {
            let overall = event
                .quality_score
                .or_else(|| quality.overall.map(|o| o * 100.0))
                .unwrap_or(0.0);
            ops.push(RenderOp::Quality {
                panel: QualityPanel::new(quality, overall),
            });
        }

        if let Some(probabilities) = &event.all_probabilities {
            ops.push(RenderOp::Probabilities {
                rows: probability::rank(probabilities, &event.classification),
            });
        }

        if let Some(recommendation) = &event.recommendation {
            let clauses = recommendation.clauses();
            if !clauses.is_empty() {
                ops.push(RenderOp::Recommendations { clauses });
            }
        }

        ops
    }

    pub fn activity_prepended(&self, event: &ClassificationEvent, evicted: usize) -> RenderOp {
        RenderOp::ActivityPrepended {
            item: ActivityItem::from_event(event),
            evicted,
        }
    }

    pub fn activity_replaced(&self, feed: &ActivityFeed) -> RenderOp {
        RenderOp::ActivityReplaced {
            items: feed.iter().map(ActivityItem::from_event).collect(),
        }
    }

    pub fn connection(&self, state: ConnectionState) -> RenderOp {
        RenderOp::ConnectionStatus { state }
    }

    /// Last displayed value of a counter
    pub fn displayed(&self, kind: CounterKind) -> u64 {
        match kind {
            CounterKind::Fresh => self.fresh.displayed(),
            CounterKind::Spoiled => self.spoiled.displayed(),
            CounterKind::Other => self.other.displayed(),
            CounterKind::Total => self.total.displayed(),
        }
    }
}

impl Default for DisplayAggregator {
    fn default() -> Self {
        Self::new(DEFAULT_STEPS, DEFAULT_DURATION)
    }
}
