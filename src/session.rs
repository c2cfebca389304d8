//! Dashboard Session
//!
//! The single owned object holding everything the dashboard displays: the
//! latest statistics snapshot, the activity feed and the display aggregator's
//! counter state. It is created once, driven by the live client's event loop
//! and dropped on shutdown. Every mutation renders straight to the sink.

use chrono::Utc;

use crate::display::{DisplayAggregator, DisplaySink, RenderOp};
use crate::live::{ConnectionState, InboundMessage};
use crate::model::{ActivityFeed, ClassificationEvent, StatisticsSnapshot};

/// What the caller should do after a message was handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reaction {
    /// Nothing changed (malformed or unknown message)
    Ignored,
    /// Display state was updated
    Updated,
    /// Display state was updated and statistics should be refetched
    RefetchStatistics,
}

/// Owned dashboard state plus the sink it renders into
pub struct DashboardSession {
    snapshot: Option<StatisticsSnapshot>,
    feed: ActivityFeed,
    display: DisplayAggregator,
    sink: Box<dyn DisplaySink>,
}

impl DashboardSession {
    pub fn new(feed_capacity: usize, display: DisplayAggregator, sink: Box<dyn DisplaySink>) -> Self {
        Self {
            snapshot: None,
            feed: ActivityFeed::new(feed_capacity),
            display,
            sink,
        }
    }

    /// Handle a raw text frame from the live connection
    ///
    /// Malformed frames are logged and dropped without touching the display.
    pub fn handle_text(&mut self, text: &str) -> Reaction {
        match InboundMessage::decode(text) {
            Ok(InboundMessage::Stats { data }) => {
                self.apply_statistics(data);
                Reaction::Updated
            }
            Ok(InboundMessage::Classification { data }) => {
                self.apply_classification(data);
                // The pushed event may be ahead of the aggregates; re-derive them
                Reaction::RefetchStatistics
            }
            Ok(InboundMessage::Unknown) => {
                tracing::debug!("Ignoring message with unknown type");
                Reaction::Ignored
            }
            Err(e) => {
                tracing::warn!(error = %e, len = text.len(), "Dropping malformed live message");
                Reaction::Ignored
            }
        }
    }

    /// Replace the statistics snapshot and refresh counters, chart and metrics
    pub fn apply_statistics(&mut self, snapshot: StatisticsSnapshot) {
        let snapshot = snapshot.sanitized();
        let ops = self.display.statistics(&snapshot);
        self.snapshot = Some(snapshot);
        self.render_all(ops);
    }

    /// Show a new classification and prepend it to the activity feed
    pub fn apply_classification(&mut self, mut event: ClassificationEvent) {
        if event.timestamp.is_none() {
            event.timestamp = Some(Utc::now().timestamp_millis() as f64 / 1000.0);
        }

        let ops = self.display.classification(&event);
        self.render_all(ops);

        let evicted = self.feed.push_front(event);
        if let Some(latest) = self.feed.latest() {
            let op = self.display.activity_prepended(latest, evicted);
            self.render(op);
        }
    }

    /// Seed the activity feed from a history listing
    ///
    /// An empty listing keeps whatever the feed already shows.
    pub fn load_history(&mut self, history: Vec<ClassificationEvent>) {
        if history.is_empty() {
            return;
        }
        self.feed.replace_with_history(history);
        let op = self.display.activity_replaced(&self.feed);
        self.render(op);
    }

    /// Update the status indicator
    pub fn connection_changed(&mut self, state: ConnectionState) {
        let op = self.display.connection(state);
        self.render(op);
    }

    pub fn snapshot(&self) -> Option<&StatisticsSnapshot> {
        self.snapshot.as_ref()
    }

    pub fn feed(&self) -> &ActivityFeed {
        &self.feed
    }

    pub fn display(&self) -> &DisplayAggregator {
        &self.display
    }

    fn render_all(&mut self, ops: Vec<RenderOp>) {
        for op in ops {
            self.render(op);
        }
    }

    fn render(&mut self, op: RenderOp) {
        self.sink.render(op);
    }
}
