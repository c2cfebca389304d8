//! Bounded activity feed
//!
//! Most-recent-first list of classification events. Seeded from the history
//! endpoint and prepended to on every live event; the oldest entries fall off
//! the end once the capacity is reached.

use std::collections::VecDeque;

use super::types::ClassificationEvent;

/// Default number of entries kept in the feed
pub const DEFAULT_FEED_CAPACITY: usize = 20;

/// Most-recent-first ring of classification events
#[derive(Debug, Clone)]
pub struct ActivityFeed {
    entries: VecDeque<ClassificationEvent>,
    capacity: usize,
}

impl ActivityFeed {
    /// Create an empty feed; a zero capacity is treated as one
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Add the newest event at the front, evicting from the back on overflow
    ///
    /// Returns the number of evicted entries.
    pub fn push_front(&mut self, event: ClassificationEvent) -> usize {
        self.entries.push_front(event);
        self.truncate()
    }

    /// Replace the contents with a history listing (already newest-first)
    pub fn replace_with_history(&mut self, history: Vec<ClassificationEvent>) {
        self.entries = history.into_iter().take(self.capacity).collect();
    }

    fn truncate(&mut self) -> usize {
        let mut evicted = 0;
        while self.entries.len() > self.capacity {
            self.entries.pop_back();
            evicted += 1;
        }
        evicted
    }

    pub fn latest(&self) -> Option<&ClassificationEvent> {
        self.entries.front()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ClassificationEvent> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for ActivityFeed {
    fn default() -> Self {
        Self::new(DEFAULT_FEED_CAPACITY)
    }
}
