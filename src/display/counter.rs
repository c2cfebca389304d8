//! Animated numeric counters
//!
//! A counter moves from the last displayed value to a new value in equal
//! steps. Intermediate frames are rounded; the last frame is always the exact
//! target.

use std::time::Duration;

/// Default number of interpolation steps
pub const DEFAULT_STEPS: u32 = 20;

/// Default total animation duration
pub const DEFAULT_DURATION: Duration = Duration::from_millis(500);

/// Equal-step interpolation between two counter values
#[derive(Debug, Clone, PartialEq)]
pub struct CounterAnimation {
    from: u64,
    to: u64,
    steps: u32,
    duration: Duration,
}

impl CounterAnimation {
    /// Plan an animation; returns `None` when there is nothing to animate
    pub fn plan(from: u64, to: u64, steps: u32, duration: Duration) -> Option<Self> {
        if from == to {
            return None;
        }
        Some(Self {
            from,
            to,
            steps: steps.max(1),
            duration,
        })
    }

    pub fn from(&self) -> u64 {
        self.from
    }

    pub fn to(&self) -> u64 {
        self.to
    }

    /// Delay between consecutive frames
    pub fn frame_interval(&self) -> Duration {
        self.duration / self.steps
    }

    /// Values to display, one per step
    pub fn frames(&self) -> Vec<u64> {
        let start = self.from as f64;
        let step = (self.to as f64 - start) / self.steps as f64;

        (1..=self.steps)
            .map(|i| {
                if i == self.steps {
                    self.to
                } else {
                    (start + step * i as f64).round().max(0.0) as u64
                }
            })
            .collect()
    }
}

/// A displayed counter that remembers its last rendered value
#[derive(Debug, Clone, Default)]
pub struct Counter {
    displayed: u64,
}

impl Counter {
    pub fn displayed(&self) -> u64 {
        self.displayed
    }

    /// Move to a new value, returning the animation to play (if any)
    pub fn set(&mut self, value: u64, steps: u32, duration: Duration) -> Option<CounterAnimation> {
        let animation = CounterAnimation::plan(self.displayed, value, steps, duration);
        self.displayed = value;
        animation
    }
}
