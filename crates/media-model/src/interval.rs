//! Scored samples and time intervals.

use serde::{Deserialize, Serialize};

/// One metric value at one point in time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoredSample {
    /// Seconds, strictly increasing within a sequence.
    pub timestamp: f64,
    pub score: f64,
}

impl ScoredSample {
    pub fn new(timestamp: f64, score: f64) -> Self {
        Self { timestamp, score }
    }
}

/// A half-open time span `[start, end)` in seconds, with `start < end`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Interval {
    pub start: f64,
    pub end: f64,
}

impl Interval {
    /// Create an interval. Returns `None` unless `0 <= start < end` and both are finite.
    pub fn new(start: f64, end: f64) -> Option<Self> {
        if !start.is_finite() || !end.is_finite() || start < 0.0 || end <= start {
            return None;
        }
        Some(Self { start, end })
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    pub fn contains(&self, t: f64) -> bool {
        t >= self.start && t < self.end
    }
}

/// Sum of interval durations.
pub fn total_duration(intervals: &[Interval]) -> f64 {
    intervals.iter().map(Interval::duration).sum()
}
