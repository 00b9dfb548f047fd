use serde::{Deserialize, Serialize};

/// Inclusive `[start, end]` interval of source-clock timestamps.
///
/// Any range with `start > end` is empty. [`TimeRange::EMPTY`] is the
/// canonical empty value returned by stores that hold no matching records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: i64,
    pub end: i64,
}

impl TimeRange {
    pub const EMPTY: TimeRange = TimeRange {
        start: i64::MAX,
        end: i64::MIN,
    };

    /// Every representable timestamp
    pub const ALL: TimeRange = TimeRange {
        start: i64::MIN,
        end: i64::MAX,
    };

    pub fn new(start: i64, end: i64) -> Self {
        Self { start, end }
    }

    pub fn is_empty(&self) -> bool {
        self.start > self.end
    }

    /// Smallest range covering both ranges; empty ranges are ignored
    pub fn union(self, other: TimeRange) -> Self {
        match (self.is_empty(), other.is_empty()) {
            (true, _) => other,
            (_, true) => self,
            _ => Self {
                start: self.start.min(other.start),
                end: self.end.max(other.end),
            },
        }
    }

    /// `(start, end)` or `None` when empty
    pub fn bounds(&self) -> Option<(i64, i64)> {
        if self.is_empty() {
            None
        } else {
            Some((self.start, self.end))
        }
    }

    /// Build from optional min/max as returned by aggregate queries
    pub fn from_bounds(min: Option<i64>, max: Option<i64>) -> Self {
        match (min, max) {
            (Some(start), Some(end)) => Self { start, end },
            _ => Self::EMPTY,
        }
    }
}
