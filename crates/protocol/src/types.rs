use serde::{Deserialize, Serialize};

/// Which of a node's two timestamp pairs a query reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClockType {
    /// Wall-clock time, regardless of thread scheduling.
    #[default]
    Global,
    /// Time during which the owning thread was actually scheduled.
    Thread,
}

/// Whether a captured node satisfied the user's search/filter predicate.
///
/// Matched and unmatched occurrences of the same method are never merged
/// into one aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterType {
    #[default]
    Match,
    Unmatch,
}

/// A closed query interval on one clock's time axis.
///
/// A range with `max < min` is tolerated and intersects nothing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeRange {
    pub min: f64,
    pub max: f64,
}

impl TimeRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// A range covering every finite timestamp.
    pub fn unbounded() -> Self {
        Self {
            min: f64::MIN,
            max: f64::MAX,
        }
    }

    pub fn length(&self) -> f64 {
        self.max - self.min
    }

    /// Length of the overlap between this range and `[start, end]`, never
    /// negative.
    pub fn intersection_length(&self, start: f64, end: f64) -> f64 {
        let lo = self.min.max(start);
        let hi = self.max.min(end);
        (hi - lo).max(0.0)
    }

    /// Whether `[start, end]` overlaps this range by more than a point.
    pub fn intersects(&self, start: f64, end: f64) -> bool {
        start < self.max && self.min < end
    }
}

impl Default for TimeRange {
    fn default() -> Self {
        Self::unbounded()
    }
}

/// Duration totals of one aggregate over one range in one clock domain.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Summary {
    /// Time spent in this call-stack path, callees included.
    pub total: f64,
    /// Part of `total` attributable to callees.
    pub children_total: f64,
}

impl Summary {
    pub fn new(total: f64, children_total: f64) -> Self {
        Self {
            total,
            children_total,
        }
    }

    /// Time spent in the method's own code.
    pub fn self_time(&self) -> f64 {
        self.total - self.children_total
    }
}
