use callscope_protocol::{ClockType, TimeRange};

use crate::model::{CaptureForest, NodeId};

/// Overlap between `node`'s lifetime in `clock` and `range`.
pub fn intersection(
    forest: &CaptureForest,
    node: NodeId,
    clock: ClockType,
    range: TimeRange,
) -> f64 {
    let (start, end) = forest.node(node).interval(clock);
    range.intersection_length(start, end)
}

/// Sum of [`intersection`] over the direct children of `node`.
pub fn children_intersection(
    forest: &CaptureForest,
    node: NodeId,
    clock: ClockType,
    range: TimeRange,
) -> f64 {
    forest
        .node(node)
        .children()
        .iter()
        .map(|&child| intersection(forest, child, clock, range))
        .sum()
}
