//! Mapping selections between the global and thread clock domains.
//!
//! Selections are made on the wall clock, which usually runs far ahead of a
//! thread's scheduled time. Both clocks are synced at the start of the
//! capture, so a thread-time query scales the selection by the thread's
//! `thread / global` ratio instead of using it as is.

use callscope_protocol::{ClockType, TimeRange};

use crate::model::CaptureNode;

/// Scale a wall-clock `selection` into `node`'s thread time.
pub fn to_thread_range(node: &CaptureNode, selection: TimeRange) -> TimeRange {
    let ratio = node.thread_global_ratio();
    let min = node.start_thread() + ratio * (selection.min - node.start_global());
    TimeRange::new(min, min + ratio * selection.length())
}

/// Inverse of [`to_thread_range`].
pub fn to_global_range(node: &CaptureNode, converted: TimeRange) -> TimeRange {
    let ratio = node.thread_global_ratio();
    if ratio <= 0.0 {
        // A thread that never ran maps everything onto its start.
        return TimeRange::new(node.start_global(), node.start_global());
    }
    let scale = 1.0 / ratio;
    let min = node.start_global() + scale * (converted.min - node.start_thread());
    TimeRange::new(min, min + scale * converted.length())
}

/// The range to query `clock` with for a wall-clock `selection`.
pub fn selection_for(clock: ClockType, node: &CaptureNode, selection: TimeRange) -> TimeRange {
    match clock {
        ClockType::Global => selection,
        ClockType::Thread => to_thread_range(node, selection),
    }
}
