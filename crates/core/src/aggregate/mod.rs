//! Lazily expanded top-down and bottom-up views over a capture forest.

mod bottom_up;
pub mod interval;
mod lazy_list;
mod top_down;

pub use bottom_up::{BottomUp, BottomUpChild, BottomUpRoot};
pub use lazy_list::LazyList;
pub use top_down::TopDown;

use std::cmp::Ordering;
use std::collections::HashMap;

use callscope_protocol::{ClockType, FilterType, MethodId, Summary, TimeRange};

use crate::model::{CaptureForest, MethodModel, NodeId};

/// A node of an aggregated call tree: a set of captured nodes that are
/// equivalent under the merge rule (same filter type, same method id).
///
/// Aggregates borrow the forest they were built from and never mutate;
/// the only state they carry is the cached child list.
pub trait Aggregate<'a>: Sized {
    fn forest(&self) -> &'a CaptureForest;

    fn id(&self) -> &MethodId;

    /// The merged captured nodes, ordered by start time with ancestors
    /// before descendants.
    fn nodes(&self) -> &[NodeId];

    fn children(&self) -> &LazyList<'a, Self>;

    fn method_model(&self) -> &MethodModel;

    fn filter_type(&self) -> FilterType;

    fn is_unmatched(&self) -> bool {
        self.filter_type() == FilterType::Unmatch
    }

    fn total_over(&self, clock: ClockType, range: TimeRange) -> Summary;

    /// Whether any merged node's global interval overlaps `range`.
    fn overlaps_with(&self, range: TimeRange) -> bool {
        let forest = self.forest();
        self.nodes().iter().any(|&id| {
            let node = forest.node(id);
            range.intersects(node.start_global(), node.end_global())
        })
    }
}

/// Group `items` by the merge key of the node `key_of` picks from each,
/// keeping first-seen order of the groups.
///
/// Within a group, items are ordered by the global start of the occurrence
/// `occurrence_of` picks, ancestors first on ties, whatever order they were
/// captured or selected in. Bottom-up totals depend on this order.
pub(crate) fn group_by_merge_key<T>(
    forest: &CaptureForest,
    items: impl IntoIterator<Item = T>,
    key_of: impl Fn(&T) -> NodeId,
    occurrence_of: impl Fn(&T) -> NodeId,
) -> Vec<(MethodId, Vec<T>)> {
    let mut slots: HashMap<(bool, MethodId), usize> = HashMap::new();
    let mut groups: Vec<(MethodId, Vec<T>)> = Vec::new();
    for item in items {
        let node = forest.node(key_of(&item));
        let slot = *slots
            .entry((node.is_unmatched(), node.id().clone()))
            .or_insert_with(|| {
                groups.push((node.id().clone(), Vec::new()));
                groups.len() - 1
            });
        groups[slot].1.push(item);
    }
    for (_, group) in &mut groups {
        group.sort_by(|a, b| start_order(forest, occurrence_of(a), occurrence_of(b)));
    }
    groups
}

/// Global start time, then ancestor before descendant. A parent always
/// exists before its children are added, so it has the smaller index.
pub(crate) fn start_order(forest: &CaptureForest, a: NodeId, b: NodeId) -> Ordering {
    forest
        .node(a)
        .start_global()
        .total_cmp(&forest.node(b).start_global())
        .then(a.cmp(&b))
}
