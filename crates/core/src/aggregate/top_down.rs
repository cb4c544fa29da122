use std::sync::Arc;

use callscope_protocol::{ClockType, FilterType, MethodId, Summary, TimeRange};
use tracing::debug;

use super::interval::{children_intersection, intersection};
use super::{Aggregate, LazyList, group_by_merge_key};
use crate::model::{CaptureForest, MethodModel, NodeId};

/// Caller-to-callee view: siblings invoking the same method are merged at
/// every level below the chosen root.
pub struct TopDown<'a> {
    forest: &'a CaptureForest,
    id: MethodId,
    nodes: Arc<[NodeId]>,
    children: LazyList<'a, TopDown<'a>>,
}

impl<'a> TopDown<'a> {
    /// View rooted at a single captured node.
    ///
    /// # Panics
    ///
    /// If `node` does not belong to `forest`.
    pub fn root_at(forest: &'a CaptureForest, node: NodeId) -> Self {
        Self::merged(forest, forest.node(node).id().clone(), vec![node])
    }

    /// One view per distinct merge key among `nodes`, as if the selected
    /// nodes were siblings. Panics on ids from another forest.
    pub fn roots_at(forest: &'a CaptureForest, nodes: &[NodeId]) -> Vec<Self> {
        group_by_merge_key(forest, nodes.iter().copied(), |&n| n, |&n| n)
            .into_iter()
            .map(|(id, group)| Self::merged(forest, id, group))
            .collect()
    }

    fn merged(forest: &'a CaptureForest, id: MethodId, nodes: Vec<NodeId>) -> Self {
        let nodes: Arc<[NodeId]> = nodes.into();
        let content_nodes = Arc::clone(&nodes);
        let leaf_nodes = Arc::clone(&nodes);
        let parent_id = id.clone();
        let children = LazyList::new(
            move || {
                let callees = content_nodes
                    .iter()
                    .flat_map(|&n| forest.node(n).children().iter().copied());
                let children: Vec<_> = group_by_merge_key(forest, callees, |&n| n, |&n| n)
                    .into_iter()
                    .map(|(id, group)| TopDown::merged(forest, id, group))
                    .collect();
                debug!(
                    id = %parent_id,
                    merged = content_nodes.len(),
                    children = children.len(),
                    "materialized top-down children"
                );
                children
            },
            move || leaf_nodes.iter().all(|&n| forest.node(n).child_count() == 0),
        );
        Self {
            forest,
            id,
            nodes,
            children,
        }
    }
}

impl<'a> Aggregate<'a> for TopDown<'a> {
    fn forest(&self) -> &'a CaptureForest {
        self.forest
    }

    fn id(&self) -> &MethodId {
        &self.id
    }

    fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    fn children(&self) -> &LazyList<'a, Self> {
        &self.children
    }

    fn method_model(&self) -> &MethodModel {
        self.forest.node(self.nodes[0]).method()
    }

    fn filter_type(&self) -> FilterType {
        self.forest.node(self.nodes[0]).filter_type()
    }

    fn total_over(&self, clock: ClockType, range: TimeRange) -> Summary {
        let mut total = 0.0;
        let mut children_total = 0.0;
        for &node in self.nodes.iter() {
            total += intersection(self.forest, node, clock, range);
            children_total += children_intersection(self.forest, node, clock, range);
        }
        Summary::new(total, children_total)
    }
}

impl std::fmt::Debug for TopDown<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TopDown")
            .field("id", &self.id)
            .field("nodes", &self.nodes)
            .field("children", &self.children)
            .finish()
    }
}
