use std::collections::HashMap;
use std::sync::Arc;

use callscope_protocol::{ClockType, FilterType, MethodId, Summary, TimeRange};
use tracing::{debug, trace};

use super::interval::{children_intersection, intersection};
use super::{Aggregate, LazyList, group_by_merge_key, start_order};
use crate::model::{CaptureForest, MethodModel, NodeId, TreeId};

/// Callee-to-caller view.
///
/// The root lists every distinct method executed beneath the selection; each
/// level below climbs one frame further up the call stacks those methods
/// were invoked from.
pub enum BottomUp<'a> {
    Root(BottomUpRoot<'a>),
    Child(BottomUpChild<'a>),
}

/// Synthetic anchor over one or more selected subtrees.
pub struct BottomUpRoot<'a> {
    forest: &'a CaptureForest,
    id: MethodId,
    method: MethodModel,
    nodes: Arc<[NodeId]>,
    children: LazyList<'a, BottomUp<'a>>,
}

/// Method `id` as reached through a particular chain of callers.
///
/// `nodes[i]` is an occurrence of the method the chain started from and
/// `path_nodes[i]` is the caller of that occurrence currently being grouped
/// on, `depth - 1` frames above it.
pub struct BottomUpChild<'a> {
    forest: &'a CaptureForest,
    id: MethodId,
    path_nodes: Arc<[NodeId]>,
    nodes: Arc<[NodeId]>,
    children: LazyList<'a, BottomUp<'a>>,
}

impl<'a> BottomUp<'a> {
    /// # Panics
    ///
    /// If `node` does not belong to `forest`.
    pub fn root_at(forest: &'a CaptureForest, node: NodeId) -> Self {
        Self::root_at_many(forest, &[node])
    }

    /// A single root merging several independent selections, such as
    /// multiple threads picked at once. Repeated ids are ignored and the
    /// result does not depend on the order of `selected`.
    ///
    /// # Panics
    ///
    /// If any id in `selected` does not belong to `forest`.
    pub fn root_at_many(forest: &'a CaptureForest, selected: &[NodeId]) -> Self {
        let mut roots: Vec<NodeId> = Vec::with_capacity(selected.len());
        for &node in selected {
            if !roots.contains(&node) {
                roots.push(node);
            }
        }
        roots.sort_by(|&a, &b| start_order(forest, a, b));
        let nodes: Arc<[NodeId]> = roots.into();
        let traversed = Arc::clone(&nodes);
        let children = LazyList::deferred(move || {
            // Synthetic anchors carry no method and never become entries.
            let visited = traversed
                .iter()
                .flat_map(|&root| forest.pre_order(root))
                .filter(|&n| !forest.node(n).id().is_synthetic())
                .map(|n| (n, n));
            let children = build_children(forest, visited);
            debug!(
                selected = traversed.len(),
                children = children.len(),
                "materialized bottom-up root"
            );
            children
        });
        BottomUp::Root(BottomUpRoot {
            forest,
            id: MethodId::synthetic(),
            method: MethodModel::synthetic(),
            nodes,
            children,
        })
    }

    fn child(forest: &'a CaptureForest, id: MethodId, pairs: Vec<(NodeId, NodeId)>) -> Self {
        let (path_nodes, nodes): (Vec<NodeId>, Vec<NodeId>) = pairs.into_iter().unzip();
        let path_nodes: Arc<[NodeId]> = path_nodes.into();
        let nodes: Arc<[NodeId]> = nodes.into();

        let content_paths = Arc::clone(&path_nodes);
        let content_nodes = Arc::clone(&nodes);
        let origin_paths = Arc::clone(&path_nodes);
        let child_id = id.clone();
        let children = LazyList::new(
            move || {
                let callers = content_paths
                    .iter()
                    .zip(content_nodes.iter())
                    .filter_map(|(&path, &node)| {
                        caller_of(forest, path).map(|caller| (caller, node))
                    });
                let children = build_children(forest, callers);
                debug!(
                    id = %child_id,
                    merged = content_nodes.len(),
                    children = children.len(),
                    "materialized bottom-up children"
                );
                children
            },
            move || origin_paths.iter().all(|&path| caller_of(forest, path).is_none()),
        );
        BottomUp::Child(BottomUpChild {
            forest,
            id,
            path_nodes,
            nodes,
            children,
        })
    }

    pub fn is_root(&self) -> bool {
        matches!(self, BottomUp::Root(_))
    }

    /// The callers currently being grouped on; for the root, the selection.
    pub fn path_nodes(&self) -> &[NodeId] {
        match self {
            BottomUp::Root(root) => &root.nodes,
            BottomUp::Child(child) => &child.path_nodes,
        }
    }
}

/// The frame that called `node`, unless the stack ends there or reaches a
/// synthetic anchor.
fn caller_of(forest: &CaptureForest, node: NodeId) -> Option<NodeId> {
    forest
        .parent(node)
        .filter(|&parent| !forest.node(parent).id().is_synthetic())
}

fn build_children<'a>(
    forest: &'a CaptureForest,
    pairs: impl IntoIterator<Item = (NodeId, NodeId)>,
) -> Vec<BottomUp<'a>> {
    group_by_merge_key(forest, pairs, |&(path, _)| path, |&(_, node)| node)
        .into_iter()
        .map(|(id, group)| BottomUp::child(forest, id, group))
        .collect()
}

impl<'a> Aggregate<'a> for BottomUp<'a> {
    fn forest(&self) -> &'a CaptureForest {
        match self {
            BottomUp::Root(root) => root.forest,
            BottomUp::Child(child) => child.forest,
        }
    }

    fn id(&self) -> &MethodId {
        match self {
            BottomUp::Root(root) => &root.id,
            BottomUp::Child(child) => &child.id,
        }
    }

    fn nodes(&self) -> &[NodeId] {
        match self {
            BottomUp::Root(root) => &root.nodes,
            BottomUp::Child(child) => &child.nodes,
        }
    }

    fn children(&self) -> &LazyList<'a, Self> {
        match self {
            BottomUp::Root(root) => &root.children,
            BottomUp::Child(child) => &child.children,
        }
    }

    fn method_model(&self) -> &MethodModel {
        match self {
            BottomUp::Root(root) => &root.method,
            BottomUp::Child(child) => child.forest.node(child.path_nodes[0]).method(),
        }
    }

    fn filter_type(&self) -> FilterType {
        match self {
            BottomUp::Root(_) => FilterType::Match,
            BottomUp::Child(child) => child.forest.node(child.path_nodes[0]).filter_type(),
        }
    }

    /// Only the outermost occurrence of an overlapping chain (e.g. a method
    /// calling itself) counts towards `total`, tracked separately for every
    /// originating tree so interleaved selections stay independent. Self time
    /// is taken per occurrence.
    fn total_over(&self, clock: ClockType, range: TimeRange) -> Summary {
        let forest = self.forest();
        let mut total = 0.0;
        let mut self_time = 0.0;
        // Outermost occurrence not yet counted, per originating tree.
        let mut outer_by_tree: HashMap<TreeId, usize> = HashMap::new();
        let mut outer: Vec<NodeId> = Vec::new();

        for &id in self.nodes() {
            let node = forest.node(id);
            match outer_by_tree.get(&node.tree()) {
                Some(&slot) => {
                    let pending = outer[slot];
                    if node.end_global() > forest.node(pending).end_global() {
                        trace!(%pending, next = %id, "flushing outermost occurrence");
                        total += intersection(forest, pending, clock, range);
                        outer[slot] = id;
                    }
                }
                None => {
                    outer_by_tree.insert(node.tree(), outer.len());
                    outer.push(id);
                }
            }
            self_time += intersection(forest, id, clock, range)
                - children_intersection(forest, id, clock, range);
        }
        for pending in outer {
            total += intersection(forest, pending, clock, range);
        }
        Summary::new(total, total - self_time)
    }
}

impl std::fmt::Debug for BottomUp<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BottomUp::Root(root) => f
                .debug_struct("BottomUp::Root")
                .field("nodes", &root.nodes)
                .field("children", &root.children)
                .finish(),
            BottomUp::Child(child) => f
                .debug_struct("BottomUp::Child")
                .field("id", &child.id)
                .field("path_nodes", &child.path_nodes)
                .field("nodes", &child.nodes)
                .field("children", &child.children)
                .finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NodeData;

    fn add(forest: &mut CaptureForest, parent: Option<NodeId>, name: &str, start: f64, end: f64) -> NodeId {
        let data = NodeData::new(MethodModel::new(name), start, end);
        let added = match parent {
            Some(parent) => forest.add_child(parent, data),
            None => forest.add_root(data),
        };
        added.unwrap()
    }

    fn find<'b, 'a>(list: &'b LazyList<'a, BottomUp<'a>>, id: &str) -> Option<&'b BottomUp<'a>> {
        list.iter().find(|c| c.id() == &MethodId::from(id))
    }

    fn ids<'a>(list: &LazyList<'a, BottomUp<'a>>) -> Vec<String> {
        list.iter().map(|c| c.id().to_string()).collect()
    }

    #[test]
    fn root_lists_every_distinct_method() {
        let mut forest = CaptureForest::new();
        let main = add(&mut forest, None, "main", 0.0, 100.0);
        let a = add(&mut forest, Some(main), "a", 0.0, 50.0);
        add(&mut forest, Some(a), "c", 10.0, 20.0);
        let b = add(&mut forest, Some(main), "b", 50.0, 100.0);
        add(&mut forest, Some(b), "c", 60.0, 70.0);

        let root = BottomUp::root_at(&forest, main);
        assert!(root.is_root());
        assert!(root.id().is_synthetic());
        assert_eq!(ids(root.children()), vec!["main", "a", "c", "b"]);
        let c = find(root.children(), "c");
        assert_eq!(c.map(|c| c.nodes().len()), Some(2));
    }

    #[test]
    fn children_climb_to_callers() {
        let mut forest = CaptureForest::new();
        let main = add(&mut forest, None, "main", 0.0, 100.0);
        let a = add(&mut forest, Some(main), "a", 0.0, 50.0);
        let c1 = add(&mut forest, Some(a), "c", 10.0, 20.0);
        let b = add(&mut forest, Some(main), "b", 50.0, 100.0);
        let c2 = add(&mut forest, Some(b), "c", 60.0, 90.0);

        let root = BottomUp::root_at(&forest, main);
        let Some(c) = find(root.children(), "c") else {
            panic!("c missing from bottom-up root");
        };
        assert_eq!(ids(c.children()), vec!["a", "b"]);

        // Each caller still reports the time of the callee it was reached from.
        let Some(via_b) = find(c.children(), "b") else {
            panic!("b missing under c");
        };
        assert_eq!(via_b.nodes(), &[c2]);
        assert_eq!(via_b.path_nodes(), &[b]);
        let s = via_b.total_over(ClockType::Global, TimeRange::unbounded());
        assert!((s.total - 30.0).abs() < f64::EPSILON);

        let Some(via_a) = find(c.children(), "a") else {
            panic!("a missing under c");
        };
        assert_eq!(via_a.nodes(), &[c1]);
        assert_eq!(ids(via_a.children()), vec!["main"]);
    }

    #[test]
    fn emptiness_known_at_stack_origin() {
        let mut forest = CaptureForest::new();
        let main = add(&mut forest, None, "main", 0.0, 10.0);
        let root = BottomUp::root_at(&forest, main);
        let Some(entry) = find(root.children(), "main") else {
            panic!("main missing from bottom-up root");
        };
        assert!(entry.children().is_empty());
        assert!(!entry.children().is_materialized());
    }

    #[test]
    fn synthetic_anchor_is_excluded() {
        let mut forest = CaptureForest::new();
        let anchor = forest
            .add_root(NodeData::new(MethodModel::synthetic(), 0.0, 100.0))
            .unwrap();
        add(&mut forest, Some(anchor), "run", 0.0, 40.0);

        let root = BottomUp::root_at(&forest, anchor);
        assert_eq!(ids(root.children()), vec!["run"]);
        // The anchor is not reported as a caller either.
        assert!(root.children()[0].children().is_empty());
        assert_eq!(root.children()[0].children().len(), 0);
    }

    #[test]
    fn recursion_counts_outermost_occurrence_only() {
        let mut forest = CaptureForest::new();
        let f0 = add(&mut forest, None, "foo", 0.0, 100.0);
        let f1 = add(&mut forest, Some(f0), "foo", 10.0, 90.0);
        add(&mut forest, Some(f1), "foo", 20.0, 80.0);

        let root = BottomUp::root_at(&forest, f0);
        assert_eq!(root.children().len(), 1);
        let foo = &root.children()[0];
        let s = foo.total_over(ClockType::Global, TimeRange::new(0.0, 100.0));
        assert_eq!(s, Summary::new(100.0, 0.0));
    }

    #[test]
    fn independent_trees_are_tracked_separately() {
        let mut forest = CaptureForest::new();
        let r1 = add(&mut forest, None, "R1", 0.0, 10.0);
        add(&mut forest, Some(r1), "foo", 0.0, 10.0);
        let r2 = add(&mut forest, None, "R2", 20.0, 30.0);
        add(&mut forest, Some(r2), "foo", 20.0, 30.0);

        let root = BottomUp::root_at_many(&forest, &[r1, r2]);
        let foos: Vec<_> = root.children().iter().filter(|c| c.id() == &MethodId::from("foo")).collect();
        assert_eq!(foos.len(), 1);
        let s = foos[0].total_over(ClockType::Global, TimeRange::new(0.0, 30.0));
        assert!((s.total - 20.0).abs() < f64::EPSILON);
    }

    #[test]
    fn interleaved_trees_do_not_swallow_each_other() {
        // Thread 2's occurrence sits inside thread 1's in time but belongs to
        // a different tree, so both count.
        let mut forest = CaptureForest::new();
        let t1 = add(&mut forest, None, "thread-1", 0.0, 100.0);
        add(&mut forest, Some(t1), "work", 0.0, 100.0);
        let t2 = add(&mut forest, None, "thread-2", 10.0, 50.0);
        add(&mut forest, Some(t2), "work", 10.0, 50.0);

        let root = BottomUp::root_at_many(&forest, &[t1, t2]);
        let Some(work) = find(root.children(), "work") else {
            panic!("work missing from bottom-up root");
        };
        let s = work.total_over(ClockType::Global, TimeRange::unbounded());
        assert!((s.total - 140.0).abs() < f64::EPSILON);
    }

    #[test]
    fn repeated_selection_is_deduplicated() {
        let mut forest = CaptureForest::new();
        let r = add(&mut forest, None, "main", 0.0, 10.0);
        let root = BottomUp::root_at_many(&forest, &[r, r]);
        assert_eq!(root.nodes(), &[r]);
        assert_eq!(root.children()[0].nodes().len(), 1);
    }

    #[test]
    fn self_time_excludes_callees() {
        let mut forest = CaptureForest::new();
        let main = add(&mut forest, None, "main", 0.0, 100.0);
        add(&mut forest, Some(main), "a", 20.0, 50.0);

        let root = BottomUp::root_at(&forest, main);
        let Some(entry) = find(root.children(), "main") else {
            panic!("main missing from bottom-up root");
        };
        let s = entry.total_over(ClockType::Global, TimeRange::unbounded());
        assert_eq!(s, Summary::new(100.0, 30.0));
    }

    #[test]
    fn occurrences_count_regardless_of_capture_order() {
        // The later call was recorded first.
        let mut forest = CaptureForest::new();
        let main = add(&mut forest, None, "main", 0.0, 100.0);
        let late = add(&mut forest, Some(main), "foo", 50.0, 60.0);
        let early = add(&mut forest, Some(main), "foo", 0.0, 10.0);

        let root = BottomUp::root_at(&forest, main);
        let Some(foo) = find(root.children(), "foo") else {
            panic!("foo missing from bottom-up root");
        };
        assert_eq!(foo.nodes(), &[early, late]);
        let s = foo.total_over(ClockType::Global, TimeRange::unbounded());
        assert_eq!(s, Summary::new(20.0, 0.0));
    }

    #[test]
    fn selection_order_does_not_change_totals() {
        let mut forest = CaptureForest::new();
        let main = add(&mut forest, None, "main", 0.0, 100.0);
        let a = add(&mut forest, Some(main), "a", 0.0, 40.0);
        add(&mut forest, Some(a), "foo", 0.0, 10.0);
        let b = add(&mut forest, Some(main), "b", 50.0, 90.0);
        add(&mut forest, Some(b), "foo", 50.0, 80.0);

        for selection in [[a, b], [b, a]] {
            let root = BottomUp::root_at_many(&forest, &selection);
            assert_eq!(root.nodes(), &[a, b]);
            let Some(foo) = find(root.children(), "foo") else {
                panic!("foo missing from bottom-up root");
            };
            let s = foo.total_over(ClockType::Global, TimeRange::unbounded());
            assert!((s.total - 40.0).abs() < f64::EPSILON);
        }
    }

    #[test]
    #[should_panic]
    fn foreign_node_panics() {
        let mut forest = CaptureForest::new();
        add(&mut forest, None, "main", 0.0, 10.0);
        let root = BottomUp::root_at(&forest, NodeId(7));
        assert_eq!(root.children().len(), 0);
    }
}
