use callscope_protocol::{ClockType, FilterType, MethodId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::MethodModel;

/// Index of a node inside its [`CaptureForest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub usize);

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identifies the originating tree of a node: the forest root it descends
/// from. Two nodes with different `TreeId`s never share a call stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TreeId(pub NodeId);

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("unknown node {0}")]
    UnknownNode(NodeId),
    #[error("{clock:?} interval of {method} ends before it starts ({start} > {end})")]
    InvertedInterval {
        method: MethodId,
        clock: ClockType,
        start: f64,
        end: f64,
    },
    #[error("{clock:?} interval of node {child} is not contained in its parent {parent}")]
    NotNested {
        child: NodeId,
        parent: NodeId,
        clock: ClockType,
    },
    #[error("node {0} is longer in thread time than in global time")]
    ThreadLongerThanGlobal(NodeId),
    #[error("selection contains no nodes")]
    EmptySelection,
}

/// Everything recorded about one invocation, as supplied by the importer.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeData {
    pub method: MethodModel,
    pub filter_type: FilterType,
    pub start_global: f64,
    pub end_global: f64,
    pub start_thread: f64,
    pub end_thread: f64,
}

impl NodeData {
    /// An invocation whose thread interval equals its global interval.
    pub fn new(method: MethodModel, start: f64, end: f64) -> Self {
        Self {
            method,
            filter_type: FilterType::Match,
            start_global: start,
            end_global: end,
            start_thread: start,
            end_thread: end,
        }
    }

    pub fn with_thread(mut self, start: f64, end: f64) -> Self {
        self.start_thread = start;
        self.end_thread = end;
        self
    }

    pub fn with_filter(mut self, filter_type: FilterType) -> Self {
        self.filter_type = filter_type;
        self
    }

    fn check_intervals(&self) -> Result<(), CaptureError> {
        for (clock, start, end) in [
            (ClockType::Global, self.start_global, self.end_global),
            (ClockType::Thread, self.start_thread, self.end_thread),
        ] {
            if start > end {
                return Err(CaptureError::InvertedInterval {
                    method: self.method.id().clone(),
                    clock,
                    start,
                    end,
                });
            }
        }
        Ok(())
    }
}

/// One recorded method invocation. Immutable once added to a forest.
#[derive(Debug, Clone)]
pub struct CaptureNode {
    data: NodeData,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    tree: TreeId,
}

impl CaptureNode {
    pub fn method(&self) -> &MethodModel {
        &self.data.method
    }

    pub fn id(&self) -> &MethodId {
        self.data.method.id()
    }

    pub fn filter_type(&self) -> FilterType {
        self.data.filter_type
    }

    pub fn is_unmatched(&self) -> bool {
        self.data.filter_type == FilterType::Unmatch
    }

    pub fn start_global(&self) -> f64 {
        self.data.start_global
    }

    pub fn end_global(&self) -> f64 {
        self.data.end_global
    }

    pub fn start_thread(&self) -> f64 {
        self.data.start_thread
    }

    pub fn end_thread(&self) -> f64 {
        self.data.end_thread
    }

    /// `(start, end)` in the given clock domain.
    pub fn interval(&self, clock: ClockType) -> (f64, f64) {
        match clock {
            ClockType::Global => (self.data.start_global, self.data.end_global),
            ClockType::Thread => (self.data.start_thread, self.data.end_thread),
        }
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    pub fn tree(&self) -> TreeId {
        self.tree
    }

    /// How much of its wall-clock lifetime the owning thread was scheduled.
    pub fn thread_global_ratio(&self) -> f64 {
        let global = self.data.end_global - self.data.start_global;
        if global <= 0.0 {
            return 1.0;
        }
        (self.data.end_thread - self.data.start_thread) / global
    }
}

/// Nested, serde-friendly description of a captured tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeSpec {
    pub name: String,
    #[serde(default)]
    pub class_name: Option<String>,
    #[serde(default)]
    pub signature: Option<String>,
    #[serde(default)]
    pub filter: FilterType,
    /// `[start, end]` in global time.
    pub global: [f64; 2],
    /// `[start, end]` in thread time; the global interval when absent.
    #[serde(default)]
    pub thread: Option<[f64; 2]>,
    #[serde(default)]
    pub children: Vec<NodeSpec>,
}

impl NodeSpec {
    fn to_data(&self) -> NodeData {
        let method = MethodModel::qualified(
            self.name.clone(),
            self.class_name.clone(),
            self.signature.clone(),
        );
        let [start, end] = self.global;
        let [thread_start, thread_end] = self.thread.unwrap_or(self.global);
        NodeData::new(method, start, end)
            .with_thread(thread_start, thread_end)
            .with_filter(self.filter)
    }
}

/// Arena owning every captured node of one or more call trees.
#[derive(Debug, Clone, Default)]
pub struct CaptureForest {
    nodes: Vec<CaptureNode>,
    roots: Vec<NodeId>,
}

impl CaptureForest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a forest with one tree per top-level [`NodeSpec`].
    pub fn from_specs(specs: &[NodeSpec]) -> Result<Self, CaptureError> {
        let mut forest = Self::new();
        let mut stack: Vec<(Option<NodeId>, &NodeSpec)> =
            specs.iter().rev().map(|spec| (None, spec)).collect();
        while let Some((parent, spec)) = stack.pop() {
            let data = spec.to_data();
            let id = match parent {
                Some(parent) => forest.add_child(parent, data)?,
                None => forest.add_root(data)?,
            };
            stack.extend(spec.children.iter().rev().map(|child| (Some(id), child)));
        }
        Ok(forest)
    }

    /// Start a new originating tree.
    pub fn add_root(&mut self, data: NodeData) -> Result<NodeId, CaptureError> {
        data.check_intervals()?;
        let id = NodeId(self.nodes.len());
        self.nodes.push(CaptureNode {
            data,
            parent: None,
            children: Vec::new(),
            tree: TreeId(id),
        });
        self.roots.push(id);
        Ok(id)
    }

    /// Append `data` as the last child of `parent`.
    pub fn add_child(&mut self, parent: NodeId, data: NodeData) -> Result<NodeId, CaptureError> {
        data.check_intervals()?;
        let tree = self.get(parent).ok_or(CaptureError::UnknownNode(parent))?.tree;
        let id = NodeId(self.nodes.len());
        self.nodes.push(CaptureNode {
            data,
            parent: Some(parent),
            children: Vec::new(),
            tree,
        });
        self.nodes[parent.0].children.push(id);
        Ok(id)
    }

    pub fn get(&self, id: NodeId) -> Option<&CaptureNode> {
        self.nodes.get(id.0)
    }

    /// The node behind an id handed out by this forest. Use [`Self::get`]
    /// for ids of unknown origin.
    ///
    /// # Panics
    ///
    /// If `id` was not handed out by this forest.
    pub fn node(&self, id: NodeId) -> &CaptureNode {
        &self.nodes[id.0]
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    /// The forest root `id` descends from.
    pub fn root_of(&self, id: NodeId) -> NodeId {
        self.node(id).tree.0
    }

    /// Depth-first walk of the subtree at `root`, parents before children and
    /// first child first.
    pub fn pre_order(&self, root: NodeId) -> PreOrder<'_> {
        PreOrder {
            forest: self,
            stack: vec![root],
        }
    }

    /// Check well-nesting in both clock domains and that no node runs longer
    /// on its thread than on the wall clock.
    pub fn validate(&self) -> Result<(), CaptureError> {
        for (index, node) in self.nodes.iter().enumerate() {
            let id = NodeId(index);
            let global = node.end_global() - node.start_global();
            let thread = node.end_thread() - node.start_thread();
            if thread > global {
                return Err(CaptureError::ThreadLongerThanGlobal(id));
            }
            let Some(parent_id) = node.parent else {
                continue;
            };
            let parent = self.node(parent_id);
            for clock in [ClockType::Global, ClockType::Thread] {
                let (start, end) = node.interval(clock);
                let (parent_start, parent_end) = parent.interval(clock);
                if start < parent_start || end > parent_end {
                    return Err(CaptureError::NotNested {
                        child: id,
                        parent: parent_id,
                        clock,
                    });
                }
            }
        }
        Ok(())
    }
}

/// Iterator returned by [`CaptureForest::pre_order`].
pub struct PreOrder<'a> {
    forest: &'a CaptureForest,
    stack: Vec<NodeId>,
}

impl Iterator for PreOrder<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let next = self.stack.pop()?;
        // Reversed so the first child is visited first.
        self.stack
            .extend(self.forest.node(next).children.iter().rev().copied());
        Some(next)
    }
}
