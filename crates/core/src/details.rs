use callscope_protocol::{ClockType, Summary, TimeRange};
use serde::{Deserialize, Serialize};

use crate::aggregate::{Aggregate, BottomUp, TopDown};
use crate::clock;
use crate::model::{CaptureError, CaptureForest, NodeId};

/// Which aggregated view to present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetailsType {
    TopDown,
    BottomUp,
}

/// Per-query settings: the clock to measure in and the wall-clock selection.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryOptions {
    pub clock: ClockType,
    /// Selection on the global clock; converted for thread-time queries.
    pub range: TimeRange,
}

/// One row of a details table: an aggregate and its totals for the query.
#[derive(Debug)]
pub struct Row<'r, A> {
    pub aggregate: &'r A,
    pub summary: Summary,
}

/// The view built for a selection, together with the query it answers.
pub struct CaptureDetails<'a> {
    options: QueryOptions,
    query_range: TimeRange,
    view: DetailsView<'a>,
}

pub enum DetailsView<'a> {
    /// One root per distinct method among the selected nodes.
    TopDown(Vec<TopDown<'a>>),
    BottomUp(BottomUp<'a>),
}

impl<'a> CaptureDetails<'a> {
    /// Build a view over `selection`. The first selected node anchors the
    /// clock conversion of the selection range.
    pub fn build(
        forest: &'a CaptureForest,
        details_type: DetailsType,
        options: QueryOptions,
        selection: &[NodeId],
    ) -> Result<Self, CaptureError> {
        let Some(&anchor) = selection.first() else {
            return Err(CaptureError::EmptySelection);
        };
        if let Some(&missing) = selection.iter().find(|&&n| forest.get(n).is_none()) {
            return Err(CaptureError::UnknownNode(missing));
        }
        let query_range = clock::selection_for(options.clock, forest.node(anchor), options.range);
        let view = match details_type {
            DetailsType::TopDown => DetailsView::TopDown(TopDown::roots_at(forest, selection)),
            DetailsType::BottomUp => {
                DetailsView::BottomUp(BottomUp::root_at_many(forest, selection))
            }
        };
        tracing::debug!(
            ?details_type,
            clock = ?options.clock,
            selected = selection.len(),
            "built capture details"
        );
        Ok(Self {
            options,
            query_range,
            view,
        })
    }

    pub fn details_type(&self) -> DetailsType {
        match self.view {
            DetailsView::TopDown(_) => DetailsType::TopDown,
            DetailsView::BottomUp(_) => DetailsType::BottomUp,
        }
    }

    pub fn options(&self) -> QueryOptions {
        self.options
    }

    /// The selection expressed in the queried clock domain.
    pub fn query_range(&self) -> TimeRange {
        self.query_range
    }

    pub fn view(&self) -> &DetailsView<'a> {
        &self.view
    }

    pub fn summary<A: Aggregate<'a>>(&self, aggregate: &A) -> Summary {
        aggregate.total_over(self.options.clock, self.query_range)
    }

    /// Children of `aggregate` that fall inside the selection, heaviest
    /// first. Ties keep their tree order.
    pub fn visible_children<'r, A>(&self, aggregate: &'r A) -> Vec<Row<'r, A>>
    where
        A: Aggregate<'a>,
        'a: 'r,
    {
        let mut rows: Vec<_> = aggregate
            .children()
            .iter()
            .filter(|child| child.overlaps_with(self.options.range))
            .map(|child| Row {
                aggregate: child,
                summary: self.summary(child),
            })
            .collect();
        rows.sort_by(|a, b| b.summary.total.total_cmp(&a.summary.total));
        rows
    }
}
