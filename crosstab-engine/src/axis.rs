//! FILENAME: crosstab-engine/src/axis.rs
//! Axis Specification - the discovered, frozen column order.
//!
//! Building happens in one pass over the fact stream, row-group by
//! row-group, through `AxisBuilder`:
//!
//! ```text
//! start_row()  add(record)*  end_row()   -- once per row-group
//! end_crosstab()                          -- once, consumes the builder
//! ```
//!
//! Two strategies share that lifecycle. Insertion order keeps the first-seen
//! order of distinct column keys and never validates it. Topological merge
//! records precedence edges and sorts them at `end_crosstab`, failing when
//! row-groups contradict each other.
//!
//! The resulting `AxisSpecification` is immutable and can be shared by any
//! number of cursors.

use log::{debug, trace};
use report_data::{FactRecord, FactSource};
use rustc_hash::FxHashMap;

use crate::definition::{AxisStrategy, CrosstabDefinition, KeyLayout};
use crate::error::{CrosstabError, Result};
use crate::key::AxisKey;
use crate::precedence::{NodeId, PrecedenceGraph};

// ============================================================================
// SPECIFICATION
// ============================================================================

/// The de-duplicated column keys in final order, plus a key -> position index.
#[derive(Debug, Clone)]
pub struct AxisSpecification {
    keys: Vec<AxisKey>,
    positions: FxHashMap<AxisKey, usize>,
    layout: KeyLayout,
    strategy: AxisStrategy,
}

impl AxisSpecification {
    fn from_ordered_keys(keys: Vec<AxisKey>, layout: KeyLayout, strategy: AxisStrategy) -> Self {
        let positions = keys
            .iter()
            .enumerate()
            .map(|(i, k)| (k.clone(), i))
            .collect();
        AxisSpecification {
            keys,
            positions,
            layout,
            strategy,
        }
    }

    pub fn size(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Returns the key at `index`.
    ///
    /// # Errors
    /// `IndexOutOfRange` when `index >= size()`.
    pub fn key_at(&self, index: usize) -> Result<&AxisKey> {
        self.keys.get(index).ok_or(CrosstabError::IndexOutOfRange {
            index,
            size: self.keys.len(),
        })
    }

    /// Axis position of `key`, if it was registered.
    pub(crate) fn index_of(&self, key: &AxisKey) -> Option<usize> {
        self.positions.get(key).copied()
    }

    pub fn keys(&self) -> impl Iterator<Item = &AxisKey> {
        self.keys.iter()
    }

    pub fn strategy(&self) -> AxisStrategy {
        self.strategy
    }

    /// Field layout the keys were extracted with.
    pub fn layout(&self) -> &KeyLayout {
        &self.layout
    }
}

// ============================================================================
// BUILDERS
// ============================================================================

/// First-seen ordered set of column keys.
#[derive(Debug, Default)]
struct InsertionOrderAxis {
    keys: Vec<AxisKey>,
    positions: FxHashMap<AxisKey, usize>,
}

impl InsertionOrderAxis {
    fn register(&mut self, key: &AxisKey) {
        if !self.positions.contains_key(key) {
            self.positions.insert(key.clone(), self.keys.len());
            self.keys.push(key.clone());
        }
    }
}

/// Precedence graph plus the node of the last key added to the open group.
#[derive(Debug, Default)]
struct TopologicalMergeAxis {
    graph: PrecedenceGraph,
    previous: Option<NodeId>,
}

#[derive(Debug)]
enum BuilderState {
    InsertionOrder(InsertionOrderAxis),
    TopologicalMerge(TopologicalMergeAxis),
}

/// Incremental builder for an `AxisSpecification`.
#[derive(Debug)]
pub struct AxisBuilder {
    state: BuilderState,
    layout: KeyLayout,

    /// Column key of the last record added to the open row-group.
    last_key: Option<AxisKey>,

    row_open: bool,
    row_groups: usize,
}

impl AxisBuilder {
    pub fn new(strategy: AxisStrategy, layout: KeyLayout) -> Self {
        let state = match strategy {
            AxisStrategy::InsertionOrder => BuilderState::InsertionOrder(InsertionOrderAxis::default()),
            AxisStrategy::TopologicalMerge => {
                BuilderState::TopologicalMerge(TopologicalMergeAxis::default())
            }
        };
        AxisBuilder {
            state,
            layout,
            last_key: None,
            row_open: false,
            row_groups: 0,
        }
    }

    pub fn insertion_order(layout: KeyLayout) -> Self {
        Self::new(AxisStrategy::InsertionOrder, layout)
    }

    pub fn topological_merge(layout: KeyLayout) -> Self {
        Self::new(AxisStrategy::TopologicalMerge, layout)
    }

    pub fn strategy(&self) -> AxisStrategy {
        match self.state {
            BuilderState::InsertionOrder(_) => AxisStrategy::InsertionOrder,
            BuilderState::TopologicalMerge(_) => AxisStrategy::TopologicalMerge,
        }
    }

    /// Number of row-groups opened so far.
    pub fn row_group_count(&self) -> usize {
        self.row_groups
    }

    /// Opens a row-group, closing any group still open.
    pub fn start_row(&mut self) {
        if self.row_open {
            self.end_row();
        }
        self.row_open = true;
        self.row_groups += 1;
    }

    /// Adds one record of the open row-group.
    ///
    /// # Errors
    /// `NoOpenRowGroup` when called outside `start_row` / `end_row`.
    pub fn add(&mut self, record: &FactRecord) -> Result<()> {
        if !self.row_open {
            return Err(CrosstabError::NoOpenRowGroup);
        }

        let key = self.layout.column_key(record);
        if self.last_key.as_ref() == Some(&key) {
            return Ok(());
        }

        match &mut self.state {
            BuilderState::InsertionOrder(axis) => axis.register(&key),
            BuilderState::TopologicalMerge(axis) => {
                let node = axis.graph.ensure_node(&key);
                if let Some(prev) = axis.previous {
                    axis.graph.add_edge(prev, node);
                }
                axis.previous = Some(node);
            }
        }

        self.last_key = Some(key);
        Ok(())
    }

    /// Closes the open row-group. Calling it twice is harmless.
    pub fn end_row(&mut self) {
        self.row_open = false;
        self.last_key = None;
        if let BuilderState::TopologicalMerge(axis) = &mut self.state {
            axis.previous = None;
        }
    }

    /// Finalizes the axis.
    ///
    /// # Errors
    /// `StructuralConflict` when the topological strategy finds row-groups
    /// with contradictory column orders.
    pub fn end_crosstab(mut self) -> Result<AxisSpecification> {
        self.end_row();
        let strategy = self.strategy();
        let row_groups = self.row_groups;

        let keys = match self.state {
            BuilderState::InsertionOrder(axis) => axis.keys,
            BuilderState::TopologicalMerge(axis) => {
                trace!(
                    target: "crosstab",
                    "sorting precedence graph nodes={} edges={}",
                    axis.graph.node_count(),
                    axis.graph.edge_count()
                );
                axis.graph.topological_order()?
            }
        };

        debug!(
            target: "crosstab",
            "axis finalized strategy={:?} row_groups={} size={}",
            strategy,
            row_groups,
            keys.len()
        );

        Ok(AxisSpecification::from_ordered_keys(keys, self.layout, strategy))
    }
}

/// First pass over `source`: detects row-groups by row-key change and feeds
/// every record to a builder of the definition's strategy.
pub fn build_axis<S: FactSource + ?Sized>(
    definition: &CrosstabDefinition,
    source: &S,
) -> Result<AxisSpecification> {
    let layout = KeyLayout::resolve(definition, source)?;
    let mut builder = AxisBuilder::new(definition.strategy, layout.clone());
    let mut current_row: Option<AxisKey> = None;

    for index in 0..source.record_count() {
        let Some(record) = source.record(index) else {
            break;
        };

        let row_key = layout.row_key(record);
        if current_row.as_ref() != Some(&row_key) {
            builder.start_row();
            current_row = Some(row_key);
        }
        builder.add(record)?;
    }

    builder.end_crosstab()
}
