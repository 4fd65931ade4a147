//! FILENAME: crosstab-engine/src/engine.rs
//! Crosstab Engine - the two-pass driver that turns facts into a grid.
//!
//! Algorithm:
//! 1. Build the column axis in one pass over the source (`build_axis`)
//! 2. Re-walk the same source from the start with an axis-aligned cursor
//! 3. Detect row-group boundaries on the outer data row and realign the
//!    cursor with `reset_row_cursor()` at each one
//! 4. Collect one cell per axis column per row-group, appending duplicate
//!    records to the cell they belong to

use log::{debug, trace};
use report_data::{FactSource, FieldIndex};
use serde::{Deserialize, Serialize};

use crate::axis::{build_axis, AxisSpecification};
use crate::cursor::{AxisAlignedCursor, CellState};
use crate::definition::{resolve_names, CrosstabDefinition};
use crate::error::Result;
use crate::key::AxisKey;
use crate::view::{CellEntry, CrosstabCell, CrosstabRow, CrosstabView};

/// One emitted logical cell of a replay.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TracedCell {
    pub row_key: AxisKey,
    pub column_key: AxisKey,
    pub axis_position: usize,
    pub state: CellState,
}

/// Builds the axis for `definition` and materializes the full grid.
pub fn calculate_crosstab<S: FactSource + ?Sized>(
    definition: &CrosstabDefinition,
    source: &S,
) -> Result<CrosstabView> {
    let spec = build_axis(definition, source)?;
    materialize(definition, source, &spec)
}

/// Second pass: replays `source` against a finished specification.
pub fn materialize<S: FactSource + ?Sized>(
    definition: &CrosstabDefinition,
    source: &S,
    spec: &AxisSpecification,
) -> Result<CrosstabView> {
    let value_indices: Vec<FieldIndex> = resolve_names(&definition.value_fields, source)?;
    let width = spec.size();

    let mut view = CrosstabView::new(
        definition.id,
        spec.keys().cloned().collect(),
        definition.value_fields.clone(),
    );
    let mut cursor = AxisAlignedCursor::new(spec, source);

    loop {
        // The outer data row has crossed into a new row-group once the
        // current grid row is full.
        let row_complete = view.rows.last().map_or(true, |r| r.cells.len() == width);
        if row_complete && cursor.reset_row_cursor() {
            if let Some(last) = view.rows.last() {
                trace!(target: "crosstab", "row-group {} complete", last.row_key);
            }
        }

        if !cursor.is_advanceable() {
            break;
        }
        cursor.advance()?;

        let (Some(row_key), Some(pos)) = (cursor.row_key(), cursor.axis_position()) else {
            continue;
        };

        if view.rows.last().map_or(true, |r| &r.row_key != row_key) {
            view.rows.push(CrosstabRow::new(row_key.clone(), width));
        }
        let Some(row) = view.rows.last_mut() else {
            continue;
        };

        if pos == row.cells.len() {
            row.cells.push(CrosstabCell::padded(pos));
        }

        if let (Some(cell), Some(record)) = (row.cells.get_mut(pos), cursor.source_record()) {
            cell.entries.push(CellEntry {
                source_row: record.source_row,
                values: value_indices.iter().map(|&i| record.value(i).clone()).collect(),
            });
        }
    }

    debug!(
        target: "crosstab",
        "materialized crosstab id={} rows={} cols={} padded={}",
        view.crosstab_id,
        view.row_count(),
        view.col_count(),
        view.padded_count()
    );

    Ok(view)
}

/// Records the (row key, column key, position, state) sequence of one full
/// replay with a fresh cursor.
pub fn trace_cells<S: FactSource + ?Sized>(
    source: &S,
    spec: &AxisSpecification,
) -> Result<Vec<TracedCell>> {
    let mut cursor = AxisAlignedCursor::new(spec, source);
    let mut cells = Vec::new();

    while cursor.is_advanceable() {
        let state = cursor.advance()?;
        let (Some(row_key), Some(column_key), Some(axis_position)) =
            (cursor.row_key(), cursor.column_key(), cursor.axis_position())
        else {
            continue;
        };
        cells.push(TracedCell {
            row_key: row_key.clone(),
            column_key: column_key.clone(),
            axis_position,
            state,
        });
    }

    Ok(cells)
}

/// Splits traced cells into row-groups, in stream order.
pub fn cells_per_row_group(cells: &[TracedCell]) -> Vec<&[TracedCell]> {
    let mut groups = Vec::new();
    let mut start = 0;
    for i in 1..=cells.len() {
        if i == cells.len() || cells[i].row_key != cells[i - 1].row_key {
            groups.push(&cells[start..i]);
            start = i;
        }
    }
    groups
}
