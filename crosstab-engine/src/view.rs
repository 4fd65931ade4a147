//! FILENAME: crosstab-engine/src/view.rs
//! Crosstab View - the fully populated row x column grid.
//!
//! Every row holds exactly one cell per axis column. A cell keeps one entry
//! per backing source record; padded cells have none. Duplicate records for
//! the same (row, column) pair stay separate entries so nothing is merged
//! behind the caller's back.

use report_data::FieldValue;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::definition::CrosstabId;
use crate::key::AxisKey;

/// One source record's contribution to a cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellEntry {
    pub source_row: u32,

    /// Measure values, in the order of the view's `value_fields`.
    pub values: Vec<FieldValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrosstabCell {
    /// Axis position of the cell's column.
    pub column_index: usize,

    pub entries: SmallVec<[CellEntry; 1]>,
}

impl CrosstabCell {
    pub fn padded(column_index: usize) -> Self {
        CrosstabCell {
            column_index,
            entries: SmallVec::new(),
        }
    }

    pub fn is_padded(&self) -> bool {
        self.entries.is_empty()
    }

    /// First measure value of the first entry, `Null` for padded cells.
    pub fn first_value(&self) -> &FieldValue {
        static NULL: FieldValue = FieldValue::Null;
        self.entries
            .first()
            .and_then(|e| e.values.first())
            .unwrap_or(&NULL)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrosstabRow {
    pub row_key: AxisKey,
    pub cells: Vec<CrosstabCell>,
}

impl CrosstabRow {
    pub fn new(row_key: AxisKey, width: usize) -> Self {
        CrosstabRow {
            row_key,
            cells: Vec::with_capacity(width),
        }
    }
}

/// The complete crosstab grid, ready for per-cell evaluation by the report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrosstabView {
    pub crosstab_id: CrosstabId,

    /// Column axis, in discovered order.
    pub column_keys: Vec<AxisKey>,

    /// Names of the measures captured in every `CellEntry`.
    pub value_fields: Vec<String>,

    /// One row per row-group, in stream order.
    pub rows: Vec<CrosstabRow>,
}

impl CrosstabView {
    pub fn new(crosstab_id: CrosstabId, column_keys: Vec<AxisKey>, value_fields: Vec<String>) -> Self {
        CrosstabView {
            crosstab_id,
            column_keys,
            value_fields,
            rows: Vec::new(),
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn col_count(&self) -> usize {
        self.column_keys.len()
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&CrosstabCell> {
        self.rows.get(row)?.cells.get(col)
    }

    /// Number of padded cells across the grid.
    pub fn padded_count(&self) -> usize {
        self.rows
            .iter()
            .flat_map(|r| r.cells.iter())
            .filter(|c| c.is_padded())
            .count()
    }
}
