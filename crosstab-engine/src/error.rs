//! FILENAME: crosstab-engine/src/error.rs
//! Error taxonomy for axis building and axis-aligned replay.
//!
//! Every variant is fatal for the current report execution. The input's
//! ordering is a fixed property of the data, so nothing here is retried.

use report_data::DataError;
use thiserror::Error;

use crate::key::AxisKey;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CrosstabError {
    /// Row-groups imply contradictory column orders. `cycle` lists the keys
    /// along one cycle in precedence order, closed by repeating the first key.
    #[error("structural conflict: contradictory column order {}", format_path(.cycle))]
    StructuralConflict { cycle: Vec<AxisKey> },

    #[error("axis index {index} out of range for axis of size {size}")]
    IndexOutOfRange { index: usize, size: usize },

    /// The cursor met a column key the specification never registered.
    #[error("structural inconsistency: column key {key} is not part of the axis")]
    UnknownKey { key: AxisKey },

    /// A record's column key sits before the current axis position of its
    /// row-group and can no longer be placed.
    #[error(
        "structural inconsistency: column key {column_key} of row {row_key} \
         appears after axis position {position}"
    )]
    OutOfAxisOrder {
        row_key: AxisKey,
        column_key: AxisKey,
        position: usize,
    },

    #[error("field '{0}' does not exist in the fact source")]
    UnknownField(String),

    #[error("add() called without an open row-group")]
    NoOpenRowGroup,

    #[error("advance() called on an exhausted cursor")]
    CursorExhausted,

    #[error(transparent)]
    Data(#[from] DataError),
}

pub type Result<T> = std::result::Result<T, CrosstabError>;

fn format_path(keys: &[AxisKey]) -> String {
    keys.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" -> ")
}
