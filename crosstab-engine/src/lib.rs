//! FILENAME: crosstab-engine/src/lib.rs
//! Crosstab axis engine.
//!
//! Turns a stream of fact rows into a fully populated row x column grid. It
//! depends on `report-data` only for the fact value and source types.
//!
//! Layers:
//! - `definition`: Serializable configuration (what the crosstab IS)
//! - `key` / `precedence` / `axis`: Column axis discovery (WHICH columns, in what order)
//! - `cursor`: Axis-aligned replay of the source (one logical cell per advance)
//! - `view`: The populated grid (WHAT the report evaluates)
//! - `engine`: Two-pass driver tying the layers together

pub mod axis;
pub mod cursor;
pub mod definition;
pub mod engine;
pub mod error;
pub mod key;
pub mod precedence;
pub mod view;

pub use axis::{build_axis, AxisBuilder, AxisSpecification};
pub use cursor::{AxisAlignedCursor, CellState, CrosstabRecord};
pub use definition::*;
pub use engine::{calculate_crosstab, cells_per_row_group, materialize, trace_cells, TracedCell};
pub use error::{CrosstabError, Result};
pub use key::AxisKey;
pub use precedence::PrecedenceGraph;
pub use view::*;
