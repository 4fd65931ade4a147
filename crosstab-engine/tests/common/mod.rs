//! FILENAME: crosstab-engine/tests/common/mod.rs
//! Fixtures shared by the crosstab integration tests.

#![allow(dead_code)]

use crosstab_engine::{
    build_axis, AxisSpecification, AxisStrategy, CrosstabDefinition, Result,
};
use report_data::{FactTable, FieldValue};

pub const ROW_FIELD: &str = "Row";
pub const COL_FIELD: &str = "Col";
pub const VALUE_FIELD: &str = "Value";

/// Builds a (Row, Col, Value) fact table.
pub fn fact_table(rows: &[(&str, &str, f64)]) -> FactTable {
    FactTable::from_rows(
        [ROW_FIELD, COL_FIELD, VALUE_FIELD],
        rows.iter().map(|(r, c, v)| {
            vec![FieldValue::text(*r), FieldValue::text(*c), FieldValue::number(*v)]
        }),
    )
    .unwrap()
}

/// Repeats every row `times` times in place.
pub fn replicate(rows: &[(&'static str, &'static str, f64)], times: usize) -> Vec<(&'static str, &'static str, f64)> {
    rows.iter()
        .flat_map(|row| std::iter::repeat(*row).take(times))
        .collect()
}

pub fn definition(strategy: AxisStrategy) -> CrosstabDefinition {
    CrosstabDefinition::new(1, [ROW_FIELD], [COL_FIELD])
        .with_value_fields([VALUE_FIELD])
        .with_strategy(strategy)
}

pub fn axis(table: &FactTable, strategy: AxisStrategy) -> Result<AxisSpecification> {
    build_axis(&definition(strategy), table)
}

/// Axis keys rendered as plain labels ("C0" instead of "[C0]").
pub fn axis_labels(spec: &AxisSpecification) -> Vec<String> {
    spec.keys().map(|k| k.values()[0].to_string()).collect()
}

/// The four diagonal fact rows: R0/C0 .. R3/C3.
pub fn diagonal_rows() -> Vec<(&'static str, &'static str, f64)> {
    vec![
        ("R0", "C0", 1.0),
        ("R1", "C1", 2.0),
        ("R2", "C2", 3.0),
        ("R3", "C3", 4.0),
    ]
}

/// Same columns, reverse order.
pub fn reverse_diagonal_rows() -> Vec<(&'static str, &'static str, f64)> {
    vec![
        ("R0", "C3", 1.0),
        ("R1", "C2", 2.0),
        ("R2", "C1", 3.0),
        ("R3", "C0", 4.0),
    ]
}
