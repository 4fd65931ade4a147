//! FILENAME: report-data/src/lib.rs
//! PURPOSE: Shared data-layer types for the reporting core.
//! CONTEXT: Re-exports the fact value, record and source types used by the
//! crosstab engine and by hosts that feed it.

pub mod fact;
pub mod value;

// Re-export commonly used types at the crate root
pub use fact::{DataError, FactRecord, FactSource, FactTable, FieldIndex};
pub use value::{FieldValue, OrderedFloat};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_walks_a_table_through_the_trait() {
        let table = FactTable::from_rows(
            ["Row", "Col"],
            vec![
                vec!["R0".into(), "C0".into()],
                vec!["R0".into(), "C1".into()],
            ],
        )
        .unwrap();

        let source: &dyn FactSource = &table;
        let col = source.field_index("Col").unwrap();
        let seen: Vec<String> = (0..source.record_count())
            .filter_map(|i| source.record(i))
            .map(|r| r.value(col).to_string())
            .collect();
        assert_eq!(seen, vec!["C0", "C1"]);
    }
}
