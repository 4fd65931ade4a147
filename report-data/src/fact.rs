//! FILENAME: report-data/src/fact.rs
//! PURPOSE: The tabular fact stream consumed by the reporting core.
//! CONTEXT: A fact source is a read-only, positionally indexed sequence of
//! records over a fixed set of named fields. Consumers (the crosstab engine)
//! borrow a source and never mutate it, so the same source can be walked any
//! number of times from the start.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::value::FieldValue;

/// Index into the source fields (0-based).
pub type FieldIndex = usize;

/// Errors raised while assembling fact data.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DataError {
    /// A row carries more values than the table has fields.
    #[error("row has {actual} values but the table declares {expected} fields")]
    ArityMismatch { expected: usize, actual: usize },
}

/// One fact row. Values are positional and line up with the owning
/// source's field names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactRecord {
    /// Row number in the originating data (0-based).
    pub source_row: u32,

    pub values: Vec<FieldValue>,
}

impl FactRecord {
    pub fn new(source_row: u32, values: Vec<FieldValue>) -> Self {
        FactRecord { source_row, values }
    }

    /// Returns the value at `index`, or `Null` when the record is shorter.
    pub fn value(&self, index: FieldIndex) -> &FieldValue {
        static NULL: FieldValue = FieldValue::Null;
        self.values.get(index).unwrap_or(&NULL)
    }
}

/// Read-only access to a stream of fact records.
pub trait FactSource {
    /// Field names, in positional order.
    fn field_names(&self) -> &[String];

    /// Looks up a field by name.
    fn field_index(&self, name: &str) -> Option<FieldIndex> {
        self.field_names().iter().position(|n| n == name)
    }

    fn record_count(&self) -> usize;

    fn record(&self, index: usize) -> Option<&FactRecord>;
}

/// In-memory fact source.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FactTable {
    field_names: Vec<String>,
    records: Vec<FactRecord>,
}

impl FactTable {
    /// Creates an empty table over the given fields.
    pub fn new<I, S>(field_names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FactTable {
            field_names: field_names.into_iter().map(Into::into).collect(),
            records: Vec::new(),
        }
    }

    /// Builds a table from rows of values.
    pub fn from_rows<I, S, R>(field_names: I, rows: R) -> Result<Self, DataError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        R: IntoIterator<Item = Vec<FieldValue>>,
    {
        let mut table = FactTable::new(field_names);
        for row in rows {
            table.push_record(row)?;
        }
        Ok(table)
    }

    /// Appends a row. Short rows are padded with `Null`; the record gets the
    /// next sequential `source_row`.
    pub fn push_record(&mut self, mut values: Vec<FieldValue>) -> Result<&FactRecord, DataError> {
        let expected = self.field_names.len();
        if values.len() > expected {
            return Err(DataError::ArityMismatch {
                expected,
                actual: values.len(),
            });
        }
        values.resize(expected, FieldValue::Null);

        let source_row = self.records.len() as u32;
        self.records.push(FactRecord::new(source_row, values));
        Ok(&self.records[self.records.len() - 1])
    }

    pub fn records(&self) -> &[FactRecord] {
        &self.records
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl FactSource for FactTable {
    fn field_names(&self) -> &[String] {
        &self.field_names
    }

    fn record_count(&self) -> usize {
        self.records.len()
    }

    fn record(&self, index: usize) -> Option<&FactRecord> {
        self.records.get(index)
    }
}
