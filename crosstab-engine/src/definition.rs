//! FILENAME: crosstab-engine/src/definition.rs
//! Crosstab Definition - The serializable configuration.
//!
//! This module contains the types needed to DESCRIBE a crosstab:
//! which fields form the row axis, which form the column axis, which
//! measures are captured per cell, and how the column axis is discovered.
//! `KeyLayout` is the definition resolved against a concrete fact source.

use serde::{Deserialize, Serialize};
use report_data::{FactRecord, FactSource, FieldIndex};

use crate::error::{CrosstabError, Result};
use crate::key::AxisKey;

/// Unique identifier for a crosstab within a report.
pub type CrosstabId = u32;

// ============================================================================
// AXIS STRATEGY
// ============================================================================

/// How the global column order is discovered from the row-groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum AxisStrategy {
    /// First-seen order wins. Trusts that the stream is already globally
    /// consistent and performs no conflict detection.
    #[default]
    InsertionOrder,
    /// Builds a precedence graph from every row-group and sorts it
    /// topologically. Contradictory orders are reported as a structural
    /// conflict.
    TopologicalMerge,
}

// ============================================================================
// MAIN DEFINITION STRUCT
// ============================================================================

/// The complete, serializable definition of a crosstab.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrosstabDefinition {
    pub id: CrosstabId,

    #[serde(default)]
    pub name: Option<String>,

    /// Fields forming the row-axis key (outer to inner).
    pub row_fields: Vec<String>,

    /// Fields forming the column-axis key (outer to inner).
    pub column_fields: Vec<String>,

    /// Measure fields captured for every backing record of a cell.
    #[serde(default)]
    pub value_fields: Vec<String>,

    #[serde(default)]
    pub strategy: AxisStrategy,

    /// Version for cache invalidation.
    #[serde(default)]
    pub version: u64,
}

impl CrosstabDefinition {
    /// Creates a definition with the insertion-order strategy and no measures.
    pub fn new<R, C, S>(id: CrosstabId, row_fields: R, column_fields: C) -> Self
    where
        R: IntoIterator<Item = S>,
        C: IntoIterator<Item = S>,
        S: Into<String>,
    {
        CrosstabDefinition {
            id,
            name: None,
            row_fields: row_fields.into_iter().map(Into::into).collect(),
            column_fields: column_fields.into_iter().map(Into::into).collect(),
            value_fields: Vec::new(),
            strategy: AxisStrategy::default(),
            version: 0,
        }
    }

    pub fn with_strategy(mut self, strategy: AxisStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_value_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.value_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Increments the version (for cache invalidation).
    pub fn bump_version(&mut self) {
        self.version += 1;
    }
}

// ============================================================================
// KEY LAYOUT
// ============================================================================

/// Row and column fields resolved to positional indices of a fact source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyLayout {
    row_fields: Vec<FieldIndex>,
    column_fields: Vec<FieldIndex>,
}

impl KeyLayout {
    pub fn new(row_fields: Vec<FieldIndex>, column_fields: Vec<FieldIndex>) -> Self {
        KeyLayout {
            row_fields,
            column_fields,
        }
    }

    /// Resolves the definition's field names against `source`.
    pub fn resolve<S: FactSource + ?Sized>(
        definition: &CrosstabDefinition,
        source: &S,
    ) -> Result<Self> {
        Ok(KeyLayout {
            row_fields: resolve_names(&definition.row_fields, source)?,
            column_fields: resolve_names(&definition.column_fields, source)?,
        })
    }

    pub fn row_fields(&self) -> &[FieldIndex] {
        &self.row_fields
    }

    pub fn column_fields(&self) -> &[FieldIndex] {
        &self.column_fields
    }

    pub fn row_key(&self, record: &FactRecord) -> AxisKey {
        self.row_fields.iter().map(|&i| record.value(i).clone()).collect()
    }

    pub fn column_key(&self, record: &FactRecord) -> AxisKey {
        self.column_fields.iter().map(|&i| record.value(i).clone()).collect()
    }
}

/// Resolves field names into indices, failing on the first unknown name.
pub(crate) fn resolve_names<S: FactSource + ?Sized>(
    names: &[String],
    source: &S,
) -> Result<Vec<FieldIndex>> {
    names
        .iter()
        .map(|name| {
            source
                .field_index(name)
                .ok_or_else(|| CrosstabError::UnknownField(name.clone()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use report_data::{FactTable, FieldValue};

    fn table() -> FactTable {
        FactTable::from_rows(
            ["Region", "Year", "Quarter", "Sales"],
            vec![vec!["North".into(), 2024i64.into(), "Q1".into(), 10.0.into()]],
        )
        .unwrap()
    }

    #[test]
    fn test_definition_from_json_uses_defaults() {
        let json = r#"{
            "id": 7,
            "row_fields": ["Region"],
            "column_fields": ["Year", "Quarter"]
        }"#;
        let def: CrosstabDefinition = serde_json::from_str(json).unwrap();
        assert_eq!(def.id, 7);
        assert_eq!(def.strategy, AxisStrategy::InsertionOrder);
        assert!(def.value_fields.is_empty());
        assert_eq!(def.version, 0);
    }

    #[test]
    fn test_definition_strategy_from_json() {
        let json = r#"{
            "id": 1,
            "row_fields": [],
            "column_fields": ["Quarter"],
            "strategy": "TopologicalMerge"
        }"#;
        let def: CrosstabDefinition = serde_json::from_str(json).unwrap();
        assert_eq!(def.strategy, AxisStrategy::TopologicalMerge);
    }

    #[test]
    fn test_resolve_and_extract_keys() {
        let table = table();
        let def = CrosstabDefinition::new(1, ["Region"], ["Year", "Quarter"]);
        let layout = KeyLayout::resolve(&def, &table).unwrap();
        assert_eq!(layout.row_fields(), &[0]);
        assert_eq!(layout.column_fields(), &[1, 2]);

        let record = table.record(0).unwrap();
        assert_eq!(
            layout.column_key(record),
            AxisKey::from(vec![FieldValue::number(2024.0), FieldValue::text("Q1")])
        );
        assert_eq!(layout.row_key(record).to_string(), "[North]");
    }

    #[test]
    fn test_resolve_unknown_field() {
        let table = table();
        let def = CrosstabDefinition::new(1, ["Region"], ["Month"]);
        let err = KeyLayout::resolve(&def, &table).unwrap_err();
        assert_eq!(err, CrosstabError::UnknownField("Month".to_string()));
    }

    #[test]
    fn test_bump_version() {
        let mut def = CrosstabDefinition::new(1, ["Region"], ["Year"]);
        def.bump_version();
        def.bump_version();
        assert_eq!(def.version, 2);
    }
}
