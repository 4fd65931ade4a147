//! FILENAME: crosstab-engine/src/key.rs
//! Axis keys: the identity of one row or column position on an axis.

use std::fmt;

use report_data::FieldValue;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Inline capacity for key components. Most crosstabs group by one or two
/// fields per axis.
const INLINE_COMPONENTS: usize = 2;

/// An immutable, ordered tuple of field values. Two keys are equal iff all
/// components are equal; hashing agrees with equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct AxisKey(SmallVec<[FieldValue; INLINE_COMPONENTS]>);

impl AxisKey {
    /// The zero-arity key, shared by every record when an axis has no fields.
    pub fn empty() -> Self {
        AxisKey(SmallVec::new())
    }

    pub fn arity(&self) -> usize {
        self.0.len()
    }

    pub fn values(&self) -> &[FieldValue] {
        &self.0
    }

    pub fn value(&self, index: usize) -> Option<&FieldValue> {
        self.0.get(index)
    }
}

impl From<Vec<FieldValue>> for AxisKey {
    fn from(values: Vec<FieldValue>) -> Self {
        AxisKey(SmallVec::from_vec(values))
    }
}

impl FromIterator<FieldValue> for AxisKey {
    fn from_iter<T: IntoIterator<Item = FieldValue>>(iter: T) -> Self {
        AxisKey(iter.into_iter().collect())
    }
}

impl fmt::Display for AxisKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, value) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", value)?;
        }
        write!(f, "]")
    }
}
