//! Rows: ordered column → value maps.

use compact_str::CompactString;
use rowgate_types::TableDef;

use crate::error::{Result, RowgateError};
use crate::value::Value;

/// One row, keyed by column name in insertion order.
///
/// Setting a column that is already present replaces its value in place.
///
/// ```
/// use rowgate_core::{Row, Value};
///
/// let row = Row::new().with("user_id", 1).with("first_name", "John");
/// assert_eq!(row.get("first_name"), Some(&Value::Text("John".into())));
/// assert_eq!(row.len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    values: Vec<(CompactString, Value)>,
}

impl Row {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            values: Vec::with_capacity(capacity),
        }
    }

    /// Builder form of [`Row::set`].
    #[must_use]
    pub fn with(mut self, column: impl Into<CompactString>, value: impl Into<Value>) -> Self {
        self.set(column, value);
        self
    }

    pub fn set(&mut self, column: impl Into<CompactString>, value: impl Into<Value>) {
        let column = column.into();
        let value = value.into();
        match self.values.iter_mut().find(|(name, _)| *name == column) {
            Some((_, slot)) => *slot = value,
            None => self.values.push((column, value)),
        }
    }

    #[must_use]
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.values
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    #[must_use]
    pub fn contains(&self, column: &str) -> bool {
        self.get(column).is_some()
    }

    pub fn remove(&mut self, column: &str) -> Option<Value> {
        let index = self.values.iter().position(|(name, _)| name == column)?;
        Some(self.values.remove(index).1)
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.values.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Reinterprets driver values according to the table's column types.
    /// Columns the table does not declare are left untouched.
    #[must_use]
    pub fn conform(self, table: &TableDef) -> Self {
        let values = self
            .values
            .into_iter()
            .map(|(name, value)| match table.column(&name) {
                Some(column) => {
                    let value = value.conform(column.semantic);
                    (name, value)
                }
                None => (name, value),
            })
            .collect();
        Self { values }
    }

    /// Checks every value against `table` before it is written.
    ///
    /// Columns must be declared, values must carry the column's semantic type
    /// and NULL is only accepted for nullable columns.
    pub fn check(&self, table: &TableDef) -> Result<()> {
        for (name, value) in self.iter() {
            let column = table
                .column(name)
                .ok_or_else(|| RowgateError::unknown_field(&table.name, name))?;
            let accepted = match value.semantic_type() {
                None => column.nullable,
                Some(semantic) => semantic == column.semantic,
            };
            if !accepted {
                return Err(RowgateError::type_mismatch(
                    &table.name,
                    name,
                    column.semantic,
                    value.type_name(),
                ));
            }
        }
        Ok(())
    }
}

impl<K, V> FromIterator<(K, V)> for Row
where
    K: Into<CompactString>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut row = Row::new();
        for (column, value) in iter {
            row.set(column, value);
        }
        row
    }
}

impl IntoIterator for Row {
    type Item = (CompactString, Value);
    type IntoIter = std::vec::IntoIter<(CompactString, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.into_iter()
    }
}
