use compact_str::{CompactString, format_compact};
use rowgate_types::{SemanticType, TableDef};
use smallvec::SmallVec;

use crate::error::{Result, RowgateError};
use crate::row::Row;
use crate::value::Value;

/// Column values identifying the rows a loader should fetch.
///
/// ```
/// use rowgate_core::loader::LoaderKey;
///
/// let key = LoaderKey::new().with("team_id", 1).with("user_id", 2);
/// assert_eq!(key.len(), 2);
/// assert_eq!(LoaderKey::from(("user_id", 7)).len(), 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoaderKey {
    values: SmallVec<[(CompactString, Value); 2]>,
}

impl LoaderKey {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, column: impl Into<CompactString>, value: impl Into<Value>) -> Self {
        let column = column.into();
        let value = value.into();
        match self.values.iter_mut().find(|(name, _)| *name == column) {
            Some((_, slot)) => *slot = value,
            None => self.values.push((column, value)),
        }
        self
    }

    #[must_use]
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.values
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.values.iter().map(|(name, _)| name.as_str())
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
}

impl<C: Into<CompactString>, V: Into<Value>> From<(C, V)> for LoaderKey {
    fn from((column, value): (C, V)) -> Self {
        LoaderKey::new().with(column, value)
    }
}

impl From<&Row> for LoaderKey {
    fn from(row: &Row) -> Self {
        row.iter()
            .fold(LoaderKey::new(), |key, (column, value)| {
                key.with(column, value.clone())
            })
    }
}

/// One normalized key component.
///
/// Integral reals collapse into integers so `1.0` and `1` address the same
/// cache entry, matching how the engine compares them.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum KeyPart {
    Integer(i64),
    Real(u64),
    Text(CompactString),
}

impl KeyPart {
    pub(crate) fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Integer(integer) => Some(KeyPart::Integer(*integer)),
            Value::Real(real) => {
                if real.fract() == 0.0 && *real >= i64::MIN as f64 && *real < i64::MAX as f64 {
                    Some(KeyPart::Integer(*real as i64))
                } else {
                    Some(KeyPart::Real(real.to_bits()))
                }
            }
            Value::Text(text) => Some(KeyPart::Text(CompactString::from(text.as_str()))),
            Value::Null | Value::Boolean(_) | Value::Date(_) => None,
        }
    }

    pub(crate) fn to_value(&self) -> Value {
        match self {
            KeyPart::Integer(integer) => Value::Integer(*integer),
            KeyPart::Real(bits) => Value::Real(f64::from_bits(*bits)),
            KeyPart::Text(text) => Value::Text(text.to_string()),
        }
    }
}

/// A loader key reduced to its values in the loader's column order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct CanonicalKey(pub(crate) SmallVec<[KeyPart; 2]>);

impl CanonicalKey {
    /// Validates `key` against the loader's key columns and normalizes it.
    ///
    /// The key must name exactly `columns` (in any order) and every value must
    /// carry the column's semantic type.
    pub(crate) fn new(table: &TableDef, columns: &[CompactString], key: &LoaderKey) -> Result<Self> {
        let shape_matches = key.len() == columns.len()
            && key
                .columns()
                .all(|column| columns.iter().any(|own| own == column));
        if !shape_matches {
            return Err(RowgateError::UnknownKey {
                table: table.name.as_str().into(),
                columns: format_compact!("{}", key.columns().collect::<Vec<_>>().join(", ")),
            });
        }

        let mut parts = SmallVec::with_capacity(columns.len());
        for column in columns {
            let semantic = table
                .column(column)
                .map(|def| def.semantic)
                .ok_or_else(|| RowgateError::unknown_field(&table.name, column))?;
            let value = key.get(column).unwrap_or(&Value::Null);
            let part = match (semantic, value) {
                (SemanticType::Number, Value::Integer(_) | Value::Real(_))
                | (SemanticType::String, Value::Text(_)) => KeyPart::from_value(value),
                _ => None,
            };
            match part {
                Some(part) => parts.push(part),
                None => {
                    return Err(RowgateError::type_mismatch(
                        &table.name,
                        column,
                        semantic,
                        value.type_name(),
                    ));
                }
            }
        }
        Ok(Self(parts))
    }

    /// Reads the key columns out of a fetched row. `None` when any is missing
    /// or NULL, which cannot match a requested key.
    pub(crate) fn from_row(columns: &[CompactString], row: &Row) -> Option<Self> {
        columns
            .iter()
            .map(|column| row.get(column).and_then(KeyPart::from_value))
            .collect::<Option<SmallVec<_>>>()
            .map(Self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rowgate_types::ColumnDef;

    fn members() -> (TableDef, Vec<CompactString>) {
        let table = TableDef::new("team_members")
            .with_column(ColumnDef::new("team_id", SemanticType::Number))
            .with_column(ColumnDef::new("member_name", SemanticType::String));
        (table, vec!["team_id".into(), "member_name".into()])
    }

    #[test]
    fn canonical_keys_ignore_column_order() {
        let (table, columns) = members();
        let a = LoaderKey::new().with("team_id", 1).with("member_name", "x");
        let b = LoaderKey::new().with("member_name", "x").with("team_id", 1.0);
        assert_eq!(
            CanonicalKey::new(&table, &columns, &a).unwrap(),
            CanonicalKey::new(&table, &columns, &b).unwrap()
        );
    }

    #[test]
    fn canonical_keys_reject_bad_shapes() {
        let (table, columns) = members();
        assert!(matches!(
            CanonicalKey::new(&table, &columns, &LoaderKey::from(("team_id", 1))),
            Err(RowgateError::UnknownKey { .. })
        ));
        assert!(matches!(
            CanonicalKey::new(
                &table,
                &columns,
                &LoaderKey::new().with("team_id", "1").with("member_name", "x")
            ),
            Err(RowgateError::TypeMismatch { found: "string", .. })
        ));
        assert!(matches!(
            CanonicalKey::new(
                &table,
                &columns,
                &LoaderKey::new().with("team_id", Value::Null).with("member_name", "x")
            ),
            Err(RowgateError::TypeMismatch { found: "null", .. })
        ));
    }

    #[test]
    fn row_keys() {
        let (_, columns) = members();
        let row = Row::new()
            .with("member_name", "x")
            .with("team_id", 1)
            .with("other", 5);
        let key = CanonicalKey::from_row(&columns, &row).unwrap();
        assert_eq!(key.0[0], KeyPart::Integer(1));
        assert_eq!(key.0[1].to_value(), Value::from("x"));

        assert!(CanonicalKey::from_row(&columns, &Row::new().with("team_id", 1)).is_none());
    }
}
