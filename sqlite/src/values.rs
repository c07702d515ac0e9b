//! Conversions between rowgate values and SQLite storage classes.
//!
//! SQLite has no boolean or date storage class: booleans are stored as 0/1
//! integers and dates as ISO-8601 text. Rows read back are conformed to the
//! table schema by the core, which turns them back into booleans and dates.

use rowgate_core::error::{Result, RowgateError};
use rowgate_core::value::{DATE_FORMAT, Value};
use rusqlite::types::{ToSqlOutput, ValueRef};

/// Binds a [`Value`] as a statement parameter.
#[derive(Debug, Clone, Copy)]
pub struct SqliteParam<'a>(pub &'a Value);

impl rusqlite::ToSql for SqliteParam<'_> {
    fn to_sql(&self) -> ::rusqlite::Result<ToSqlOutput<'_>> {
        let output = match self.0 {
            Value::Null => ToSqlOutput::Owned(rusqlite::types::Value::Null),
            Value::Integer(i) => ToSqlOutput::Owned(rusqlite::types::Value::Integer(*i)),
            Value::Real(r) => ToSqlOutput::Owned(rusqlite::types::Value::Real(*r)),
            Value::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            Value::Boolean(b) => ToSqlOutput::Owned(rusqlite::types::Value::Integer(i64::from(*b))),
            Value::Date(date) => ToSqlOutput::Owned(rusqlite::types::Value::Text(
                date.format(DATE_FORMAT).to_string(),
            )),
        };
        Ok(output)
    }
}

/// Reads one column of a result row.
///
/// Blobs have no rowgate counterpart and text that is not UTF-8 cannot be
/// represented; both fail with [`RowgateError::Conversion`].
pub fn value_from_ref(column: &str, value: ValueRef<'_>) -> Result<Value> {
    match value {
        ValueRef::Null => Ok(Value::Null),
        ValueRef::Integer(i) => Ok(Value::Integer(i)),
        ValueRef::Real(r) => Ok(Value::Real(r)),
        ValueRef::Text(bytes) => std::str::from_utf8(bytes)
            .map(|text| Value::Text(text.to_owned()))
            .map_err(|err| {
                RowgateError::Conversion(format!("column {column} holds invalid UTF-8: {err}"))
            }),
        ValueRef::Blob(_) => Err(RowgateError::Conversion(format!(
            "column {column} holds a blob"
        ))),
    }
}
