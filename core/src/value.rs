//! Scalar values bound into statements and read back from rows.

use chrono::{NaiveDate, NaiveDateTime};
use rowgate_types::SemanticType;

/// Format used when a date is bound as text.
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

const DATE_INPUT_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.fZ",
];

/// A single column value.
#[derive(Debug, Clone, PartialEq, PartialOrd, Default)]
pub enum Value {
    #[default]
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Boolean(bool),
    Date(NaiveDateTime),
}

impl Value {
    /// Returns true if this value is NULL.
    #[inline]
    pub const fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// The semantic type this value satisfies, `None` for NULL.
    #[inline]
    pub const fn semantic_type(&self) -> Option<SemanticType> {
        match self {
            Value::Null => None,
            Value::Integer(_) | Value::Real(_) => Some(SemanticType::Number),
            Value::Text(_) => Some(SemanticType::String),
            Value::Boolean(_) => Some(SemanticType::Boolean),
            Value::Date(_) => Some(SemanticType::Date),
        }
    }

    /// Short name used in type-mismatch errors.
    pub const fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Integer(_) => "integer",
            Value::Real(_) => "real",
            Value::Text(_) => "string",
            Value::Boolean(_) => "boolean",
            Value::Date(_) => "date",
        }
    }

    #[inline]
    pub const fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(value) => Some(*value),
            _ => None,
        }
    }

    /// Numeric view of INTEGER and REAL values.
    #[inline]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(value) => Some(*value as f64),
            Value::Real(value) => Some(*value),
            _ => None,
        }
    }

    #[inline]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(value) => Some(value.as_str()),
            _ => None,
        }
    }

    #[inline]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(value) => Some(*value),
            _ => None,
        }
    }

    #[inline]
    pub const fn as_date(&self) -> Option<NaiveDateTime> {
        match self {
            Value::Date(value) => Some(*value),
            _ => None,
        }
    }

    /// Truthiness as stored by engines without a native boolean.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Boolean(value) => *value,
            Value::Integer(value) => *value != 0,
            Value::Real(value) => *value != 0.0,
            Value::Text(value) => value == "1" || value.eq_ignore_ascii_case("true"),
            Value::Null | Value::Date(_) => false,
        }
    }

    /// Reinterprets a raw driver value according to the column's semantic type.
    ///
    /// Engines without native booleans or dates hand back integers and text;
    /// this turns them back into [`Value::Boolean`] and [`Value::Date`].
    /// Values that cannot be reinterpreted are returned unchanged.
    pub fn conform(self, semantic: SemanticType) -> Value {
        match (semantic, self) {
            (SemanticType::Boolean, Value::Integer(value)) => Value::Boolean(value != 0),
            (SemanticType::Date, Value::Text(text)) => match parse_date(&text) {
                Some(date) => Value::Date(date),
                None => Value::Text(text),
            },
            (_, other) => other,
        }
    }
}

/// Parses the date spellings engines commonly return.
pub fn parse_date(text: &str) -> Option<NaiveDateTime> {
    DATE_INPUT_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Integer(value) => write!(f, "{value}"),
            Value::Real(value) => write!(f, "{value}"),
            Value::Text(value) => f.write_str(value),
            Value::Boolean(value) => write!(f, "{value}"),
            Value::Date(value) => write!(f, "{}", value.format(DATE_FORMAT)),
        }
    }
}

//------------------------------------------------------------------------------
// From implementations
//------------------------------------------------------------------------------

macro_rules! impl_from_integer {
    ($($ty:ty),*) => { $(
        impl From<$ty> for Value {
            fn from(value: $ty) -> Self {
                Value::Integer(i64::from(value))
            }
        }
    )* }
}

impl_from_integer!(i8, i16, i32, i64, u8, u16, u32);

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Real(value)
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Value::Real(f64::from(value))
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(value: NaiveDateTime) -> Self {
        Value::Date(value)
    }
}

impl From<NaiveDate> for Value {
    fn from(value: NaiveDate) -> Self {
        Value::Date(NaiveDateTime::from(value))
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}
