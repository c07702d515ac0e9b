//! Ordering specs, cursors and page requests.

mod keyset;

pub use keyset::{OrderPlan, build_order_and_limit};

use compact_str::CompactString;
use smallvec::SmallVec;

use crate::error::{Result, RowgateError};
use crate::row::Row;

/// Sort direction of one ordering column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    #[inline]
    #[must_use]
    pub const fn reverse(self) -> Self {
        match self {
            Direction::Asc => Direction::Desc,
            Direction::Desc => Direction::Asc,
        }
    }
}

/// Ordered mapping from column to direction. Earlier columns take precedence;
/// ordering the same column twice updates its direction in place.
///
/// ```
/// use rowgate_core::order::{Direction, OrderSpec};
///
/// let order = OrderSpec::new().asc("last_name").desc("user_id").desc("last_name");
/// let columns: Vec<_> = order.iter().collect();
/// assert_eq!(columns, [("last_name", Direction::Desc), ("user_id", Direction::Desc)]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct OrderSpec {
    entries: SmallVec<[(CompactString, Direction); 4]>,
}

impl OrderSpec {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn asc(self, column: impl Into<CompactString>) -> Self {
        self.then(column, Direction::Asc)
    }

    #[must_use]
    pub fn desc(self, column: impl Into<CompactString>) -> Self {
        self.then(column, Direction::Desc)
    }

    #[must_use]
    pub fn then(mut self, column: impl Into<CompactString>, direction: Direction) -> Self {
        self.push(column, direction);
        self
    }

    pub fn push(&mut self, column: impl Into<CompactString>, direction: Direction) {
        let column = column.into();
        match self.entries.iter_mut().find(|(name, _)| *name == column) {
            Some((_, slot)) => *slot = direction,
            None => self.entries.push((column, direction)),
        }
    }

    #[must_use]
    pub fn direction(&self, column: &str) -> Option<Direction> {
        self.entries
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, direction)| *direction)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Direction)> {
        self.entries
            .iter()
            .map(|(name, direction)| (name.as_str(), *direction))
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Where a page starts.
#[derive(Debug, Clone, PartialEq)]
pub enum Cursor {
    /// Skip this many rows
    Offset(u64),
    /// Rows strictly after these ordering-column values
    After(Row),
    /// Rows strictly before these ordering-column values
    Before(Row),
}

impl Cursor {
    /// Forward cursor continuing after `row`, e.g. the last row of a page.
    pub fn from_row(row: &Row, order: &OrderSpec) -> Result<Cursor> {
        Ok(Cursor::After(cursor_values(row, order)?))
    }

    /// Backward cursor ending before `row`, e.g. the first row of a page.
    pub fn before_row(row: &Row, order: &OrderSpec) -> Result<Cursor> {
        Ok(Cursor::Before(cursor_values(row, order)?))
    }

    #[inline]
    #[must_use]
    pub const fn is_backward(&self) -> bool {
        matches!(self, Cursor::Before(_))
    }
}

fn cursor_values(row: &Row, order: &OrderSpec) -> Result<Row> {
    if order.is_empty() {
        return Err(RowgateError::InvalidCursor(
            "a keyset cursor needs an ordering".into(),
        ));
    }
    order
        .iter()
        .map(|(column, _)| {
            row.get(column)
                .map(|value| (column, value.clone()))
                .ok_or_else(|| {
                    RowgateError::InvalidCursor(compact_str::format_compact!(
                        "row has no value for ordering column {column}"
                    ))
                })
        })
        .collect()
}

/// Pagination request: an optional cursor and an optional page size.
///
/// A page shorter than `limit` means the results are exhausted; without a
/// limit nothing can be inferred from the page length.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub cursor: Option<Cursor>,
    pub limit: Option<u64>,
}

impl Page {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    #[must_use]
    pub fn offset(mut self, offset: u64) -> Self {
        self.cursor = Some(Cursor::Offset(offset));
        self
    }

    /// Starts strictly after the given ordering-column values.
    #[must_use]
    pub fn after(mut self, values: Row) -> Self {
        self.cursor = Some(Cursor::After(values));
        self
    }

    /// Ends strictly before the given ordering-column values.
    #[must_use]
    pub fn before(mut self, values: Row) -> Self {
        self.cursor = Some(Cursor::Before(values));
        self
    }

    #[must_use]
    pub fn cursor(mut self, cursor: Cursor) -> Self {
        self.cursor = Some(cursor);
        self
    }

    #[inline]
    #[must_use]
    pub fn is_backward(&self) -> bool {
        self.cursor.as_ref().is_some_and(Cursor::is_backward)
    }
}
