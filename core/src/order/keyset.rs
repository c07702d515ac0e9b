use compact_str::format_compact;
use rowgate_types::{Dialect, TableDef};

use super::{Cursor, Direction, OrderSpec, Page};
use crate::error::{Result, RowgateError};
use crate::filter::{Filter, col};
use crate::row::Row;
use crate::sql::{SQL, Token};
use crate::value::Value;

/// Ordering and pagination fragments for one query.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderPlan {
    /// Keyset predicate, to be conjoined with the caller's filter
    pub keyset: Option<Filter>,
    /// `ORDER BY ...`, empty without an ordering
    pub order_by: SQL,
    /// `LIMIT ... OFFSET ...`, empty when unbounded
    pub limit: SQL,
    /// The physical order is reversed; rows must be reversed before returning
    pub reverse: bool,
}

/// Builds ORDER BY, LIMIT/OFFSET and the keyset predicate for `page`.
///
/// Backward cursors flip every direction so the engine reads the rows nearest
/// the cursor first; [`OrderPlan::reverse`] tells the caller to restore the
/// declared order afterwards.
pub fn build_order_and_limit(
    table: &TableDef,
    order: &OrderSpec,
    page: &Page,
    dialect: Dialect,
) -> Result<OrderPlan> {
    for (column, _) in order.iter() {
        if table.column(column).is_none() {
            return Err(RowgateError::unknown_field(&table.name, column));
        }
    }

    let reverse = page.is_backward();
    let (keyset, offset) = match &page.cursor {
        None => (None, None),
        Some(Cursor::Offset(offset)) => (None, Some(*offset)),
        Some(Cursor::After(values)) => (
            Some(keyset_filter(table, order, values, false, dialect)?),
            None,
        ),
        Some(Cursor::Before(values)) => (
            Some(keyset_filter(table, order, values, true, dialect)?),
            None,
        ),
    };

    Ok(OrderPlan {
        keyset,
        order_by: order_by(&table.name, order, reverse),
        limit: limit_offset(page.limit, offset, dialect),
        reverse,
    })
}

fn order_by(table: &str, order: &OrderSpec, reverse: bool) -> SQL {
    if order.is_empty() {
        return SQL::empty();
    }

    let columns = order.iter().map(|(column, direction)| {
        let direction = if reverse {
            direction.reverse()
        } else {
            direction
        };
        SQL::column(Some(table), column).push(match direction {
            Direction::Asc => Token::ASC,
            Direction::Desc => Token::DESC,
        })
    });

    SQL::token(Token::ORDER)
        .push(Token::BY)
        .append(SQL::join(columns, Token::COMMA))
}

fn limit_offset(limit: Option<u64>, offset: Option<u64>, dialect: Dialect) -> SQL {
    let offset = offset.filter(|offset| *offset > 0);
    let limit_sql = match (limit, offset) {
        (Some(limit), _) => SQL::token(Token::LIMIT).append(SQL::number(limit)),
        (None, Some(_)) => match dialect.unbounded_limit() {
            Some(unbounded) => SQL::token(Token::LIMIT).append(SQL::raw(unbounded)),
            None => SQL::empty(),
        },
        (None, None) => SQL::empty(),
    };

    match offset {
        Some(offset) => limit_sql
            .push(Token::OFFSET)
            .append(SQL::number(offset)),
        None => limit_sql,
    }
}

/// Row-comparison expansion of a keyset cursor:
/// `(c1 > v1) OR (c1 = v1 AND c2 > v2) OR ...`, with `>` flipped to `<` for
/// descending columns and flipped again when paging backward.
///
/// Only the ordering columns named by the cursor take part, in ordering order.
/// Nullable columns keep NULL where `dialect` sorts it, so rows holding NULL
/// and NULL cursor values both have a position in the scan.
fn keyset_filter(
    table: &TableDef,
    order: &OrderSpec,
    values: &Row,
    backward: bool,
    dialect: Dialect,
) -> Result<Filter> {
    if values.is_empty() {
        return Err(RowgateError::InvalidCursor("cursor has no values".into()));
    }
    if order.is_empty() {
        return Err(RowgateError::InvalidCursor(
            "a keyset cursor needs an ordering".into(),
        ));
    }
    if let Some(column) = values.columns().find(|column| order.direction(column).is_none()) {
        return Err(RowgateError::InvalidCursor(format_compact!(
            "cursor column {column} is not part of the ordering"
        )));
    }

    let mut named = Vec::with_capacity(values.len());
    for (column, direction) in order.iter() {
        let Some(value) = values.get(column) else {
            continue;
        };
        let nullable = table.column(column).is_some_and(|def| def.nullable);
        if value.is_null() && !nullable {
            return Err(RowgateError::InvalidCursor(format_compact!(
                "cursor value for {column} is null"
            )));
        }
        let ascending = matches!(direction, Direction::Asc) != backward;
        named.push(KeysetColumn {
            column,
            value,
            ascending,
            nullable,
            nulls_last: ascending != dialect.nulls_sort_first(),
        });
    }

    let mut branches = Vec::with_capacity(named.len());
    for (depth, column) in named.iter().enumerate() {
        let Some(beyond) = column.beyond() else {
            continue;
        };
        let mut terms: Vec<Filter> = named[..depth].iter().map(KeysetColumn::at).collect();
        terms.push(beyond);
        branches.push(Filter::and(terms));
    }

    match (branches.is_empty(), named.first()) {
        // The cursor sits on the last position the ordering can reach
        (true, Some(first)) => Ok(col(first.column).is_in(Vec::<Value>::new()).into()),
        _ => Ok(Filter::or(branches)),
    }
}

/// One cursor column as seen by the scan.
struct KeysetColumn<'a> {
    column: &'a str,
    value: &'a Value,
    /// Scan direction after applying the page direction
    ascending: bool,
    nullable: bool,
    /// NULL comes after every other value in scan order
    nulls_last: bool,
}

impl KeysetColumn<'_> {
    /// Rows tied with the cursor on this column.
    fn at(&self) -> Filter {
        if self.value.is_null() {
            col(self.column).is_null().into()
        } else {
            col(self.column).equals(self.value.clone()).into()
        }
    }

    /// Rows strictly past the cursor on this column, `None` when none can be.
    fn beyond(&self) -> Option<Filter> {
        if self.value.is_null() {
            return (!self.nulls_last).then(|| col(self.column).is_not_null().into());
        }

        let comparison: Filter = if self.ascending {
            col(self.column).gt(self.value.clone())
        } else {
            col(self.column).lt(self.value.clone())
        }
        .into();

        Some(if self.nullable && self.nulls_last {
            Filter::or([comparison, col(self.column).is_null().into()])
        } else {
            comparison
        })
    }
}
