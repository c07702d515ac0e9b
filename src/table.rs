//! The per-table accessor surface.

use rowgate_core::error::{Result, RowgateError};
use rowgate_core::exec::{Executor, Statement};
use rowgate_core::filter::{Filter, FilterCompiler, col};
use rowgate_core::helpers;
use rowgate_core::loader::{LoaderKey, LoaderKind};
use rowgate_core::order::{OrderSpec, Page, build_order_and_limit};
use rowgate_core::row::Row;
use rowgate_core::sql::SQL;
use rowgate_core::value::Value;
use rowgate_types::{ColumnDef, SemanticType, TableDef};

use crate::scope::Scope;

/// Arguments of [`TableClient::find_many`].
///
/// ```
/// use rowgate::{FindMany, OrderSpec, Page, col};
///
/// let query = FindMany::new()
///     .filter(col("rating").gt(4.5))
///     .order(OrderSpec::new().asc("message"))
///     .page(Page::new().limit(10));
/// assert_eq!(query.page.limit, Some(10));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindMany {
    pub filter: Filter,
    pub order: OrderSpec,
    pub page: Page,
}

impl FindMany {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn filter(mut self, filter: impl Into<Filter>) -> Self {
        self.filter = filter.into();
        self
    }

    #[must_use]
    pub fn order(mut self, order: OrderSpec) -> Self {
        self.order = order;
        self
    }

    #[must_use]
    pub fn page(mut self, page: Page) -> Self {
        self.page = page;
        self
    }
}

/// Reads and writes one table inside a [`Scope`].
///
/// Soft-deleted rows are hidden unless the client was obtained through
/// [`include_deleted`](Self::include_deleted). Point lookups go through the
/// scope's batched loaders; `find_many` and the mutations compile straight to
/// SQL.
pub struct TableClient<'s, 'r, E> {
    scope: &'s Scope<'r, E>,
    table: &'r TableDef,
    include_deleted: bool,
}

impl<'s, 'r, E: Executor> TableClient<'s, 'r, E> {
    pub(crate) fn new(scope: &'s Scope<'r, E>, table: &'r TableDef) -> Self {
        Self {
            scope,
            table,
            include_deleted: false,
        }
    }

    pub fn name(&self) -> &'r str {
        &self.table.name
    }

    /// Returns soft-deleted rows as well.
    #[must_use]
    pub fn include_deleted(mut self) -> Self {
        self.include_deleted = true;
        self
    }

    /// Parses a where-object against this table.
    ///
    /// ```json
    /// { "message": { "contains": "est" }, "OR": [{ "rating": { "gt": 4.5 } }] }
    /// ```
    #[cfg(feature = "json")]
    pub fn parse_where(&self, value: &serde_json::Value) -> Result<Filter> {
        Filter::from_json(self.scope.schema(), &self.table.name, value)
    }

    /// Rows matching `query.filter`, ordered and paginated.
    ///
    /// Soft-deleted rows are excluded in SQL, so a `limit` counts visible rows
    /// only. Backward pages come back in the declared order.
    pub async fn find_many(&self, query: &FindMany) -> Result<Vec<Row>> {
        let exec = self.scope.executor();
        let dialect = exec.dialect();
        let plan = build_order_and_limit(self.table, &query.order, &query.page, dialect)?;

        let mut parts = vec![query.filter.clone()];
        parts.extend(plan.keyset);
        parts.extend(self.visible_filter());
        let filter = match parts.len() {
            1 => parts.remove(0),
            _ => Filter::and(parts),
        };

        let condition = self.compiler().compile(&self.table.name, &filter)?;
        let sql = helpers::select(&self.table.name, condition, plan.order_by, plan.limit);

        let mut rows: Vec<Row> = exec
            .query(&Statement::render(&sql, dialect))
            .await?
            .into_iter()
            .map(|row| row.conform(self.table))
            .collect();
        if plan.reverse {
            rows.reverse();
        }
        Ok(rows)
    }

    /// The row with the unique `key`, batched with every other lookup on the
    /// same key shape issued in this turn.
    ///
    /// `key` must name exactly the columns of a declared unique key.
    pub async fn find_unique(&self, key: &LoaderKey) -> Result<Option<Row>> {
        let columns: Vec<&str> = key.columns().collect();
        let loader = self.scope.loader(&self.table.name, &columns, LoaderKind::Unique)?;
        let row = loader.load_one(self.scope.executor(), key).await?;
        Ok(row.filter(|row| self.is_visible(row)))
    }

    /// Every row with the non-unique `key`.
    ///
    /// The first ordering requested for a key within the scope sticks; later
    /// requests for the same key reuse those rows in that order.
    pub async fn find_many_by_key(
        &self,
        key: &LoaderKey,
        order: Option<&OrderSpec>,
    ) -> Result<Vec<Row>> {
        let columns: Vec<&str> = key.columns().collect();
        let loader = self.scope.loader(&self.table.name, &columns, LoaderKind::Many)?;
        let rows = loader.load_many(self.scope.executor(), key, order).await?;
        Ok(rows.into_iter().filter(|row| self.is_visible(row)).collect())
    }

    /// Inserts `rows` and returns the number of rows written.
    ///
    /// Every row must carry the same columns.
    pub async fn insert(&self, rows: &[Row]) -> Result<u64> {
        let Some(first) = rows.first() else {
            return Ok(0);
        };
        if first.is_empty() {
            return Err(RowgateError::InvalidMutation("insert without values".into()));
        }
        let columns: Vec<&str> = first.columns().collect();
        for row in rows {
            row.check(self.table)?;
            let same_shape =
                row.len() == columns.len() && columns.iter().all(|column| row.contains(column));
            if !same_shape {
                return Err(RowgateError::InvalidMutation(
                    "inserted rows must share one column set".into(),
                ));
            }
        }

        let sql = helpers::insert(&self.table.name, &columns, rows);
        self.write(&sql).await
    }

    /// Sets `values` on every row matching `filter`; returns the number of
    /// rows changed.
    ///
    /// `filter` must constrain something and `values` must be non-empty.
    pub async fn update(&self, filter: &Filter, values: Row) -> Result<u64> {
        if filter.is_unconstrained() {
            return Err(RowgateError::InvalidMutation(
                "update without a where condition".into(),
            ));
        }
        if values.is_empty() {
            return Err(RowgateError::InvalidMutation("update without values".into()));
        }
        values.check(self.table)?;

        let condition = self.compiler().compile(&self.table.name, filter)?;
        let sql = helpers::update(&self.table.name, &values, condition);
        self.write(&sql).await
    }

    /// Flags every row matching `filter` as deleted.
    pub async fn soft_delete(&self, filter: &Filter) -> Result<u64> {
        let column = self.scope.soft_delete_column(self.table).ok_or_else(|| {
            RowgateError::InvalidMutation(
                compact_str::format_compact!("table {} has no soft-delete column", self.table.name),
            )
        })?;
        let flag = match column.semantic {
            SemanticType::Boolean => Value::Boolean(true),
            _ => Value::Integer(1),
        };
        if filter.is_unconstrained() {
            return Err(RowgateError::InvalidMutation(
                "soft delete without a where condition".into(),
            ));
        }
        self.update(filter, Row::new().with(column.name.as_str(), flag))
            .await
    }

    /// Runs a write and invalidates this table's loaders, whether or not the
    /// statement succeeded.
    async fn write(&self, sql: &SQL) -> Result<u64> {
        let exec = self.scope.executor();
        let outcome = exec.execute(&Statement::render(sql, exec.dialect())).await;
        self.scope.invalidate(&self.table.name);
        outcome
    }

    fn compiler(&self) -> FilterCompiler<'r> {
        FilterCompiler::new(self.scope.schema())
    }

    /// `deleted IS NULL OR deleted = false`, unless deleted rows are wanted.
    fn visible_filter(&self) -> Option<Filter> {
        if self.include_deleted {
            return None;
        }
        let column = self.scope.soft_delete_column(self.table)?;
        let not_deleted = col(column.name.as_str()).equals(not_deleted_value(column));
        Some(if column.nullable {
            Filter::or([col(column.name.as_str()).is_null(), not_deleted])
        } else {
            not_deleted.into()
        })
    }

    fn is_visible(&self, row: &Row) -> bool {
        if self.include_deleted {
            return true;
        }
        match self.scope.soft_delete_column(self.table) {
            Some(column) => !row.get(&column.name).is_some_and(Value::is_truthy),
            None => true,
        }
    }
}

fn not_deleted_value(column: &ColumnDef) -> Value {
    match column.semantic {
        SemanticType::Boolean => Value::Boolean(false),
        _ => Value::Integer(0),
    }
}
