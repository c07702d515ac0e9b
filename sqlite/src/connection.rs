//! `rusqlite`-backed executor.

use rowgate_core::error::Result;
use rowgate_core::exec::{Executor, Statement};
use rowgate_core::row::Row;
use rowgate_core::rowgate_trace_query;
use rowgate_types::Dialect;
use rusqlite::{Connection, params_from_iter};

use crate::values::{SqliteParam, value_from_ref};

/// Runs rowgate statements on a borrowed SQLite connection.
///
/// The executor never opens, pools or commits anything. Pass a
/// [`rusqlite::Transaction`] (it derefs to a [`Connection`]) to run a unit of
/// work inside a transaction.
///
/// ```
/// use rowgate_sqlite::SqliteExecutor;
///
/// let conn = rusqlite::Connection::open_in_memory().unwrap();
/// let exec = SqliteExecutor::new(&conn);
/// assert!(std::ptr::eq(exec.conn(), &conn));
/// ```
#[derive(Debug, Clone, Copy)]
pub struct SqliteExecutor<'c> {
    conn: &'c Connection,
}

impl<'c> SqliteExecutor<'c> {
    pub const fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    /// Gets a reference to the underlying connection
    pub const fn conn(&self) -> &'c Connection {
        self.conn
    }

    fn query_rows(&self, statement: &Statement) -> Result<Vec<Row>> {
        rowgate_trace_query!(&statement.sql, statement.params.len());

        let mut stmt = self.conn.prepare(&statement.sql)?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

        let mut rows = stmt.query(params_from_iter(statement.params.iter().map(SqliteParam)))?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let mut decoded = Row::with_capacity(columns.len());
            for (index, column) in columns.iter().enumerate() {
                let value = value_from_ref(column, row.get_ref(index)?)?;
                decoded.set(column.as_str(), value);
            }
            out.push(decoded);
        }
        Ok(out)
    }

    fn execute_statement(&self, statement: &Statement) -> Result<u64> {
        rowgate_trace_query!(&statement.sql, statement.params.len());

        let affected = self
            .conn
            .execute(&statement.sql, params_from_iter(statement.params.iter().map(SqliteParam)))?;
        Ok(affected as u64)
    }
}

impl<'c> From<&'c Connection> for SqliteExecutor<'c> {
    fn from(conn: &'c Connection) -> Self {
        Self::new(conn)
    }
}

impl Executor for SqliteExecutor<'_> {
    fn dialect(&self) -> Dialect {
        Dialect::SQLite
    }

    async fn query(&self, statement: &Statement) -> Result<Vec<Row>> {
        self.query_rows(statement)
    }

    async fn execute(&self, statement: &Statement) -> Result<u64> {
        self.execute_statement(statement)
    }
}
