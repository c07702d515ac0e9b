//! The execution interface the data-access layer runs statements through.

use rowgate_types::Dialect;

use crate::error::Result;
use crate::row::Row;
use crate::sql::SQL;
use crate::value::Value;

/// A rendered statement: SQL text plus its bound values, in placeholder order.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<Value>,
}

impl Statement {
    /// Renders `sql` for `dialect`.
    pub fn render(sql: &SQL, dialect: Dialect) -> Self {
        let (sql, params) = sql.build(dialect);
        Self { sql, params }
    }
}

/// A SQL execution channel supplied by a driver.
///
/// Implementations own connection handling; they may wrap a bare connection,
/// a pooled connection or an open transaction. Failures are reported as
/// [`RowgateError::ExecutionFailure`](crate::RowgateError::ExecutionFailure).
#[allow(async_fn_in_trait)]
pub trait Executor {
    /// Dialect used to render statements for this executor.
    fn dialect(&self) -> Dialect;

    /// Runs a statement that returns rows.
    async fn query(&self, statement: &Statement) -> Result<Vec<Row>>;

    /// Runs a statement and returns the number of affected rows.
    async fn execute(&self, statement: &Statement) -> Result<u64>;
}

impl<E: Executor> Executor for &E {
    fn dialect(&self) -> Dialect {
        (**self).dialect()
    }

    async fn query(&self, statement: &Statement) -> Result<Vec<Row>> {
        (**self).query(statement).await
    }

    async fn execute(&self, statement: &Statement) -> Result<u64> {
        (**self).execute(statement).await
    }
}
