//! # rowgate
//!
//! A typed data-access layer over a SQL execution channel: structured filters
//! compiled to parameterized SQL, offset and keyset pagination, and per-request
//! batched loaders that collapse N point lookups into one query.
//!
//! ## Quick Start
//!
//! ```rust
//! # #[cfg(feature = "rusqlite")]
//! # fn main() -> rowgate::Result<()> {
//! use rowgate::prelude::*;
//! use rowgate::sqlite::SqliteExecutor;
//!
//! let schema = SchemaDef::new().with_table(
//!     TableDef::new("posts")
//!         .with_column(ColumnDef::new("post_id", SemanticType::Number))
//!         .with_column(ColumnDef::new("message", SemanticType::String))
//!         .with_column(ColumnDef::new("deleted", SemanticType::Boolean).nullable())
//!         .with_primary_key(["post_id"]),
//! );
//!
//! let conn = rusqlite::Connection::open_in_memory()?;
//! conn.execute_batch(
//!     "CREATE TABLE posts (post_id INTEGER PRIMARY KEY, message TEXT NOT NULL, deleted INTEGER);
//!      INSERT INTO posts VALUES (1, 'test 2', NULL), (2, 'first', NULL);",
//! )?;
//!
//! let gate = Rowgate::new(schema);
//! let scope = gate.scope(SqliteExecutor::new(&conn));
//! let posts = scope.table("posts")?;
//!
//! let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
//! let rows = rt.block_on(posts.find_many(&FindMany::new().filter(col("message").contains("est"))))?;
//! assert_eq!(rows.len(), 1);
//! assert_eq!(rows[0].get("post_id"), Some(&Value::Integer(1)));
//! # Ok(())
//! # }
//! # #[cfg(not(feature = "rusqlite"))]
//! # fn main() {}
//! ```
//!
//! ## Units of work
//!
//! [`Rowgate`] holds the schema and configuration and is shared. Each request
//! opens its own [`Scope`], which owns the loader caches for that request and
//! is dropped with it.
//!
//! ## Database Support
//!
//! | Database   | Driver   | Feature Flag |
//! |------------|----------|--------------|
//! | SQLite     | rusqlite | `rusqlite`   |
//!
//! Any other engine plugs in by implementing [`Executor`].

pub mod config;
mod scope;
mod table;

pub use config::{LoaderConfig, RowgateConfig};
pub use scope::{Rowgate, Scope};
pub use table::{FindMany, TableClient};

pub use rowgate_core::{
    BatchLoader, Cursor, Direction, Executor, Filter, FilterCompiler, LoaderKey, LoaderKind,
    LoaderOptions, OrderPlan, OrderSpec, Page, Result, Row, RowgateError, SQL, Statement, Value,
    build_order_and_limit, col, rel,
};
pub use rowgate_types::{
    ColumnDef, Dialect, KeyDef, RelationDef, SchemaDef, SemanticType, TableDef,
};

pub use rowgate_core;
pub use rowgate_types;

/// SQLite driver.
#[cfg(feature = "rusqlite")]
pub mod sqlite {
    pub use rowgate_sqlite::*;
}

/// Prelude module for commonly used types
pub mod prelude {
    pub use crate::{FindMany, Rowgate, RowgateConfig, Scope, TableClient};
    pub use rowgate_core::{
        Cursor, Direction, Executor, Filter, LoaderKey, OrderSpec, Page, Row, RowgateError, Value,
        col, rel,
    };
    pub use rowgate_types::prelude::*;
}
