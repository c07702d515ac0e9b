//! Core of the rowgate data-access layer: SQL fragments, the filter compiler,
//! ordering and pagination, and the batched loaders.

pub mod error;
pub mod exec;
pub mod filter;
pub mod helpers;
pub mod loader;
pub mod order;
pub mod row;
pub mod sql;
mod tracing;
pub mod value;

pub use rowgate_types;

pub use error::{Result, RowgateError};
pub use exec::{Executor, Statement};
pub use filter::{Filter, FilterCompiler, col, rel};
pub use loader::{BatchLoader, LoaderKey, LoaderKind, LoaderOptions};
pub use order::{Cursor, Direction, OrderPlan, OrderSpec, Page, build_order_and_limit};
pub use row::Row;
pub use sql::{SQL, SQLChunk, Token};
pub use value::Value;
