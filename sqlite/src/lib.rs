//! SQLite driver for rowgate
//!
//! Provides an [`Executor`](rowgate_core::Executor) over a borrowed
//! [`rusqlite::Connection`] (or anything that derefs to one, such as a
//! [`rusqlite::Transaction`]), plus the value conversions between rowgate's
//! [`Value`](rowgate_core::Value) and SQLite storage classes.
//!
//! # Features
//!
//! - `rusqlite` - the `rusqlite` executor (default)
//! - `tracing` - emit a debug event for every executed statement

#[cfg(feature = "rusqlite")]
pub mod connection;
#[cfg(feature = "rusqlite")]
pub mod values;

#[cfg(feature = "rusqlite")]
pub use connection::SqliteExecutor;
#[cfg(feature = "rusqlite")]
pub use values::{SqliteParam, value_from_ref};
