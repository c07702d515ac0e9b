//! Shared type definitions for rowgate
//!
//! This crate holds the metadata every other rowgate crate consumes:
//!
//! - [`Dialect`] - Database dialect enum (SQLite, PostgreSQL, MySQL)
//! - [`SchemaDef`] and friends - the per-table column, key and relation
//!   metadata an introspection step hands to the data-access layer
//!
//! # Features
//!
//! - `serde` - Enable serde serialization/deserialization of schema metadata

mod dialect;
pub mod schema;

pub use dialect::{Dialect, DialectParseError};
pub use schema::{ColumnDef, JoinColumns, KeyDef, RelationDef, SchemaDef, SemanticType, TableDef};

/// Prelude module for commonly used types
pub mod prelude {
    pub use crate::Dialect;
    pub use crate::schema::{
        ColumnDef, JoinColumns, KeyDef, RelationDef, SchemaDef, SemanticType, TableDef,
    };
}
