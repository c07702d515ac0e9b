//! Schema metadata consumed by the data-access layer.
//!
//! A [`SchemaDef`] is the narrow view of database introspection that the
//! filter compiler, the loaders and the row facade need: column names with a
//! semantic type and nullability, unique and non-unique key groupings, and
//! named foreign-key relations.
//!
//! # Examples
//!
//! ```
//! use rowgate_types::{ColumnDef, RelationDef, SchemaDef, SemanticType, TableDef};
//!
//! let schema = SchemaDef::new()
//!     .with_table(
//!         TableDef::new("users")
//!             .with_column(ColumnDef::new("user_id", SemanticType::Number))
//!             .with_primary_key(["user_id"])
//!             .with_relation(RelationDef::new("author_posts", "posts").on("user_id", "author_id")),
//!     )
//!     .with_table(
//!         TableDef::new("posts")
//!             .with_column(ColumnDef::new("post_id", SemanticType::Number))
//!             .with_column(ColumnDef::new("author_id", SemanticType::Number))
//!             .with_primary_key(["post_id"]),
//!     );
//!
//! let users = schema.table("users").unwrap();
//! assert!(users.relation("author_posts").is_some());
//! assert!(users.unique_key(&["user_id"]).is_some());
//! ```

/// Semantic type of a column, used to check filter operands.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum SemanticType {
    String,
    Number,
    Boolean,
    Date,
}

impl SemanticType {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Date => "date",
        }
    }

    /// Loaders are only generated for string and number key columns.
    #[inline]
    #[must_use]
    pub const fn is_loader_key(&self) -> bool {
        matches!(self, Self::String | Self::Number)
    }
}

impl std::fmt::Display for SemanticType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single table column.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ColumnDef {
    pub name: String,
    #[cfg_attr(feature = "serde", serde(rename = "type"))]
    pub semantic: SemanticType,
    #[cfg_attr(feature = "serde", serde(default))]
    pub nullable: bool,
}

impl ColumnDef {
    #[must_use]
    pub fn new(name: impl Into<String>, semantic: SemanticType) -> Self {
        Self {
            name: name.into(),
            semantic,
            nullable: false,
        }
    }

    /// Marks the column as accepting NULL.
    #[must_use]
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }
}

/// A key grouping: a primary key, unique constraint or plain index.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct KeyDef {
    pub columns: Vec<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub unique: bool,
}

impl KeyDef {
    #[must_use]
    pub fn unique<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            unique: true,
        }
    }

    #[must_use]
    pub fn non_unique<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            unique: false,
        }
    }

    /// Returns `true` if this key covers exactly `columns`, in any order.
    #[must_use]
    pub fn matches(&self, columns: &[&str]) -> bool {
        self.columns.len() == columns.len()
            && columns
                .iter()
                .all(|column| self.columns.iter().any(|own| own == column))
    }
}

/// One column pair of a relation's join condition.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct JoinColumns {
    /// Column on the table that declares the relation
    pub local: String,
    /// Column on the related table
    pub foreign: String,
}

/// A named foreign-key relation from one table to another.
///
/// Relations are declared from the point of view of the table that filters
/// through them, so a one-to-many link is usually declared twice: once on each
/// side (`users.author_posts -> posts` and `posts.author -> users`).
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RelationDef {
    pub name: String,
    /// Name of the related table
    pub target: String,
    pub joins: Vec<JoinColumns>,
}

impl RelationDef {
    #[must_use]
    pub fn new(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            target: target.into(),
            joins: Vec::new(),
        }
    }

    /// Adds a join column pair (`local` on this table, `foreign` on the target).
    #[must_use]
    pub fn on(mut self, local: impl Into<String>, foreign: impl Into<String>) -> Self {
        self.joins.push(JoinColumns {
            local: local.into(),
            foreign: foreign.into(),
        });
        self
    }
}

/// Metadata for one table.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TableDef {
    pub name: String,
    pub columns: Vec<ColumnDef>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub keys: Vec<KeyDef>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub relations: Vec<RelationDef>,
}

impl TableDef {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            keys: Vec::new(),
            relations: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_column(mut self, column: ColumnDef) -> Self {
        self.columns.push(column);
        self
    }

    /// Primary keys are unique keys as far as loaders are concerned.
    #[must_use]
    pub fn with_primary_key<I, S>(self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.with_key(KeyDef::unique(columns))
    }

    #[must_use]
    pub fn with_key(mut self, key: KeyDef) -> Self {
        self.keys.push(key);
        self
    }

    #[must_use]
    pub fn with_relation(mut self, relation: RelationDef) -> Self {
        self.relations.push(relation);
        self
    }

    /// Looks up a column by name.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|column| column.name == name)
    }

    /// Looks up a relation by name.
    #[must_use]
    pub fn relation(&self, name: &str) -> Option<&RelationDef> {
        self.relations.iter().find(|relation| relation.name == name)
    }

    /// Finds the unique key covering exactly `columns`.
    #[must_use]
    pub fn unique_key(&self, columns: &[&str]) -> Option<&KeyDef> {
        self.keys
            .iter()
            .find(|key| key.unique && key.matches(columns))
    }

    /// Finds the non-unique key covering exactly `columns`.
    #[must_use]
    pub fn non_unique_key(&self, columns: &[&str]) -> Option<&KeyDef> {
        self.keys
            .iter()
            .find(|key| !key.unique && key.matches(columns))
    }

    pub fn unique_keys(&self) -> impl Iterator<Item = &KeyDef> {
        self.keys.iter().filter(|key| key.unique)
    }

    pub fn non_unique_keys(&self) -> impl Iterator<Item = &KeyDef> {
        self.keys.iter().filter(|key| !key.unique)
    }
}

/// The full set of tables the data-access layer knows about.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SchemaDef {
    pub tables: Vec<TableDef>,
}

impl SchemaDef {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_table(mut self, table: TableDef) -> Self {
        self.tables.push(table);
        self
    }

    #[must_use]
    pub fn table(&self, name: &str) -> Option<&TableDef> {
        self.tables.iter().find(|table| table.name == name)
    }
}
