//! Structured filter trees and their builders.
//!
//! A [`Filter`] is a closed sum of column predicates, boolean combinators and
//! relation sub-filters. Trees are plain values; [`FilterCompiler`] turns them
//! into parameterized WHERE fragments against a [`SchemaDef`](rowgate_types::SchemaDef).
//!
//! ```
//! use rowgate_core::filter::{Filter, col, rel};
//!
//! let filter = Filter::and([
//!     Filter::from(col("message").contains("est")),
//!     rel("author").exists(col("first_name").equals("John")),
//! ]);
//! assert_eq!(filter.leaf_count(), 2);
//! ```

mod compile;
#[cfg(feature = "serde")]
mod json;

pub use compile::FilterCompiler;

use compact_str::CompactString;
use smallvec::SmallVec;

use crate::value::Value;

/// One operator applied to a column.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// `= value`, or `IS NULL` when the operand is NULL
    Equals(Value),
    /// `<> value`, or `IS NOT NULL` when the operand is NULL
    NotEquals(Value),
    In(Vec<Value>),
    NotIn(Vec<Value>),
    Gt(Value),
    Gte(Value),
    Lt(Value),
    Lte(Value),
    Contains(String),
    StartsWith(String),
    EndsWith(String),
    IsNull,
    IsNotNull,
}

/// Operators on a single column, conjoined.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnFilter {
    pub column: CompactString,
    pub conditions: SmallVec<[Condition; 2]>,
}

/// Starts a predicate on `column`.
#[inline]
pub fn col(column: impl Into<CompactString>) -> ColumnFilter {
    ColumnFilter {
        column: column.into(),
        conditions: SmallVec::new(),
    }
}

impl ColumnFilter {
    #[must_use]
    pub fn condition(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    #[must_use]
    pub fn equals(self, value: impl Into<Value>) -> Self {
        self.condition(Condition::Equals(value.into()))
    }

    #[must_use]
    pub fn not_equals(self, value: impl Into<Value>) -> Self {
        self.condition(Condition::NotEquals(value.into()))
    }

    #[must_use]
    pub fn is_in<I>(self, values: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        self.condition(Condition::In(values.into_iter().map(Into::into).collect()))
    }

    #[must_use]
    pub fn not_in<I>(self, values: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        self.condition(Condition::NotIn(
            values.into_iter().map(Into::into).collect(),
        ))
    }

    #[must_use]
    pub fn gt(self, value: impl Into<Value>) -> Self {
        self.condition(Condition::Gt(value.into()))
    }

    #[must_use]
    pub fn gte(self, value: impl Into<Value>) -> Self {
        self.condition(Condition::Gte(value.into()))
    }

    #[must_use]
    pub fn lt(self, value: impl Into<Value>) -> Self {
        self.condition(Condition::Lt(value.into()))
    }

    #[must_use]
    pub fn lte(self, value: impl Into<Value>) -> Self {
        self.condition(Condition::Lte(value.into()))
    }

    #[must_use]
    pub fn contains(self, needle: impl Into<String>) -> Self {
        self.condition(Condition::Contains(needle.into()))
    }

    #[must_use]
    pub fn starts_with(self, prefix: impl Into<String>) -> Self {
        self.condition(Condition::StartsWith(prefix.into()))
    }

    #[must_use]
    pub fn ends_with(self, suffix: impl Into<String>) -> Self {
        self.condition(Condition::EndsWith(suffix.into()))
    }

    #[must_use]
    pub fn is_null(self) -> Self {
        self.condition(Condition::IsNull)
    }

    #[must_use]
    pub fn is_not_null(self) -> Self {
        self.condition(Condition::IsNotNull)
    }
}

/// Boolean combinator keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoolOp {
    And,
    Or,
    /// Negates the conjunction of the children
    Not,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Combinator {
    pub op: BoolOp,
    pub children: Vec<Filter>,
}

/// How a relation sub-filter quantifies over the related rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quantifier {
    /// Every related row matches; true when there are none
    Every,
    /// At least one related row matches
    Exists,
    /// No related row matches
    NotExists,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RelationFilter {
    pub relation: CompactString,
    pub quantifier: Quantifier,
    /// Scoped to the related table
    pub filter: Box<Filter>,
}

/// Starts a sub-filter over the relation named `relation`.
#[inline]
pub fn rel(relation: impl Into<CompactString>) -> RelationBuilder {
    RelationBuilder {
        relation: relation.into(),
    }
}

pub struct RelationBuilder {
    relation: CompactString,
}

impl RelationBuilder {
    fn build(self, quantifier: Quantifier, filter: impl Into<Filter>) -> Filter {
        Filter::Relation(RelationFilter {
            relation: self.relation,
            quantifier,
            filter: Box::new(filter.into()),
        })
    }

    pub fn every(self, filter: impl Into<Filter>) -> Filter {
        self.build(Quantifier::Every, filter)
    }

    pub fn exists(self, filter: impl Into<Filter>) -> Filter {
        self.build(Quantifier::Exists, filter)
    }

    pub fn not_exists(self, filter: impl Into<Filter>) -> Filter {
        self.build(Quantifier::NotExists, filter)
    }
}

/// A node of the filter tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Column(ColumnFilter),
    Combinator(Combinator),
    Relation(RelationFilter),
}

impl Filter {
    /// The empty conjunction, matching every row.
    #[must_use]
    pub fn all() -> Self {
        Self::and(std::iter::empty::<Filter>())
    }

    fn combine<I>(op: BoolOp, children: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Filter>,
    {
        Self::Combinator(Combinator {
            op,
            children: children.into_iter().map(Into::into).collect(),
        })
    }

    pub fn and<I>(children: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Filter>,
    {
        Self::combine(BoolOp::And, children)
    }

    pub fn or<I>(children: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Filter>,
    {
        Self::combine(BoolOp::Or, children)
    }

    pub fn not<I>(children: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Filter>,
    {
        Self::combine(BoolOp::Not, children)
    }

    /// Number of predicates that actually constrain rows.
    ///
    /// Column predicates without operators and empty combinators do not count,
    /// relation filters always do.
    #[must_use]
    pub fn leaf_count(&self) -> usize {
        match self {
            Filter::Column(column) => usize::from(!column.conditions.is_empty()),
            Filter::Combinator(combinator) => {
                combinator.children.iter().map(Filter::leaf_count).sum()
            }
            Filter::Relation(_) => 1,
        }
    }

    /// `true` when the filter has no leaf predicates.
    #[inline]
    #[must_use]
    pub fn is_unconstrained(&self) -> bool {
        self.leaf_count() == 0
    }
}

impl Default for Filter {
    fn default() -> Self {
        Self::all()
    }
}

impl From<ColumnFilter> for Filter {
    fn from(value: ColumnFilter) -> Self {
        Self::Column(value)
    }
}

impl From<RelationFilter> for Filter {
    fn from(value: RelationFilter) -> Self {
        Self::Relation(value)
    }
}

impl From<Combinator> for Filter {
    fn from(value: Combinator) -> Self {
        Self::Combinator(value)
    }
}
