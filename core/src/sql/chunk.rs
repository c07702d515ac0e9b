use std::borrow::Cow;
use std::fmt::Write;

use compact_str::CompactString;
use rowgate_types::Dialect;

use crate::sql::tokens::Token;
use crate::value::Value;

/// A SQL chunk represents a part of an SQL statement.
///
/// - `Token` - SQL keywords and operators (SELECT, FROM, =, etc.)
/// - `Ident` - Quoted identifiers (table, alias or bare column names)
/// - `Column` - Optionally qualified column reference
/// - `Raw` - Unquoted raw SQL text
/// - `Number` - Unsigned integer literal (LIMIT/OFFSET operands)
/// - `Param` - Bound value, rendered as a placeholder
#[derive(Debug, Clone, PartialEq)]
pub enum SQLChunk {
    /// Renders as: keyword with automatic spacing rules
    Token(Token),

    /// Renders as: "name"
    Ident(CompactString),

    /// Renders as: "qualifier"."name", or "name" without a qualifier
    Column {
        qualifier: Option<CompactString>,
        name: CompactString,
    },

    /// Renders as: text (no quotes, as-is)
    Raw(Cow<'static, str>),

    /// Renders as: the decimal literal
    Number(u64),

    /// Renders as: ? or $n depending on the dialect
    Param(Value),
}

impl SQLChunk {
    #[inline]
    pub const fn token(t: Token) -> Self {
        Self::Token(t)
    }

    #[inline]
    pub const fn raw_static(text: &'static str) -> Self {
        Self::Raw(Cow::Borrowed(text))
    }

    #[inline]
    pub fn ident(name: impl Into<CompactString>) -> Self {
        Self::Ident(name.into())
    }

    #[inline]
    pub fn column(qualifier: Option<&str>, name: impl Into<CompactString>) -> Self {
        Self::Column {
            qualifier: qualifier.map(CompactString::from),
            name: name.into(),
        }
    }

    /// Write chunk content to buffer. Parameters are written by the caller,
    /// which owns the placeholder counter.
    pub(crate) fn write(&self, dialect: Dialect, buf: &mut impl Write) {
        match self {
            SQLChunk::Token(token) => {
                let _ = buf.write_str(token.as_str());
            }
            SQLChunk::Ident(name) => dialect.write_ident(name, buf),
            SQLChunk::Column { qualifier, name } => {
                if let Some(qualifier) = qualifier {
                    dialect.write_ident(qualifier, buf);
                    let _ = buf.write_char('.');
                }
                dialect.write_ident(name, buf);
            }
            SQLChunk::Raw(text) => {
                let _ = buf.write_str(text);
            }
            SQLChunk::Number(value) => {
                let _ = write!(buf, "{value}");
            }
            SQLChunk::Param(_) => {
                let _ = buf.write_char('?');
            }
        }
    }

    /// Check if this chunk is "word-like" (needs space separation from other word-like chunks)
    #[inline]
    pub(crate) const fn is_word_like(&self) -> bool {
        match self {
            SQLChunk::Token(t) => !(t.is_punctuation() || t.is_operator()),
            SQLChunk::Ident(_)
            | SQLChunk::Column { .. }
            | SQLChunk::Raw(_)
            | SQLChunk::Number(_)
            | SQLChunk::Param(_) => true,
        }
    }
}

// ==================== From implementations ====================

impl From<Token> for SQLChunk {
    #[inline]
    fn from(value: Token) -> Self {
        Self::Token(value)
    }
}

impl From<Value> for SQLChunk {
    #[inline]
    fn from(value: Value) -> Self {
        Self::Param(value)
    }
}
