//! Unified database dialect enum
//!
//! Dialect decides the few places where rendered SQL differs between engines:
//! placeholder syntax, identifier quoting and the "no limit" spelling used when
//! only an OFFSET is requested.

use std::fmt::Write;

/// SQL dialect for database-specific rendering
///
/// # Examples
///
/// ```
/// use rowgate_types::Dialect;
///
/// let dialect = Dialect::PostgreSQL;
/// assert!(dialect.uses_numbered_placeholders());
///
/// let sqlite = Dialect::SQLite;
/// assert!(!sqlite.uses_numbered_placeholders());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Dialect {
    /// SQLite - uses `?` positional placeholders
    #[default]
    SQLite,

    /// PostgreSQL - uses `$1, $2, ...` numbered placeholders
    PostgreSQL,

    /// MySQL - uses `?` positional placeholders and backtick identifiers
    MySQL,
}

impl Dialect {
    /// Returns `true` if this dialect uses numbered placeholders (`$1, $2, ...`)
    #[inline]
    #[must_use]
    pub const fn uses_numbered_placeholders(&self) -> bool {
        matches!(self, Dialect::PostgreSQL)
    }

    /// Parse a dialect from a string (case-insensitive)
    ///
    /// Supports various common aliases:
    /// - SQLite: `"sqlite"`, `"turso"`, `"libsql"`
    /// - PostgreSQL: `"postgresql"`, `"postgres"`, `"pg"`
    /// - MySQL: `"mysql"`, `"mariadb"`
    ///
    /// ```
    /// use rowgate_types::Dialect;
    ///
    /// assert_eq!(Dialect::parse("sqlite"), Some(Dialect::SQLite));
    /// assert_eq!(Dialect::parse("pg"), Some(Dialect::PostgreSQL));
    /// assert_eq!(Dialect::parse("unknown"), None);
    /// ```
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        if s.eq_ignore_ascii_case("sqlite")
            || s.eq_ignore_ascii_case("turso")
            || s.eq_ignore_ascii_case("libsql")
        {
            Some(Dialect::SQLite)
        } else if s.eq_ignore_ascii_case("postgresql")
            || s.eq_ignore_ascii_case("postgres")
            || s.eq_ignore_ascii_case("pg")
        {
            Some(Dialect::PostgreSQL)
        } else if s.eq_ignore_ascii_case("mysql") || s.eq_ignore_ascii_case("mariadb") {
            Some(Dialect::MySQL)
        } else {
            None
        }
    }

    /// Get the dialect name as a lowercase string
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Dialect::SQLite => "sqlite",
            Dialect::PostgreSQL => "postgresql",
            Dialect::MySQL => "mysql",
        }
    }

    /// Character used to quote identifiers.
    #[inline]
    #[must_use]
    pub const fn quote_char(&self) -> char {
        match self {
            Dialect::MySQL => '`',
            Dialect::SQLite | Dialect::PostgreSQL => '"',
        }
    }

    /// Writes `name` as a quoted identifier, doubling any embedded quote characters.
    pub fn write_ident(&self, name: &str, buf: &mut impl Write) {
        let quote = self.quote_char();
        let _ = buf.write_char(quote);
        for ch in name.chars() {
            if ch == quote {
                let _ = buf.write_char(quote);
            }
            let _ = buf.write_char(ch);
        }
        let _ = buf.write_char(quote);
    }

    /// Writes the placeholder for the 1-based parameter `index`.
    pub fn write_placeholder(&self, index: usize, buf: &mut impl Write) {
        match self {
            Dialect::PostgreSQL => {
                let _ = write!(buf, "${index}");
            }
            Dialect::SQLite | Dialect::MySQL => {
                let _ = buf.write_char('?');
            }
        }
    }

    /// `true` when NULL sorts before every other value in ascending order.
    #[inline]
    #[must_use]
    pub const fn nulls_sort_first(&self) -> bool {
        !matches!(self, Dialect::PostgreSQL)
    }

    /// The LIMIT operand that means "no limit", for engines that cannot
    /// express an OFFSET on its own. `None` when OFFSET may stand alone.
    #[must_use]
    pub const fn unbounded_limit(&self) -> Option<&'static str> {
        match self {
            Dialect::SQLite => Some("-1"),
            Dialect::MySQL => Some("18446744073709551615"),
            Dialect::PostgreSQL => None,
        }
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Dialect {
    type Err = DialectParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Dialect::parse(s).ok_or(DialectParseError)
    }
}

/// Error returned when parsing an unknown dialect string
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DialectParseError;

impl std::fmt::Display for DialectParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("unknown dialect")
    }
}

impl std::error::Error for DialectParseError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dialect_parse() {
        assert_eq!(Dialect::parse("sqlite"), Some(Dialect::SQLite));
        assert_eq!(Dialect::parse("SQLite"), Some(Dialect::SQLite));
        assert_eq!(Dialect::parse("libsql"), Some(Dialect::SQLite));

        assert_eq!(Dialect::parse("postgres"), Some(Dialect::PostgreSQL));
        assert_eq!(Dialect::parse("PG"), Some(Dialect::PostgreSQL));

        assert_eq!(Dialect::parse("MySQL"), Some(Dialect::MySQL));
        assert_eq!(Dialect::parse("mariadb"), Some(Dialect::MySQL));

        assert_eq!(Dialect::parse("unknown"), None);
        assert_eq!(Dialect::parse(""), None);
    }

    #[test]
    fn test_placeholders() {
        let mut buf = String::new();
        Dialect::PostgreSQL.write_placeholder(3, &mut buf);
        Dialect::SQLite.write_placeholder(3, &mut buf);
        Dialect::MySQL.write_placeholder(3, &mut buf);
        assert_eq!(buf, "$3??");
    }

    #[test]
    fn test_ident_quoting() {
        let mut buf = String::new();
        Dialect::SQLite.write_ident("we\"ird", &mut buf);
        assert_eq!(buf, "\"we\"\"ird\"");

        let mut buf = String::new();
        Dialect::MySQL.write_ident("posts", &mut buf);
        assert_eq!(buf, "`posts`");
    }

    #[test]
    fn test_dialect_display() {
        assert_eq!(format!("{}", Dialect::SQLite), "sqlite");
        assert_eq!(format!("{}", Dialect::PostgreSQL), "postgresql");
        assert_eq!("mysql".parse::<Dialect>(), Ok(Dialect::MySQL));
    }
}
