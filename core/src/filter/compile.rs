use compact_str::{CompactString, format_compact};
use rowgate_types::{ColumnDef, SchemaDef, SemanticType, TableDef};

use super::{BoolOp, ColumnFilter, Condition, Filter, Quantifier, RelationFilter};
use crate::error::{Result, RowgateError};
use crate::sql::{SQL, Token};
use crate::value::Value;

/// Escape character for LIKE patterns. `!` needs no escaping in any dialect's
/// string literal syntax, unlike backslash.
const LIKE_ESCAPE: char = '!';

/// Compiles [`Filter`] trees into parameterized WHERE fragments.
///
/// Columns of the filtered table are qualified with the table name; relation
/// sub-filters alias the related table as `r1`, `r2`, ... by nesting depth so a
/// self-referencing relation stays unambiguous.
///
/// ```
/// use rowgate_core::filter::{FilterCompiler, col};
/// use rowgate_core::rowgate_types::{ColumnDef, Dialect, SchemaDef, SemanticType, TableDef};
///
/// let schema = SchemaDef::new().with_table(
///     TableDef::new("posts").with_column(ColumnDef::new("message", SemanticType::String)),
/// );
/// let sql = FilterCompiler::new(&schema)
///     .compile("posts", &col("message").contains("est").into())
///     .unwrap();
/// let (text, params) = sql.build(Dialect::SQLite);
/// assert_eq!(text, r#""posts"."message" LIKE ? ESCAPE '!'"#);
/// assert_eq!(params[0].as_str(), Some("%est%"));
/// ```
#[derive(Debug, Clone, Copy)]
pub struct FilterCompiler<'s> {
    schema: &'s SchemaDef,
}

impl<'s> FilterCompiler<'s> {
    pub const fn new(schema: &'s SchemaDef) -> Self {
        Self { schema }
    }

    pub const fn schema(&self) -> &'s SchemaDef {
        self.schema
    }

    /// Looks up `name` in the schema.
    pub fn table(&self, name: &str) -> Result<&'s TableDef> {
        self.schema
            .table(name)
            .ok_or_else(|| RowgateError::UnknownTable(name.into()))
    }

    /// Compiles `filter` against `table`. An unconstrained filter compiles to
    /// an always-true predicate.
    pub fn compile(&self, table: &str, filter: &Filter) -> Result<SQL> {
        let table_def = self.table(table)?;
        self.compile_node(table_def, table, 0, filter)
    }

    fn compile_node(
        &self,
        table: &TableDef,
        qualifier: &str,
        depth: usize,
        filter: &Filter,
    ) -> Result<SQL> {
        match filter {
            Filter::Column(column) => compile_column(table, qualifier, column),
            Filter::Combinator(combinator) => {
                let children = combinator
                    .children
                    .iter()
                    .map(|child| {
                        self.compile_node(table, qualifier, depth, child)
                            .map(SQL::parens)
                    })
                    .collect::<Result<Vec<_>>>()?;

                // Without leaf predicates any combinator matches every row
                if filter.is_unconstrained() {
                    return Ok(SQL::always_true());
                }

                Ok(match combinator.op {
                    BoolOp::And => conjunction(children),
                    BoolOp::Or => SQL::join(children, Token::OR),
                    BoolOp::Not => SQL::token(Token::NOT).append(conjunction(children).parens()),
                })
            }
            Filter::Relation(relation) => self.compile_relation(table, qualifier, depth, relation),
        }
    }

    fn compile_relation(
        &self,
        table: &TableDef,
        qualifier: &str,
        depth: usize,
        relation: &RelationFilter,
    ) -> Result<SQL> {
        let def = table
            .relation(&relation.relation)
            .ok_or_else(|| RowgateError::unknown_field(&table.name, &relation.relation))?;
        let target = self.table(&def.target)?;
        let alias = format_compact!("r{}", depth + 1);

        let mut correlation = Vec::with_capacity(def.joins.len());
        for join in &def.joins {
            if table.column(&join.local).is_none() {
                return Err(RowgateError::unknown_field(&table.name, &join.local));
            }
            if target.column(&join.foreign).is_none() {
                return Err(RowgateError::unknown_field(&target.name, &join.foreign));
            }
            correlation.push(
                SQL::column(Some(&alias), join.foreign.as_str())
                    .push(Token::EQ)
                    .append(SQL::column(Some(qualifier), join.local.as_str())),
            );
        }

        let nested = self
            .compile_node(target, &alias, depth + 1, &relation.filter)?
            .parens();
        let nested = match relation.quantifier {
            Quantifier::Every => SQL::token(Token::NOT).append(nested),
            Quantifier::Exists | Quantifier::NotExists => nested,
        };
        correlation.push(nested);

        let subquery = SQL::token(Token::SELECT)
            .append(SQL::raw("1"))
            .push(Token::FROM)
            .append(SQL::ident(target.name.as_str()).alias(alias))
            .push(Token::WHERE)
            .append(SQL::join(correlation, Token::AND))
            .parens();
        let exists = SQL::token(Token::EXISTS).append(subquery);

        Ok(match relation.quantifier {
            Quantifier::Exists => exists,
            Quantifier::Every | Quantifier::NotExists => SQL::token(Token::NOT).append(exists),
        })
    }
}

fn conjunction(children: Vec<SQL>) -> SQL {
    if children.is_empty() {
        SQL::always_true()
    } else {
        SQL::join(children, Token::AND)
    }
}

fn compile_column(table: &TableDef, qualifier: &str, filter: &ColumnFilter) -> Result<SQL> {
    let column = table
        .column(&filter.column)
        .ok_or_else(|| RowgateError::unknown_field(&table.name, &filter.column))?;

    let comparisons = filter
        .conditions
        .iter()
        .map(|condition| compile_condition(table, qualifier, column, condition))
        .collect::<Result<Vec<_>>>()?;

    Ok(conjunction(comparisons))
}

fn compile_condition(
    table: &TableDef,
    qualifier: &str,
    column: &ColumnDef,
    condition: &Condition,
) -> Result<SQL> {
    let target = SQL::column(Some(qualifier), column.name.as_str());

    let sql = match condition {
        Condition::Equals(Value::Null) => {
            check_nullable(table, column)?;
            target.push(Token::IS).push(Token::NULL)
        }
        Condition::NotEquals(Value::Null) => {
            check_nullable(table, column)?;
            target.push(Token::IS).push(Token::NOT).push(Token::NULL)
        }
        Condition::IsNull => target.push(Token::IS).push(Token::NULL),
        Condition::IsNotNull => target.push(Token::IS).push(Token::NOT).push(Token::NULL),
        Condition::Equals(value) => compare(table, column, target, Token::EQ, value)?,
        Condition::NotEquals(value) => compare(table, column, target, Token::NE, value)?,
        Condition::Gt(value) => compare(table, column, target, Token::GT, value)?,
        Condition::Gte(value) => compare(table, column, target, Token::GE, value)?,
        Condition::Lt(value) => compare(table, column, target, Token::LT, value)?,
        Condition::Lte(value) => compare(table, column, target, Token::LE, value)?,
        Condition::In(values) => in_list(table, column, target, values, false)?,
        Condition::NotIn(values) => in_list(table, column, target, values, true)?,
        Condition::Contains(needle) => {
            like(table, column, target, format!("%{}%", escape_like(needle)))?
        }
        Condition::StartsWith(prefix) => {
            like(table, column, target, format!("{}%", escape_like(prefix)))?
        }
        Condition::EndsWith(suffix) => {
            like(table, column, target, format!("%{}", escape_like(suffix)))?
        }
    };
    Ok(sql)
}

fn compare(
    table: &TableDef,
    column: &ColumnDef,
    target: SQL,
    op: Token,
    value: &Value,
) -> Result<SQL> {
    check_operand(table, column, value)?;
    Ok(target.push(op).append(SQL::param(value.clone())))
}

fn in_list(
    table: &TableDef,
    column: &ColumnDef,
    target: SQL,
    values: &[Value],
    negated: bool,
) -> Result<SQL> {
    for value in values {
        check_operand(table, column, value)?;
    }

    // An empty list must never render as `IN ()`
    if values.is_empty() {
        return Ok(if negated {
            SQL::always_true()
        } else {
            SQL::always_false()
        });
    }

    let target = if negated {
        target.push(Token::NOT)
    } else {
        target
    };
    Ok(target
        .push(Token::IN)
        .append(SQL::param_list(values.iter().cloned()).parens()))
}

fn like(table: &TableDef, column: &ColumnDef, target: SQL, pattern: String) -> Result<SQL> {
    if column.semantic != SemanticType::String {
        return Err(RowgateError::type_mismatch(
            &table.name,
            &column.name,
            column.semantic,
            "string",
        ));
    }
    Ok(target
        .push(Token::LIKE)
        .append(SQL::param(pattern))
        .push(Token::ESCAPE)
        .append(SQL::raw("'!'")))
}

fn check_nullable(table: &TableDef, column: &ColumnDef) -> Result<()> {
    if column.nullable {
        Ok(())
    } else {
        Err(RowgateError::type_mismatch(
            &table.name,
            &column.name,
            column.semantic,
            "null",
        ))
    }
}

/// Operands must carry the column's semantic type. NULL is only meaningful
/// through `IS [NOT] NULL`, so it is rejected here.
pub(crate) fn check_operand(table: &TableDef, column: &ColumnDef, value: &Value) -> Result<()> {
    match value.semantic_type() {
        Some(semantic) if semantic == column.semantic => Ok(()),
        _ => Err(RowgateError::type_mismatch(
            &table.name,
            &column.name,
            column.semantic,
            value.type_name(),
        )),
    }
}

/// Escapes LIKE wildcards and the escape character itself.
pub(crate) fn escape_like(text: &str) -> CompactString {
    let mut escaped = CompactString::with_capacity(text.len());
    for ch in text.chars() {
        if matches!(ch, '%' | '_' | LIKE_ESCAPE) {
            escaped.push(LIKE_ESCAPE);
        }
        escaped.push(ch);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{col, rel};
    use rowgate_types::{Dialect, RelationDef};

    fn schema() -> SchemaDef {
        SchemaDef::new()
            .with_table(
                TableDef::new("users")
                    .with_column(ColumnDef::new("user_id", SemanticType::Number))
                    .with_column(ColumnDef::new("first_name", SemanticType::String))
                    .with_column(ColumnDef::new("token", SemanticType::String).nullable())
                    .with_column(ColumnDef::new("deleted", SemanticType::Boolean))
                    .with_relation(RelationDef::new("author_posts", "posts").on("user_id", "author_id")),
            )
            .with_table(
                TableDef::new("posts")
                    .with_column(ColumnDef::new("post_id", SemanticType::Number))
                    .with_column(ColumnDef::new("author_id", SemanticType::Number))
                    .with_column(ColumnDef::new("message", SemanticType::String))
                    .with_column(ColumnDef::new("rating", SemanticType::Number))
                    .with_relation(RelationDef::new("author", "users").on("author_id", "user_id")),
            )
    }

    fn render(table: &str, filter: impl Into<Filter>) -> (String, Vec<Value>) {
        let schema = schema();
        FilterCompiler::new(&schema)
            .compile(table, &filter.into())
            .unwrap()
            .build(Dialect::SQLite)
    }

    fn error(table: &str, filter: impl Into<Filter>) -> RowgateError {
        let schema = schema();
        FilterCompiler::new(&schema)
            .compile(table, &filter.into())
            .unwrap_err()
    }

    #[test]
    fn column_operators_are_conjoined() {
        let (sql, params) = render("posts", col("rating").gte(1).lt(5));
        assert_eq!(
            sql,
            r#""posts"."rating" >= ? AND "posts"."rating" < ?"#
        );
        assert_eq!(params, vec![Value::Integer(1), Value::Integer(5)]);
    }

    #[test]
    fn patterns_are_escaped() {
        let (sql, params) = render("posts", col("message").starts_with("50%_!"));
        assert_eq!(sql, r#""posts"."message" LIKE ? ESCAPE '!'"#);
        assert_eq!(params, vec![Value::Text("50!%!_!!%".into())]);

        let (_, params) = render("posts", col("message").ends_with("x"));
        assert_eq!(params, vec![Value::Text("%x".into())]);
    }

    #[test]
    fn empty_in_lists() {
        assert_eq!(render("posts", col("post_id").is_in(Vec::<i64>::new())).0, "1 = 0");
        assert_eq!(render("posts", col("post_id").not_in(Vec::<i64>::new())).0, "1 = 1");

        let (sql, params) = render("posts", col("post_id").not_in([1, 2]));
        assert_eq!(sql, r#""posts"."post_id" NOT IN (?, ?)"#);
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn combinators_parenthesize_children() {
        let filter = Filter::or([
            Filter::from(col("rating").gt(4)),
            Filter::and([
                Filter::from(col("message").equals("a")),
                Filter::from(col("post_id").lt(3)),
            ]),
        ]);
        let (sql, _) = render("posts", filter);
        assert_eq!(
            sql,
            r#"("posts"."rating" > ?) OR (("posts"."message" = ?) AND ("posts"."post_id" < ?))"#
        );
    }

    #[test]
    fn empty_combinators() {
        assert_eq!(render("posts", Filter::all()).0, "1 = 1");
        assert_eq!(render("posts", Filter::or(Vec::<Filter>::new())).0, "1 = 1");
        assert_eq!(render("posts", Filter::not(Vec::<Filter>::new())).0, "1 = 1");
        assert_eq!(
            render("posts", Filter::not([Filter::or(Vec::<Filter>::new())])).0,
            "1 = 1"
        );
        assert_eq!(
            render(
                "posts",
                Filter::or([Filter::and(Vec::<Filter>::new()), Filter::from(col("rating").gt(4))])
            )
            .0,
            r#"(1 = 1) OR ("posts"."rating" > ?)"#
        );
        assert!(matches!(
            error("posts", Filter::or([col("nope")])),
            RowgateError::UnknownField { .. }
        ));
        assert_eq!(
            render("posts", Filter::not([col("rating").gt(4)])).0,
            r#"NOT (("posts"."rating" > ?))"#
        );
    }

    #[test]
    fn null_operands() {
        assert_eq!(
            render("users", col("token").equals(Value::Null)).0,
            r#""users"."token" IS NULL"#
        );
        assert_eq!(
            render("users", col("token").not_equals(Value::Null)).0,
            r#""users"."token" IS NOT NULL"#
        );
        assert!(matches!(
            error("users", col("first_name").equals(Value::Null)),
            RowgateError::TypeMismatch { found: "null", .. }
        ));
    }

    #[test]
    fn relation_subqueries() {
        let (sql, params) = render("users", rel("author_posts").exists(col("rating").gt(4)));
        assert_eq!(
            sql,
            r#"EXISTS (SELECT 1 FROM "posts" AS "r1" WHERE "r1"."author_id" = "users"."user_id" AND ("r1"."rating" > ?))"#
        );
        assert_eq!(params, vec![Value::Integer(4)]);

        let (sql, _) = render("users", rel("author_posts").every(col("rating").gt(4)));
        assert_eq!(
            sql,
            r#"NOT EXISTS (SELECT 1 FROM "posts" AS "r1" WHERE "r1"."author_id" = "users"."user_id" AND NOT ("r1"."rating" > ?))"#
        );

        let (sql, _) = render("users", rel("author_posts").not_exists(Filter::all()));
        assert!(sql.starts_with("NOT EXISTS (SELECT 1 FROM \"posts\""));
        assert!(sql.ends_with("AND (1 = 1))"));
    }

    #[test]
    fn nested_relations_use_depth_aliases() {
        let filter = rel("author_posts").exists(rel("author").exists(col("first_name").equals("a")));
        let (sql, _) = render("users", filter);
        assert!(sql.contains(r#""posts" AS "r1""#));
        assert!(sql.contains(r#""users" AS "r2" WHERE "r2"."user_id" = "r1"."author_id""#));
        assert!(sql.contains(r#""r2"."first_name" = ?"#));
    }

    #[test]
    fn type_and_name_errors() {
        assert!(matches!(
            error("posts", col("rating").equals("high")),
            RowgateError::TypeMismatch { found: "string", .. }
        ));
        assert!(matches!(
            error("posts", col("rating").contains("4")),
            RowgateError::TypeMismatch { expected: SemanticType::Number, .. }
        ));
        assert!(matches!(
            error("posts", col("nope").equals(1)),
            RowgateError::UnknownField { .. }
        ));
        assert!(matches!(
            error("posts", rel("comments").exists(Filter::all())),
            RowgateError::UnknownField { .. }
        ));
        assert!(matches!(
            error("comments", Filter::all()),
            RowgateError::UnknownTable(_)
        ));
    }

    #[test]
    fn postgres_numbering_spans_subqueries() {
        let schema = schema();
        let filter = Filter::and([
            Filter::from(col("user_id").equals(1)),
            rel("author_posts").exists(col("rating").gt(4)),
        ]);
        let (sql, _) = FilterCompiler::new(&schema)
            .compile("users", &filter)
            .unwrap()
            .build(Dialect::PostgreSQL);
        assert!(sql.contains("$1"));
        assert!(sql.contains(r#""r1"."rating" > $2"#));
    }
}
