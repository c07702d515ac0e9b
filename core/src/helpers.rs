//! Statement skeletons shared by the loaders and the row facade.

use crate::row::Row;
use crate::sql::{SQL, SQLChunk, Token};

/// `SELECT * FROM "table"`
pub fn select_all(table: &str) -> SQL {
    SQL::token(Token::SELECT)
        .push(Token::STAR)
        .push(Token::FROM)
        .append(SQL::ident(table))
}

/// `WHERE <condition>`
pub fn where_clause(condition: SQL) -> SQL {
    SQL::token(Token::WHERE).append(condition)
}

/// `SELECT * FROM "table" WHERE <condition> [ORDER BY ...] [LIMIT ...]`
pub fn select(table: &str, condition: SQL, order_by: SQL, limit: SQL) -> SQL {
    select_all(table)
        .append(where_clause(condition))
        .append(order_by)
        .append(limit)
}

/// `UPDATE "table" SET "a" = ?, ... WHERE <condition>`
pub fn update(table: &str, values: &Row, condition: SQL) -> SQL {
    SQL::token(Token::UPDATE)
        .append(SQL::ident(table))
        .push(Token::SET)
        .append(SQL::assignments(values.iter()))
        .append(where_clause(condition))
}

/// `INSERT INTO "table" ("a", "b") VALUES (?, ?), (?, ?)`
///
/// Every row must carry `columns`; values are taken in `columns` order.
pub fn insert(table: &str, columns: &[&str], rows: &[Row]) -> SQL {
    let column_list = SQL::join(columns.iter().map(|column| SQL::ident(*column)), Token::COMMA);

    let tuples = rows.iter().map(|row| {
        SQL::param_list(
            columns
                .iter()
                .map(|column| row.get(column).cloned().unwrap_or_default()),
        )
        .parens()
    });

    SQL::from_iter([SQLChunk::token(Token::INSERT), SQLChunk::token(Token::INTO)])
        .append(SQL::ident(table))
        .append(column_list.parens())
        .push(Token::VALUES)
        .append(SQL::join(tuples, Token::COMMA))
}
