//! Where-object input.
//!
//! Accepts filters written as JSON objects:
//!
//! ```json
//! {
//!   "message": { "contains": "est" },
//!   "rating": 5,
//!   "OR": [{ "author_id": 1 }, { "author_id": { "in": [2, 3] } }],
//!   "author": { "existsWhere": { "first_name": { "startsWith": "J" } } }
//! }
//! ```
//!
//! Several keys in one object are conjoined. A bare scalar is shorthand for
//! `equals`; `not: null` means `IS NOT NULL`.

use rowgate_types::{ColumnDef, SchemaDef, SemanticType, TableDef};
use serde_json::Value as Json;

use super::{Condition, Filter, Quantifier, RelationFilter, col};
use crate::error::{Result, RowgateError};
use crate::value::{Value, parse_date};

impl Filter {
    /// Parses a where-object against `table`.
    pub fn from_json(schema: &SchemaDef, table: &str, input: &Json) -> Result<Filter> {
        let table = schema
            .table(table)
            .ok_or_else(|| RowgateError::UnknownTable(table.into()))?;
        parse_object(schema, table, input)
    }
}

fn parse_object(schema: &SchemaDef, table: &TableDef, input: &Json) -> Result<Filter> {
    let Json::Object(object) = input else {
        return Err(RowgateError::Conversion(format!(
            "where clause for {} must be an object, found {}",
            table.name,
            json_type(input)
        )));
    };

    let mut parts = object
        .iter()
        .map(|(key, value)| parse_entry(schema, table, key, value))
        .collect::<Result<Vec<_>>>()?;

    Ok(if parts.len() == 1 {
        parts.remove(0)
    } else {
        Filter::and(parts)
    })
}

fn parse_entry(schema: &SchemaDef, table: &TableDef, key: &str, value: &Json) -> Result<Filter> {
    match key {
        "AND" => Ok(Filter::and(parse_children(schema, table, value)?)),
        "OR" => Ok(Filter::or(parse_children(schema, table, value)?)),
        "NOT" => Ok(Filter::not(parse_children(schema, table, value)?)),
        _ => {
            if let Some(column) = table.column(key) {
                parse_column(table, column, value)
            } else if table.relation(key).is_some() {
                parse_relation(schema, table, key, value)
            } else {
                Err(RowgateError::unknown_field(&table.name, key))
            }
        }
    }
}

fn parse_children(schema: &SchemaDef, table: &TableDef, value: &Json) -> Result<Vec<Filter>> {
    match value {
        Json::Array(items) => items
            .iter()
            .map(|item| parse_object(schema, table, item))
            .collect(),
        other => Ok(vec![parse_object(schema, table, other)?]),
    }
}

fn parse_column(table: &TableDef, column: &ColumnDef, value: &Json) -> Result<Filter> {
    let Json::Object(operators) = value else {
        return Ok(col(column.name.as_str())
            .equals(operand(table, column, value)?)
            .into());
    };

    let mut filter = col(column.name.as_str());
    for (operator, operand_json) in operators {
        filter = filter.condition(parse_condition(table, column, operator, operand_json)?);
    }
    Ok(filter.into())
}

fn parse_condition(
    table: &TableDef,
    column: &ColumnDef,
    operator: &str,
    value: &Json,
) -> Result<Condition> {
    let condition = match operator {
        "equals" => Condition::Equals(operand(table, column, value)?),
        "not" => Condition::NotEquals(operand(table, column, value)?),
        "in" => Condition::In(operand_list(table, column, value)?),
        "notIn" => Condition::NotIn(operand_list(table, column, value)?),
        "lt" => Condition::Lt(operand(table, column, value)?),
        "lte" => Condition::Lte(operand(table, column, value)?),
        "gt" => Condition::Gt(operand(table, column, value)?),
        "gte" => Condition::Gte(operand(table, column, value)?),
        "contains" => Condition::Contains(pattern(table, column, value)?),
        "startsWith" => Condition::StartsWith(pattern(table, column, value)?),
        "endsWith" => Condition::EndsWith(pattern(table, column, value)?),
        other => {
            return Err(RowgateError::Conversion(format!(
                "unknown operator {other} on {}.{}",
                table.name, column.name
            )));
        }
    };
    Ok(condition)
}

fn parse_relation(
    schema: &SchemaDef,
    table: &TableDef,
    name: &str,
    value: &Json,
) -> Result<Filter> {
    let Json::Object(quantifiers) = value else {
        return Err(RowgateError::Conversion(format!(
            "relation filter {}.{name} must be an object",
            table.name
        )));
    };
    let target = table
        .relation(name)
        .map(|relation| relation.target.as_str())
        .and_then(|target| schema.table(target))
        .ok_or_else(|| RowgateError::UnknownTable(name.into()))?;

    let mut parts = quantifiers
        .iter()
        .map(|(key, nested)| {
            let quantifier = match key.as_str() {
                "whereEvery" => Quantifier::Every,
                "existsWhere" => Quantifier::Exists,
                "notExistsWhere" => Quantifier::NotExists,
                other => {
                    return Err(RowgateError::Conversion(format!(
                        "unknown relation filter {other} on {}.{name}",
                        table.name
                    )));
                }
            };
            Ok(Filter::Relation(RelationFilter {
                relation: name.into(),
                quantifier,
                filter: Box::new(parse_object(schema, target, nested)?),
            }))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(if parts.len() == 1 {
        parts.remove(0)
    } else {
        Filter::and(parts)
    })
}

/// Converts a JSON scalar into a value, resolving ISO strings for date columns.
fn operand(table: &TableDef, column: &ColumnDef, value: &Json) -> Result<Value> {
    let converted = match value {
        Json::Null => Value::Null,
        Json::Bool(flag) => Value::Boolean(*flag),
        Json::Number(number) => match (number.as_i64(), number.as_f64()) {
            (Some(integer), _) => Value::Integer(integer),
            (None, Some(real)) => Value::Real(real),
            (None, None) => {
                return Err(RowgateError::Conversion(format!(
                    "number {number} out of range for {}.{}",
                    table.name, column.name
                )));
            }
        },
        Json::String(text) if column.semantic == SemanticType::Date => match parse_date(text) {
            Some(date) => Value::Date(date),
            None => Value::Text(text.clone()),
        },
        Json::String(text) => Value::Text(text.clone()),
        Json::Array(_) | Json::Object(_) => {
            return Err(RowgateError::type_mismatch(
                &table.name,
                &column.name,
                column.semantic,
                json_type(value),
            ));
        }
    };
    Ok(converted)
}

fn operand_list(table: &TableDef, column: &ColumnDef, value: &Json) -> Result<Vec<Value>> {
    let Json::Array(items) = value else {
        return Err(RowgateError::type_mismatch(
            &table.name,
            &column.name,
            column.semantic,
            json_type(value),
        ));
    };
    items
        .iter()
        .map(|item| operand(table, column, item))
        .collect()
}

fn pattern(table: &TableDef, column: &ColumnDef, value: &Json) -> Result<String> {
    match value {
        Json::String(text) => Ok(text.clone()),
        other => Err(RowgateError::type_mismatch(
            &table.name,
            &column.name,
            SemanticType::String,
            json_type(other),
        )),
    }
}

const fn json_type(value: &Json) -> &'static str {
    match value {
        Json::Null => "null",
        Json::Bool(_) => "boolean",
        Json::Number(_) => "number",
        Json::String(_) => "string",
        Json::Array(_) => "array",
        Json::Object(_) => "object",
    }
}
