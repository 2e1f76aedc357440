//! Type conversion between Tasty values and PostgreSQL wire types.
//!
//! Handles both directions:
//! - `Value` → bound statement parameters
//! - `PgRow` columns → JSON row values
//!
//! Parameters travel in binary format, so a string bound for a `date` or
//! `integer` parameter cannot be left for the server to parse. Statements
//! with string parameters are prepared first, with strings declared
//! `unknown`, and every `$n` whose inferred type is not textual is rewritten
//! to `($n::text)::<type>`. Executed statements are unnamed so each one is
//! parsed with the types actually bound.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value as JsonValue;
use sqlx::encode::IsNull;
use sqlx::error::BoxDynError;
use sqlx::postgres::types::Oid;
use sqlx::postgres::{PgArgumentBuffer, PgArguments, PgRow, PgTypeInfo};
use sqlx::{Column, Encode, Postgres, Row as _, Type, TypeInfo};

use crate::model::{Row, Value, DATE_FORMAT};

pub(super) type PgQuery<'q> = sqlx::query::Query<'q, Postgres, PgArguments>;

/// OID of the `unknown` pseudo-type.
const UNKNOWN_OID: u32 = 705;

/// Types whose binary input is the raw UTF-8 text.
const TEXTUAL_TYPES: [&str; 6] = ["TEXT", "VARCHAR", "BPCHAR", "NAME", "UNKNOWN", "CITEXT"];

/// SQL NULL sent as `unknown`, so it fits a column of any type.
#[derive(Debug, Clone, Copy)]
struct UntypedNull;

impl Type<Postgres> for UntypedNull {
    fn type_info() -> PgTypeInfo {
        PgTypeInfo::with_oid(Oid(UNKNOWN_OID))
    }
}

impl Encode<'_, Postgres> for UntypedNull {
    fn encode_by_ref(&self, _buf: &mut PgArgumentBuffer) -> Result<IsNull, BoxDynError> {
        Ok(IsNull::Yes)
    }
}

/// Bind parameters in placeholder order (`$1`, `$2`, ...).
///
/// SQL NULL is sent untyped; integers as `int8`, strings as `text`.
pub(super) fn bind_values<'q>(mut query: PgQuery<'q>, values: &'q [Value]) -> PgQuery<'q> {
    for value in values {
        query = match value {
            Value::Null => query.bind(UntypedNull),
            Value::Bool(b) => query.bind(*b),
            Value::Int(i) => query.bind(*i),
            Value::Float(f) => query.bind(*f),
            Value::Str(s) => query.bind(s.as_str()),
            Value::Date(d) => query.bind(*d),
        };
    }
    query
}

/// Types declared when asking the server to infer parameter types.
pub(super) fn inference_types(values: &[Value]) -> Vec<PgTypeInfo> {
    values
        .iter()
        .map(|value| match value {
            Value::Null | Value::Str(_) => UntypedNull::type_info(),
            Value::Bool(_) => <bool as Type<Postgres>>::type_info(),
            Value::Int(_) => <i64 as Type<Postgres>>::type_info(),
            Value::Float(_) => <f64 as Type<Postgres>>::type_info(),
            Value::Date(_) => <NaiveDateTime as Type<Postgres>>::type_info(),
        })
        .collect()
}

/// Statement text used only for type inference.
///
/// Prepared statements are cached by text, so the comment carries the
/// declared signature and keeps these apart from executed statements.
pub(super) fn inference_sql(sql: &str, values: &[Value]) -> String {
    let signature: Vec<&str> = values
        .iter()
        .map(|value| match value {
            Value::Null | Value::Str(_) => "unknown",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int8",
            Value::Float(_) => "float8",
            Value::Date(_) => "timestamp",
        })
        .collect();
    format!("/* params: {} */ {}", signature.join(","), sql)
}

fn is_textual(type_name: &str) -> bool {
    TEXTUAL_TYPES
        .iter()
        .any(|textual| textual.eq_ignore_ascii_case(type_name))
}

/// Placeholder numbers bound to strings whose inferred type is not textual,
/// mapped to that type's name.
pub(super) fn text_casts(types: &[PgTypeInfo], values: &[Value]) -> HashMap<usize, String> {
    types
        .iter()
        .zip(values)
        .enumerate()
        .filter_map(|(i, (type_info, value))| match value {
            Value::Str(_) if !is_textual(type_info.name()) => Some((i + 1, type_info.name().to_string())),
            _ => None,
        })
        .collect()
}

/// Rewrite `$n` to `($n::text)::<type>` for every placeholder in `casts`.
///
/// Quoted identifiers and string literals are copied untouched.
pub(super) fn cast_text_params(sql: &str, casts: &HashMap<usize, String>) -> String {
    let mut out = String::with_capacity(sql.len() + casts.len() * 16);
    let mut quote: Option<char> = None;
    let mut chars = sql.char_indices().peekable();

    while let Some((start, c)) = chars.next() {
        match (quote, c) {
            (Some(q), c) if c == q => {
                quote = None;
                out.push(c);
            }
            (Some(_), c) => out.push(c),
            (None, '\'' | '"') => {
                quote = Some(c);
                out.push(c);
            }
            (None, '$') => {
                let mut end = start + 1;
                while let Some((i, d)) = chars.peek().copied() {
                    if !d.is_ascii_digit() {
                        break;
                    }
                    end = i + d.len_utf8();
                    chars.next();
                }
                let placeholder = &sql[start..end];
                match placeholder[1..].parse::<usize>().ok().and_then(|n| casts.get(&n)) {
                    Some(type_name) => out.push_str(&format!("({}::text)::{}", placeholder, type_name)),
                    None => out.push_str(placeholder),
                }
            }
            (None, c) => out.push(c),
        }
    }
    out
}

fn number(value: f64) -> JsonValue {
    serde_json::Number::from_f64(value)
        .map(JsonValue::Number)
        .unwrap_or(JsonValue::Null)
}

/// Convert a PostgreSQL row into a JSON row.
///
/// PostgreSQL checks declared column types strictly, so each column matches
/// exactly one branch; NULLs fall through to `JsonValue::Null`.
pub(super) fn convert_row(row: &PgRow) -> Row {
    let mut out = Row::new();

    for column in row.columns() {
        let name = column.name();

        let value = if let Ok(Some(value)) = row.try_get::<Option<String>, _>(name) {
            JsonValue::String(value)
        } else if let Ok(Some(value)) = row.try_get::<Option<i64>, _>(name) {
            JsonValue::from(value)
        } else if let Ok(Some(value)) = row.try_get::<Option<i32>, _>(name) {
            JsonValue::from(value)
        } else if let Ok(Some(value)) = row.try_get::<Option<i16>, _>(name) {
            JsonValue::from(value)
        } else if let Ok(Some(value)) = row.try_get::<Option<f64>, _>(name) {
            number(value)
        } else if let Ok(Some(value)) = row.try_get::<Option<f32>, _>(name) {
            number(f64::from(value))
        } else if let Ok(Some(value)) = row.try_get::<Option<bool>, _>(name) {
            JsonValue::Bool(value)
        } else if let Ok(Some(value)) = row.try_get::<Option<NaiveDateTime>, _>(name) {
            JsonValue::String(value.format(DATE_FORMAT).to_string())
        } else if let Ok(Some(value)) = row.try_get::<Option<DateTime<Utc>>, _>(name) {
            JsonValue::String(value.to_rfc3339())
        } else if let Ok(Some(value)) = row.try_get::<Option<NaiveDate>, _>(name) {
            JsonValue::String(value.to_string())
        } else if let Ok(Some(value)) = row.try_get::<Option<JsonValue>, _>(name) {
            value
        } else {
            JsonValue::Null
        };
        out.insert(name.to_string(), value);
    }

    out
}
