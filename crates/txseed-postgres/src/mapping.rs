//! Column type mapping and bind values for the PostgreSQL sink.

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde_json::Value as JsonValue;
use sqlx::Postgres;
use sqlx::query_builder::Separated;
use sqlx::types::Json;
use txseed_core::{DataType, Value};

use crate::errors::{PostgresError, Result};

/// DDL type for a column.
pub fn column_type(data_type: &DataType) -> String {
    match data_type {
        DataType::Long => "BIGINT".to_string(),
        DataType::Double => "DOUBLE PRECISION".to_string(),
        DataType::Boolean => "BOOLEAN".to_string(),
        DataType::String => "TEXT".to_string(),
        DataType::Timestamp => "TIMESTAMP".to_string(),
        DataType::Date => "DATE".to_string(),
        DataType::Decimal { precision, scale } => format!("NUMERIC({precision},{scale})"),
        DataType::Array(element) if element.is_scalar() => format!("{}[]", column_type(element)),
        DataType::Array(_) | DataType::Struct(_) => "JSONB".to_string(),
    }
}

/// `information_schema.columns.udt_name` of the type [`column_type`] creates.
pub fn udt_name(data_type: &DataType) -> String {
    match data_type {
        DataType::Long => "int8".to_string(),
        DataType::Double => "float8".to_string(),
        DataType::Boolean => "bool".to_string(),
        DataType::String => "text".to_string(),
        DataType::Timestamp => "timestamp".to_string(),
        DataType::Date => "date".to_string(),
        DataType::Decimal { .. } => "numeric".to_string(),
        DataType::Array(element) if element.is_scalar() => format!("_{}", udt_name(element)),
        DataType::Array(_) | DataType::Struct(_) => "jsonb".to_string(),
    }
}

/// Owned, typed bind value for one cell.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlCell {
    Long(Option<i64>),
    Double(Option<f64>),
    Bool(Option<bool>),
    Text(Option<String>),
    Timestamp(Option<NaiveDateTime>),
    Date(Option<NaiveDate>),
    Decimal(Option<Decimal>),
    Json(Option<JsonValue>),
    LongArray(Option<Vec<Option<i64>>>),
    DoubleArray(Option<Vec<Option<f64>>>),
    BoolArray(Option<Vec<Option<bool>>>),
    TextArray(Option<Vec<Option<String>>>),
    TimestampArray(Option<Vec<Option<NaiveDateTime>>>),
    DateArray(Option<Vec<Option<NaiveDate>>>),
    DecimalArray(Option<Vec<Option<Decimal>>>),
}

impl SqlCell {
    /// Convert a frame value of `data_type` into its bind value.
    pub fn from_value(column: &str, value: &Value, data_type: &DataType) -> Result<Self> {
        let mismatch = || PostgresError::Value {
            column: column.to_string(),
            message: format!("{} value cannot be written as {data_type}", value.kind()),
        };
        let cell = match data_type {
            DataType::Long => SqlCell::Long(scalar(value, Value::as_i64).ok_or_else(mismatch)?),
            DataType::Double => {
                SqlCell::Double(scalar(value, Value::as_f64).ok_or_else(mismatch)?)
            }
            DataType::Boolean => {
                SqlCell::Bool(scalar(value, Value::as_bool).ok_or_else(mismatch)?)
            }
            DataType::String => SqlCell::Text(
                scalar(value, |v| v.as_str().map(str::to_string)).ok_or_else(mismatch)?,
            ),
            DataType::Timestamp => {
                SqlCell::Timestamp(scalar(value, Value::as_timestamp).ok_or_else(mismatch)?)
            }
            DataType::Date => SqlCell::Date(scalar(value, as_date).ok_or_else(mismatch)?),
            DataType::Decimal { .. } => {
                SqlCell::Decimal(scalar(value, Value::as_decimal).ok_or_else(mismatch)?)
            }
            DataType::Array(element) if element.is_scalar() => {
                array_cell(value, element).ok_or_else(mismatch)?
            }
            DataType::Array(_) | DataType::Struct(_) => {
                SqlCell::Json((!value.is_null()).then(|| value.to_json()))
            }
        };
        Ok(cell)
    }

    pub(crate) fn bind<Sep>(self, row: &mut Separated<'_, '_, Postgres, Sep>)
    where
        Sep: std::fmt::Display,
    {
        match self {
            SqlCell::Long(v) => row.push_bind(v),
            SqlCell::Double(v) => row.push_bind(v),
            SqlCell::Bool(v) => row.push_bind(v),
            SqlCell::Text(v) => row.push_bind(v),
            SqlCell::Timestamp(v) => row.push_bind(v),
            SqlCell::Date(v) => row.push_bind(v),
            SqlCell::Decimal(v) => row.push_bind(v),
            SqlCell::Json(v) => row.push_bind(v.map(Json)),
            SqlCell::LongArray(v) => row.push_bind(v),
            SqlCell::DoubleArray(v) => row.push_bind(v),
            SqlCell::BoolArray(v) => row.push_bind(v),
            SqlCell::TextArray(v) => row.push_bind(v),
            SqlCell::TimestampArray(v) => row.push_bind(v),
            SqlCell::DateArray(v) => row.push_bind(v),
            SqlCell::DecimalArray(v) => row.push_bind(v),
        };
    }
}

/// `Some(None)` for NULL, `Some(Some(_))` for a matching value, `None` on
/// mismatch.
fn scalar<T>(value: &Value, get: impl Fn(&Value) -> Option<T>) -> Option<Option<T>> {
    if value.is_null() {
        return Some(None);
    }
    get(value).map(Some)
}

fn as_date(value: &Value) -> Option<NaiveDate> {
    match value {
        Value::Date(date) => Some(*date),
        _ => None,
    }
}

fn elements<T>(items: &[Value], get: impl Fn(&Value) -> Option<T>) -> Option<Vec<Option<T>>> {
    items.iter().map(|item| scalar(item, &get)).collect()
}

fn array_of<T>(
    items: Option<&[Value]>,
    get: impl Fn(&Value) -> Option<T>,
) -> Option<Option<Vec<Option<T>>>> {
    match items {
        None => Some(None),
        Some(items) => elements(items, get).map(Some),
    }
}

fn array_cell(value: &Value, element: &DataType) -> Option<SqlCell> {
    let items = match value {
        Value::Null => None,
        Value::Array(items) => Some(items.as_slice()),
        _ => return None,
    };
    let cell = match element {
        DataType::Long => SqlCell::LongArray(array_of(items, Value::as_i64)?),
        DataType::Double => SqlCell::DoubleArray(array_of(items, Value::as_f64)?),
        DataType::Boolean => SqlCell::BoolArray(array_of(items, Value::as_bool)?),
        DataType::String => {
            SqlCell::TextArray(array_of(items, |item| item.as_str().map(str::to_string))?)
        }
        DataType::Timestamp => SqlCell::TimestampArray(array_of(items, Value::as_timestamp)?),
        DataType::Date => SqlCell::DateArray(array_of(items, as_date)?),
        DataType::Decimal { .. } => SqlCell::DecimalArray(array_of(items, Value::as_decimal)?),
        DataType::Array(_) | DataType::Struct(_) => return None,
    };
    Some(cell)
}
