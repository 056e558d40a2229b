use std::cmp::Ordering;

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};
use serde_json::{Map, Number, Value as JsonValue};

use crate::types::DataType;
use crate::{DATE_FORMAT, TIMESTAMP_FORMAT};

/// Largest scale a decimal cell can carry.
pub const MAX_DECIMAL_SCALE: u32 = 28;

/// A single cell of a generated row.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Long(i64),
    Double(f64),
    Decimal(Decimal),
    String(String),
    Timestamp(NaiveDateTime),
    Date(NaiveDate),
    Array(Vec<Value>),
    /// Struct members in declaration order.
    Struct(Vec<(String, Value)>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Short name of the runtime kind, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Long(_) => "long",
            Value::Double(_) => "double",
            Value::Decimal(_) => "decimal",
            Value::String(_) => "string",
            Value::Timestamp(_) => "timestamp",
            Value::Date(_) => "date",
            Value::Array(_) => "array",
            Value::Struct(_) => "struct",
        }
    }

    pub fn is_number(&self) -> bool {
        matches!(self, Value::Long(_) | Value::Double(_) | Value::Decimal(_))
    }

    /// SQL-style ordering between two values.
    ///
    /// Numbers compare across kinds, timestamps compare with dates at
    /// midnight. Returns `None` when either side is null or the kinds are
    /// not comparable.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Null, _) | (_, Value::Null) => None,
            (Value::Long(a), Value::Long(b)) => Some(a.cmp(b)),
            (Value::Decimal(a), Value::Decimal(b)) => Some(a.cmp(b)),
            (Value::Decimal(a), Value::Long(b)) => Some(a.cmp(&Decimal::from(*b))),
            (Value::Long(a), Value::Decimal(b)) => Some(Decimal::from(*a).cmp(b)),
            (a, b) if a.is_number() && b.is_number() => a.as_f64()?.partial_cmp(&b.as_f64()?),
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            (Value::Timestamp(a), Value::Timestamp(b)) => Some(a.cmp(b)),
            (Value::Date(a), Value::Date(b)) => Some(a.cmp(b)),
            (Value::Timestamp(a), Value::Date(b)) => Some(a.cmp(&b.and_hms_opt(0, 0, 0)?)),
            (Value::Date(a), Value::Timestamp(b)) => Some(a.and_hms_opt(0, 0, 0)?.cmp(b)),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Long(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Long(value) => Some(*value as f64),
            Value::Double(value) => Some(*value),
            Value::Decimal(value) => value.to_f64(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(value) => Some(value.as_str()),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        match self {
            Value::Timestamp(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            Value::Decimal(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(values) => Some(values.as_slice()),
            _ => None,
        }
    }

    /// Look up a struct member by name.
    pub fn field(&self, name: &str) -> Option<&Value> {
        match self {
            Value::Struct(fields) => fields
                .iter()
                .find(|(field, _)| field == name)
                .map(|(_, value)| value),
            _ => None,
        }
    }

    /// Human-readable rendering used by previews and string casts.
    ///
    /// Arrays render as `[a, b]`, structs as `{a, b}`, nulls as `NULL`.
    pub fn to_text(&self) -> String {
        match self {
            Value::Null => "NULL".to_string(),
            Value::Bool(value) => value.to_string(),
            Value::Long(value) => value.to_string(),
            Value::Double(value) => format_double(*value),
            Value::Decimal(value) => value.to_string(),
            Value::String(value) => value.clone(),
            Value::Timestamp(value) => value.format(TIMESTAMP_FORMAT).to_string(),
            Value::Date(value) => value.format(DATE_FORMAT).to_string(),
            Value::Array(values) => {
                let parts: Vec<String> = values.iter().map(Value::to_text).collect();
                format!("[{}]", parts.join(", "))
            }
            Value::Struct(fields) => {
                let parts: Vec<String> = fields.iter().map(|(_, value)| value.to_text()).collect();
                format!("{{{}}}", parts.join(", "))
            }
        }
    }

    /// CSV cell rendering: scalars as text, composites as JSON, nulls empty.
    pub fn to_csv_field(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Array(_) | Value::Struct(_) => self.to_json().to_string(),
            other => other.to_text(),
        }
    }

    /// Convert a JSON literal into a value of `data_type`.
    ///
    /// Returns `None` when the literal cannot represent that type. JSON
    /// `null` converts to `Value::Null` for every type.
    pub fn from_json(json: &JsonValue, data_type: &DataType) -> Option<Value> {
        if json.is_null() {
            return Some(Value::Null);
        }
        match data_type {
            DataType::Long => json
                .as_i64()
                .or_else(|| json.as_f64().filter(|v| v.fract() == 0.0).map(|v| v as i64))
                .map(Value::Long),
            DataType::Double => json.as_f64().map(Value::Double),
            DataType::Decimal { precision, scale } => {
                let raw = match json {
                    JsonValue::Number(number) => match number.as_i64() {
                        Some(int) => Some(Decimal::from(int)),
                        None => number.as_f64().and_then(Decimal::from_f64),
                    },
                    _ => None,
                }?;
                fit_decimal(raw, *precision, *scale).map(Value::Decimal)
            }
            DataType::Boolean => json.as_bool().map(Value::Bool),
            DataType::String => json.as_str().map(|v| Value::String(v.to_string())),
            DataType::Timestamp => json.as_str().and_then(parse_timestamp).map(Value::Timestamp),
            DataType::Date => json.as_str().and_then(parse_date).map(Value::Date),
            DataType::Array(element) => {
                let items = json.as_array()?;
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    values.push(Value::from_json(item, element)?);
                }
                Some(Value::Array(values))
            }
            DataType::Struct(fields) => {
                let object = json.as_object()?;
                let mut values = Vec::with_capacity(fields.len());
                for field in fields {
                    let value = match object.get(&field.name) {
                        Some(raw) => Value::from_json(raw, &field.data_type)?,
                        None => Value::Null,
                    };
                    values.push((field.name.clone(), value));
                }
                Some(Value::Struct(values))
            }
        }
    }

    pub fn to_json(&self) -> JsonValue {
        match self {
            Value::Null => JsonValue::Null,
            Value::Bool(value) => JsonValue::Bool(*value),
            Value::Long(value) => JsonValue::Number((*value).into()),
            Value::Double(value) => Number::from_f64(*value)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            Value::Decimal(value) => value
                .to_f64()
                .and_then(Number::from_f64)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            Value::String(value) => JsonValue::String(value.clone()),
            Value::Timestamp(value) => {
                JsonValue::String(value.format(TIMESTAMP_FORMAT).to_string())
            }
            Value::Date(value) => JsonValue::String(value.format(DATE_FORMAT).to_string()),
            Value::Array(values) => JsonValue::Array(values.iter().map(Value::to_json).collect()),
            Value::Struct(fields) => {
                let mut map = Map::new();
                for (name, value) in fields {
                    map.insert(name.clone(), value.to_json());
                }
                JsonValue::Object(map)
            }
        }
    }
}

/// Round `value` half away from zero to `scale` digits and check that it
/// fits in `precision` total digits.
pub fn fit_decimal(value: Decimal, precision: u32, scale: u32) -> Option<Decimal> {
    if scale > precision || scale > MAX_DECIMAL_SCALE {
        return None;
    }
    let mut rounded = value.round_dp_with_strategy(scale, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(scale);

    let integer_digits = precision - scale;
    if integer_digits <= MAX_DECIMAL_SCALE {
        let limit = Decimal::from_i128_with_scale(10_i128.pow(integer_digits), 0);
        if rounded.trunc().abs() >= limit {
            return None;
        }
    }
    Some(rounded)
}

/// Convert a double into a decimal of the given precision and scale.
pub fn decimal_from_f64(value: f64, precision: u32, scale: u32) -> Option<Decimal> {
    Decimal::from_f64(value).and_then(|raw| fit_decimal(raw, precision, scale))
}

/// Parse `YYYY-MM-DD HH:MM:SS`, the ISO `T` form, or a bare date (midnight).
pub fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    NaiveDateTime::parse_from_str(text, TIMESTAMP_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S"))
        .ok()
        .or_else(|| parse_date(text).and_then(|date| date.and_hms_opt(0, 0, 0)))
}

pub fn parse_date(text: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(text.trim(), DATE_FORMAT).ok()
}

/// Render a double the way SQL engines print them: integral values keep a
/// trailing `.0`.
pub fn format_double(value: f64) -> String {
    let text = value.to_string();
    if value.is_finite() && !text.contains('.') && !text.contains('e') {
        format!("{text}.0")
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_struct() -> Value {
        Value::Struct(vec![
            ("street".to_string(), Value::String("12 Main St".to_string())),
            ("zip".to_string(), Value::String("10001".to_string())),
        ])
    }

    #[test]
    fn doubles_keep_a_fraction() {
        assert_eq!(format_double(45.0), "45.0");
        assert_eq!(format_double(-0.5), "-0.5");
        assert_eq!(format_double(f64::NAN), "NaN");
    }

    #[test]
    fn composites_render_as_text_and_json() {
        let value = Value::Array(vec![sample_struct(), Value::Null]);
        assert_eq!(value.to_text(), "[{12 Main St, 10001}, NULL]");
        assert_eq!(
            value.to_csv_field(),
            r#"[{"street":"12 Main St","zip":"10001"},null]"#
        );
    }

    #[test]
    fn field_lookup_reads_struct_members() {
        let value = sample_struct();
        assert_eq!(value.field("zip").and_then(Value::as_str), Some("10001"));
        assert!(value.field("city").is_none());
    }

    #[test]
    fn fits_decimals_half_away_from_zero() {
        let value = decimal_from_f64(12.346, 5, 2).expect("fits");
        assert_eq!(value.to_string(), "12.35");
        let value = decimal_from_f64(32.0, 5, 2).expect("fits");
        assert_eq!(value.to_string(), "32.00");
        assert!(decimal_from_f64(1000.0, 5, 2).is_none());
        assert!(decimal_from_f64(f64::NAN, 5, 2).is_none());
    }

    #[test]
    fn converts_json_literals_by_type() {
        let ts = Value::from_json(&serde_json::json!("2022-01-01 10:00:00"), &DataType::Timestamp);
        assert_eq!(
            ts.and_then(|v| v.as_timestamp()).map(|v| v.to_string()),
            Some("2022-01-01 10:00:00".to_string())
        );
        assert_eq!(
            Value::from_json(&serde_json::json!(3), &DataType::Long),
            Some(Value::Long(3))
        );
        assert_eq!(
            Value::from_json(&serde_json::json!("3"), &DataType::Long),
            None
        );
        assert_eq!(
            Value::from_json(&serde_json::Value::Null, &DataType::String),
            Some(Value::Null)
        );
    }

    #[test]
    fn compares_across_numeric_kinds() {
        assert_eq!(
            Value::Long(2).compare(&Value::Double(2.5)),
            Some(Ordering::Less)
        );
        assert_eq!(
            Value::Decimal(Decimal::new(250, 2)).compare(&Value::Long(2)),
            Some(Ordering::Greater)
        );
        assert_eq!(Value::Null.compare(&Value::Long(1)), None);
        assert_eq!(Value::String("a".into()).compare(&Value::Long(1)), None);
    }

    #[test]
    fn decimals_keep_their_scale() {
        let value = Value::Decimal(Decimal::new(3200, 2));
        assert_eq!(value.to_text(), "32.00");
        assert_eq!(Value::Null.to_csv_field(), "");
    }
}
