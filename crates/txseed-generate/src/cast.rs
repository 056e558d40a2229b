use std::str::FromStr;

use chrono::DateTime;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use txseed_core::{DataType, Value, decimal_from_f64, fit_decimal, parse_date, parse_timestamp};

/// Convert `value` to `to`, the way a SQL `CAST` does.
///
/// Returns `None` when the conversion is not possible (unparsable text,
/// out-of-range numbers, mismatched shapes). `NULL` casts to `NULL`.
pub fn cast_value(value: &Value, to: &DataType) -> Option<Value> {
    if value.is_null() {
        return Some(Value::Null);
    }
    match to {
        DataType::Long => to_long(value).map(Value::Long),
        DataType::Double => to_double(value).map(Value::Double),
        DataType::Decimal { precision, scale } => {
            to_decimal(value, *precision, *scale).map(Value::Decimal)
        }
        DataType::String => Some(Value::String(value.to_text())),
        DataType::Boolean => to_bool(value).map(Value::Bool),
        DataType::Timestamp => match value {
            Value::Timestamp(ts) => Some(Value::Timestamp(*ts)),
            Value::Date(date) => date.and_hms_opt(0, 0, 0).map(Value::Timestamp),
            Value::String(text) => parse_timestamp(text).map(Value::Timestamp),
            Value::Long(secs) => DateTime::from_timestamp(*secs, 0)
                .map(|ts| Value::Timestamp(ts.naive_utc())),
            _ => None,
        },
        DataType::Date => match value {
            Value::Date(date) => Some(Value::Date(*date)),
            Value::Timestamp(ts) => Some(Value::Date(ts.date())),
            Value::String(text) => parse_date(text)
                .or_else(|| parse_timestamp(text).map(|ts| ts.date()))
                .map(Value::Date),
            _ => None,
        },
        DataType::Array(element) => match value {
            Value::Array(items) => items
                .iter()
                .map(|item| cast_value(item, element))
                .collect::<Option<Vec<_>>>()
                .map(Value::Array),
            _ => None,
        },
        // struct casts are positional; field names come from the target type
        DataType::Struct(fields) => match value {
            Value::Struct(members) if members.len() == fields.len() => fields
                .iter()
                .zip(members)
                .map(|(field, (_, member))| {
                    cast_value(member, &field.data_type).map(|cast| (field.name.clone(), cast))
                })
                .collect::<Option<Vec<_>>>()
                .map(Value::Struct),
            _ => None,
        },
    }
}

/// Truncating conversion to a 64-bit integer.
pub fn to_long(value: &Value) -> Option<i64> {
    match value {
        Value::Long(v) => Some(*v),
        Value::Double(v) => double_to_long(*v),
        Value::Decimal(v) => v.trunc().to_i64(),
        Value::Bool(v) => Some(i64::from(*v)),
        Value::String(text) => {
            let text = text.trim();
            text.parse::<i64>()
                .ok()
                .or_else(|| text.parse::<f64>().ok().and_then(double_to_long))
        }
        Value::Timestamp(ts) => Some(ts.and_utc().timestamp()),
        _ => None,
    }
}

fn double_to_long(value: f64) -> Option<i64> {
    let truncated = value.trunc();
    // i64::MAX is not representable as f64; the bound is exclusive
    (truncated.is_finite() && truncated >= i64::MIN as f64 && truncated < i64::MAX as f64)
        .then_some(truncated as i64)
}

pub fn to_double(value: &Value) -> Option<f64> {
    match value {
        Value::Long(_) | Value::Double(_) | Value::Decimal(_) => value.as_f64(),
        Value::Bool(v) => Some(if *v { 1.0 } else { 0.0 }),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        Value::Timestamp(ts) => Some(ts.and_utc().timestamp() as f64),
        _ => None,
    }
}

pub fn to_decimal(value: &Value, precision: u32, scale: u32) -> Option<Decimal> {
    let raw = match value {
        Value::Long(v) => Decimal::from(*v),
        Value::Double(v) => return decimal_from_f64(*v, precision, scale),
        Value::Decimal(v) => *v,
        Value::Bool(v) => Decimal::from(i64::from(*v)),
        Value::String(text) => Decimal::from_str(text.trim()).ok()?,
        _ => return None,
    };
    fit_decimal(raw, precision, scale)
}

fn to_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(v) => Some(*v),
        Value::Long(v) => Some(*v != 0),
        Value::Double(v) => Some(*v != 0.0),
        Value::Decimal(v) => Some(!v.is_zero()),
        Value::String(text) => match text.trim().to_ascii_lowercase().as_str() {
            "true" | "t" | "yes" | "y" | "1" => Some(true),
            "false" | "f" | "no" | "n" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use txseed_core::StructField;

    #[test]
    fn double_to_int_truncates_toward_zero() {
        assert_eq!(cast_value(&Value::Double(6.99), &DataType::Long), Some(Value::Long(6)));
        assert_eq!(cast_value(&Value::Double(-6.99), &DataType::Long), Some(Value::Long(-6)));
        assert_eq!(cast_value(&Value::Double(f64::NAN), &DataType::Long), None);
        assert_eq!(
            cast_value(&Value::String(" 1.5 ".into()), &DataType::Long),
            Some(Value::Long(1))
        );
    }

    #[test]
    fn decimal_casts_round_half_away_from_zero() {
        let cast = cast_value(&Value::Double(2.675_000_1), &DataType::decimal(5, 2));
        assert_eq!(cast.map(|v| v.to_text()), Some("2.68".to_string()));
        assert_eq!(cast_value(&Value::Long(123_456), &DataType::decimal(5, 2)), None);
        assert_eq!(
            cast_value(&Value::String("-1.005".into()), &DataType::decimal(5, 2))
                .map(|v| v.to_text()),
            Some("-1.01".to_string())
        );
    }

    #[test]
    fn string_casts_use_display_text() {
        assert_eq!(
            cast_value(&Value::Double(-12.5), &DataType::String),
            Some(Value::String("-12.5".to_string()))
        );
        assert_eq!(
            cast_value(&Value::Long(7), &DataType::String),
            Some(Value::String("7".to_string()))
        );
    }

    #[test]
    fn struct_casts_are_positional() {
        let target = DataType::Struct(vec![
            StructField::new("item_id", DataType::Long),
            StructField::new("price", DataType::Double),
        ]);
        let value = Value::Struct(vec![
            ("a".to_string(), Value::Long(3)),
            ("b".to_string(), Value::Long(4)),
        ]);
        assert_eq!(
            cast_value(&value, &target),
            Some(Value::Struct(vec![
                ("item_id".to_string(), Value::Long(3)),
                ("price".to_string(), Value::Double(4.0)),
            ]))
        );
        assert_eq!(cast_value(&Value::Long(1), &target), None);
    }

    #[test]
    fn temporal_casts() {
        let ts = parse_timestamp("2022-03-04 05:06:07").map(Value::Timestamp);
        let ts = ts.expect("timestamp");
        assert_eq!(
            cast_value(&ts, &DataType::Date).map(|v| v.to_text()),
            Some("2022-03-04".to_string())
        );
        assert_eq!(
            cast_value(&Value::String("2022-03-04".into()), &DataType::Timestamp)
                .map(|v| v.to_text()),
            Some("2022-03-04 00:00:00".to_string())
        );
        assert_eq!(cast_value(&Value::Null, &DataType::Date), Some(Value::Null));
    }
}
