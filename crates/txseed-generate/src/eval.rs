//! Row-level evaluation of parsed expressions.
//!
//! Null handling follows SQL: operators and most functions return `NULL`
//! when an input is `NULL`, and a `NULL` condition counts as false.

use std::cmp::Ordering;

use chrono::Duration;
use rand::{Rng, RngCore};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use thiserror::Error;
use txseed_core::{DataType, Value};
use txseed_spec::expr::{BinaryOp, Expr, Function, Literal, UnaryOp};

use crate::cast::{cast_value, to_long};
use crate::generators::RowContext;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("unknown column '{0}'")]
    UnknownColumn(String),
    #[error("cannot apply {op} to {left} and {right}")]
    Operands {
        op: String,
        left: &'static str,
        right: &'static str,
    },
    #[error("cannot apply {op} to {kind}")]
    Operand { op: String, kind: &'static str },
    #[error("{function}: {message}")]
    InvalidArgument { function: String, message: String },
    #[error("integer overflow in {0}")]
    Overflow(String),
}

/// Evaluate `expr` against the current row.
pub fn evaluate(
    expr: &Expr,
    row: &RowContext<'_>,
    rng: &mut dyn RngCore,
) -> Result<Value, EvalError> {
    match expr {
        Expr::Literal(literal) => Ok(literal_value(literal)),
        Expr::Column(name) => row
            .value(name)
            .cloned()
            .ok_or_else(|| EvalError::UnknownColumn(name.clone())),
        Expr::Unary { op, expr } => {
            let value = evaluate(expr, row, rng)?;
            unary(*op, value)
        }
        Expr::Binary { op, left, right } => match op {
            BinaryOp::And | BinaryOp::Or => logical(*op, left, right, row, rng),
            _ => {
                let left = evaluate(left, row, rng)?;
                let right = evaluate(right, row, rng)?;
                binary(*op, &left, &right)
            }
        },
        Expr::IsNull { expr, negated } => {
            let value = evaluate(expr, row, rng)?;
            Ok(Value::Bool(value.is_null() != *negated))
        }
        Expr::Case {
            operand,
            branches,
            otherwise,
        } => {
            let operand = match operand {
                Some(operand) => Some(evaluate(operand, row, rng)?),
                None => None,
            };
            for (when, then) in branches {
                let when = evaluate(when, row, rng)?;
                let matched = match &operand {
                    Some(operand) => operand.compare(&when) == Some(Ordering::Equal),
                    None => truthy(&when, "CASE WHEN")?,
                };
                if matched {
                    return evaluate(then, row, rng);
                }
            }
            match otherwise {
                Some(otherwise) => evaluate(otherwise, row, rng),
                None => Ok(Value::Null),
            }
        }
        Expr::Cast { expr, to } => {
            let value = evaluate(expr, row, rng)?;
            Ok(cast_value(&value, to).unwrap_or(Value::Null))
        }
        Expr::Call { function, args } => call(*function, args, row, rng),
    }
}

fn literal_value(literal: &Literal) -> Value {
    match literal {
        Literal::Null => Value::Null,
        Literal::Bool(value) => Value::Bool(*value),
        Literal::Long(value) => Value::Long(*value),
        Literal::Double(value) => Value::Double(*value),
        Literal::String(value) => Value::String(value.clone()),
    }
}

/// `true` only for a boolean true; `NULL` is false.
fn truthy(value: &Value, context: &str) -> Result<bool, EvalError> {
    match value {
        Value::Bool(flag) => Ok(*flag),
        Value::Null => Ok(false),
        other => Err(EvalError::Operand {
            op: context.to_string(),
            kind: other.kind(),
        }),
    }
}

fn unary(op: UnaryOp, value: Value) -> Result<Value, EvalError> {
    match (op, value) {
        (_, Value::Null) => Ok(Value::Null),
        (UnaryOp::Not, Value::Bool(flag)) => Ok(Value::Bool(!flag)),
        (UnaryOp::Neg, Value::Long(v)) => v
            .checked_neg()
            .map(Value::Long)
            .ok_or_else(|| EvalError::Overflow("negation".to_string())),
        (UnaryOp::Neg, Value::Double(v)) => Ok(Value::Double(-v)),
        (UnaryOp::Neg, Value::Decimal(v)) => Ok(Value::Decimal(-v)),
        (op, other) => Err(EvalError::Operand {
            op: match op {
                UnaryOp::Neg => "-".to_string(),
                UnaryOp::Not => "NOT".to_string(),
            },
            kind: other.kind(),
        }),
    }
}

/// Three-valued AND/OR with short-circuiting on the deciding value.
fn logical(
    op: BinaryOp,
    left: &Expr,
    right: &Expr,
    row: &RowContext<'_>,
    rng: &mut dyn RngCore,
) -> Result<Value, EvalError> {
    let decisive = op == BinaryOp::Or;
    let left = as_logical(evaluate(left, row, rng)?, op)?;
    if left == Some(decisive) {
        return Ok(Value::Bool(decisive));
    }
    let right = as_logical(evaluate(right, row, rng)?, op)?;
    Ok(match (left, right) {
        (_, Some(value)) if value == decisive => Value::Bool(decisive),
        (Some(_), Some(_)) => Value::Bool(!decisive),
        _ => Value::Null,
    })
}

fn as_logical(value: Value, op: BinaryOp) -> Result<Option<bool>, EvalError> {
    match value {
        Value::Null => Ok(None),
        Value::Bool(flag) => Ok(Some(flag)),
        other => Err(EvalError::Operand {
            op: op.symbol().to_string(),
            kind: other.kind(),
        }),
    }
}

fn binary(op: BinaryOp, left: &Value, right: &Value) -> Result<Value, EvalError> {
    if left.is_null() || right.is_null() {
        return Ok(Value::Null);
    }
    if op.is_comparison() {
        return compare(op, left, right);
    }

    let mismatch = || EvalError::Operands {
        op: op.symbol().to_string(),
        left: left.kind(),
        right: right.kind(),
    };
    let left = numeric_operand(left).ok_or_else(mismatch)?;
    let right = numeric_operand(right).ok_or_else(mismatch)?;
    let overflow = || EvalError::Overflow(op.symbol().to_string());

    let value = match (op, &left, &right) {
        (BinaryOp::Div, _, _) => divide(&left, &right),
        (BinaryOp::Mod, Value::Long(a), Value::Long(b)) => match b {
            0 => Value::Null,
            _ => Value::Long(a.wrapping_rem(*b)),
        },
        (_, Value::Long(a), Value::Long(b)) => {
            let result = match op {
                BinaryOp::Add => a.checked_add(*b),
                BinaryOp::Sub => a.checked_sub(*b),
                BinaryOp::Mul => a.checked_mul(*b),
                _ => return Err(mismatch()),
            };
            Value::Long(result.ok_or_else(overflow)?)
        }
        (_, Value::Double(_), _) | (_, _, Value::Double(_)) => {
            let (a, b) = (float(&left), float(&right));
            match op {
                BinaryOp::Add => Value::Double(a + b),
                BinaryOp::Sub => Value::Double(a - b),
                BinaryOp::Mul => Value::Double(a * b),
                BinaryOp::Mod if b == 0.0 => Value::Null,
                BinaryOp::Mod => Value::Double(a % b),
                _ => return Err(mismatch()),
            }
        }
        _ => {
            let (a, b) = (exact(&left), exact(&right));
            let result = match op {
                BinaryOp::Add => a.checked_add(b),
                BinaryOp::Sub => a.checked_sub(b),
                BinaryOp::Mul => a.checked_mul(b),
                BinaryOp::Mod if b.is_zero() => return Ok(Value::Null),
                BinaryOp::Mod => a.checked_rem(b),
                _ => return Err(mismatch()),
            };
            Value::Decimal(result.ok_or_else(overflow)?)
        }
    };
    Ok(value)
}

/// `/` always yields a fractional result; decimals stay exact, everything
/// else becomes a double. Division by zero yields `NULL`.
fn divide(left: &Value, right: &Value) -> Value {
    match (left, right) {
        (Value::Double(_), _) | (_, Value::Double(_)) | (Value::Long(_), Value::Long(_)) => {
            let divisor = float(right);
            if divisor == 0.0 {
                Value::Null
            } else {
                Value::Double(float(left) / divisor)
            }
        }
        _ => {
            let divisor = exact(right);
            if divisor.is_zero() {
                Value::Null
            } else {
                exact(left)
                    .checked_div(divisor)
                    .map_or(Value::Null, Value::Decimal)
            }
        }
    }
}

/// Numeric view of an operand; numeric strings are accepted the way SQL
/// engines implicitly cast them.
fn numeric_operand(value: &Value) -> Option<Value> {
    match value {
        Value::Long(_) | Value::Double(_) | Value::Decimal(_) => Some(value.clone()),
        Value::String(text) => {
            let text = text.trim();
            text.parse::<i64>()
                .map(Value::Long)
                .ok()
                .or_else(|| text.parse::<f64>().ok().map(Value::Double))
        }
        _ => None,
    }
}

fn float(value: &Value) -> f64 {
    value.as_f64().unwrap_or(f64::NAN)
}

fn exact(value: &Value) -> Decimal {
    match value {
        Value::Long(v) => Decimal::from(*v),
        Value::Decimal(v) => *v,
        _ => Decimal::ZERO,
    }
}

fn compare(op: BinaryOp, left: &Value, right: &Value) -> Result<Value, EvalError> {
    let ordering = match left.compare(right) {
        Some(ordering) => ordering,
        None if left.kind() == right.kind() => {
            // composites only support equality
            return match op {
                BinaryOp::Eq => Ok(Value::Bool(left == right)),
                BinaryOp::NotEq => Ok(Value::Bool(left != right)),
                _ => Err(EvalError::Operands {
                    op: op.symbol().to_string(),
                    left: left.kind(),
                    right: right.kind(),
                }),
            };
        }
        None => {
            return Err(EvalError::Operands {
                op: op.symbol().to_string(),
                left: left.kind(),
                right: right.kind(),
            });
        }
    };

    let result = match op {
        BinaryOp::Eq => ordering == Ordering::Equal,
        BinaryOp::NotEq => ordering != Ordering::Equal,
        BinaryOp::Lt => ordering == Ordering::Less,
        BinaryOp::LtEq => ordering != Ordering::Greater,
        BinaryOp::Gt => ordering == Ordering::Greater,
        BinaryOp::GtEq => ordering != Ordering::Less,
        _ => {
            return Err(EvalError::Operands {
                op: op.symbol().to_string(),
                left: left.kind(),
                right: right.kind(),
            });
        }
    };
    Ok(Value::Bool(result))
}

fn call(
    function: Function,
    args: &[Expr],
    row: &RowContext<'_>,
    rng: &mut dyn RngCore,
) -> Result<Value, EvalError> {
    let mut values = Vec::with_capacity(args.len());
    for arg in args {
        values.push(evaluate(arg, row, rng)?);
    }

    match function {
        Function::Rand => Ok(Value::Double(rng.random::<f64>())),
        Function::Array => Ok(Value::Array(values)),
        Function::NamedStruct => named_struct(values),
        Function::Coalesce => Ok(values
            .into_iter()
            .find(|value| !value.is_null())
            .unwrap_or(Value::Null)),
        _ if values.iter().any(Value::is_null) => Ok(Value::Null),
        Function::Concat => Ok(Value::String(
            values.iter().map(Value::to_text).collect::<String>(),
        )),
        Function::ElementAt => element_at(&values[0], &values[1]),
        Function::Substr => substr(&values),
        Function::DateAdd => date_add(&values[0], &values[1]),
        Function::Round => round(&values),
        Function::Floor => floor_ceil(&values[0], Function::Floor),
        Function::Ceil => floor_ceil(&values[0], Function::Ceil),
        Function::Abs => abs(&values[0]),
        Function::Upper => Ok(Value::String(values[0].to_text().to_uppercase())),
        Function::Lower => Ok(Value::String(values[0].to_text().to_lowercase())),
        Function::Length => Ok(Value::Long(values[0].to_text().chars().count() as i64)),
    }
}

fn invalid(function: Function, message: impl Into<String>) -> EvalError {
    EvalError::InvalidArgument {
        function: function.name().to_string(),
        message: message.into(),
    }
}

fn named_struct(values: Vec<Value>) -> Result<Value, EvalError> {
    let mut fields = Vec::with_capacity(values.len() / 2);
    let mut iter = values.into_iter();
    while let (Some(name), Some(value)) = (iter.next(), iter.next()) {
        let Value::String(name) = name else {
            return Err(invalid(Function::NamedStruct, "field names must be strings"));
        };
        fields.push((name, value));
    }
    Ok(Value::Struct(fields))
}

/// 1-based lookup; negative indexes count from the end, out of range is `NULL`.
fn element_at(array: &Value, index: &Value) -> Result<Value, EvalError> {
    let Value::Array(items) = array else {
        return Err(invalid(
            Function::ElementAt,
            format!("expected an array, got {}", array.kind()),
        ));
    };
    let index = to_long(index).ok_or_else(|| {
        invalid(
            Function::ElementAt,
            format!("index must be numeric, got {}", index.kind()),
        )
    })?;
    let position = match index.cmp(&0) {
        Ordering::Equal => return Err(invalid(Function::ElementAt, "array indexes start at 1")),
        Ordering::Greater => usize::try_from(index - 1).ok(),
        Ordering::Less => usize::try_from(index.unsigned_abs())
            .ok()
            .and_then(|back| items.len().checked_sub(back)),
    };
    Ok(position
        .and_then(|idx| items.get(idx))
        .cloned()
        .unwrap_or(Value::Null))
}

/// SQL `substr`: 1-based start, position 0 behaves like 1, negative
/// positions count from the end.
fn substr(values: &[Value]) -> Result<Value, EvalError> {
    let text = values[0].to_text();
    let chars: Vec<char> = text.chars().collect();
    let count = chars.len() as i64;

    let pos = to_long(&values[1])
        .ok_or_else(|| invalid(Function::Substr, "position must be numeric"))?;
    let len = match values.get(2) {
        Some(len) => {
            to_long(len).ok_or_else(|| invalid(Function::Substr, "length must be numeric"))?
        }
        None => i64::MAX,
    };

    let start = match pos.cmp(&0) {
        Ordering::Greater => pos - 1,
        Ordering::Equal => 0,
        Ordering::Less => count + pos,
    };
    let end = start.saturating_add(len).min(count);
    let start = start.max(0);
    if start >= end {
        return Ok(Value::String(String::new()));
    }
    Ok(Value::String(
        chars[start as usize..end as usize].iter().collect(),
    ))
}

/// Add whole days; timestamps keep their time of day.
fn date_add(base: &Value, days: &Value) -> Result<Value, EvalError> {
    let days = to_long(days)
        .ok_or_else(|| invalid(Function::DateAdd, format!("days must be numeric, got {}", days.kind())))?;
    let delta = Duration::try_days(days)
        .ok_or_else(|| invalid(Function::DateAdd, "day offset out of range"))?;

    let base = match base {
        Value::String(_) => cast_value(base, &DataType::Timestamp).unwrap_or(Value::Null),
        other => other.clone(),
    };
    match base {
        Value::Timestamp(ts) => Ok(ts.checked_add_signed(delta).map_or(Value::Null, Value::Timestamp)),
        Value::Date(date) => Ok(date.checked_add_signed(delta).map_or(Value::Null, Value::Date)),
        Value::Null => Ok(Value::Null),
        other => Err(invalid(
            Function::DateAdd,
            format!("expected a date or timestamp, got {}", other.kind()),
        )),
    }
}

/// Round half away from zero to `d` decimal places (default 0).
fn round(values: &[Value]) -> Result<Value, EvalError> {
    let places = match values.get(1) {
        Some(places) => to_long(places)
            .and_then(|p| i32::try_from(p).ok())
            .ok_or_else(|| invalid(Function::Round, "scale must be an integer"))?,
        None => 0,
    };

    match &values[0] {
        Value::Long(v) if places >= 0 => Ok(Value::Long(*v)),
        Value::Long(v) => {
            let factor = 10_f64.powi(-places);
            Ok(Value::Long(((*v as f64 / factor).round() * factor) as i64))
        }
        Value::Double(v) => {
            let factor = 10_f64.powi(places);
            Ok(Value::Double((v * factor).round() / factor))
        }
        Value::Decimal(v) => {
            let places = u32::try_from(places.max(0)).unwrap_or(0);
            Ok(Value::Decimal(
                v.round_dp_with_strategy(places, RoundingStrategy::MidpointAwayFromZero),
            ))
        }
        other => Err(invalid(
            Function::Round,
            format!("expected a number, got {}", other.kind()),
        )),
    }
}

fn floor_ceil(value: &Value, function: Function) -> Result<Value, EvalError> {
    let result = match value {
        Value::Long(v) => Some(*v),
        Value::Double(v) => {
            let rounded = if function == Function::Floor {
                v.floor()
            } else {
                v.ceil()
            };
            (rounded.is_finite() && rounded >= i64::MIN as f64 && rounded < i64::MAX as f64)
                .then_some(rounded as i64)
        }
        Value::Decimal(v) => {
            let rounded = if function == Function::Floor {
                v.floor()
            } else {
                v.ceil()
            };
            rounded.to_i64()
        }
        other => {
            return Err(invalid(
                function,
                format!("expected a number, got {}", other.kind()),
            ));
        }
    };
    result
        .map(Value::Long)
        .ok_or_else(|| EvalError::Overflow(function.name().to_string()))
}

fn abs(value: &Value) -> Result<Value, EvalError> {
    match value {
        Value::Long(v) => v
            .checked_abs()
            .map(Value::Long)
            .ok_or_else(|| EvalError::Overflow("abs".to_string())),
        Value::Double(v) => Ok(Value::Double(v.abs())),
        Value::Decimal(v) => Ok(Value::Decimal(v.abs())),
        other => Err(invalid(
            Function::Abs,
            format!("expected a number, got {}", other.kind()),
        )),
    }
}
