use chrono::{DateTime, NaiveDate};
use rand::distr::{Distribution, weighted::WeightedIndex};
use rand::{Rng, RngCore};
use serde_json::Value as JsonValue;
use txseed_core::{DataType, Value, decimal_from_f64};
use txseed_spec::RangeBound;

use super::{Generator, RowContext};
use crate::errors::GenerationError;

/// Sequential identifier starting at zero.
#[derive(Debug, Clone, Default)]
pub struct SequenceGenerator {
    start: i64,
}

impl SequenceGenerator {
    pub fn new(start: i64) -> Self {
        Self { start }
    }
}

impl Generator for SequenceGenerator {
    fn id(&self) -> &'static str {
        "sequence"
    }

    fn generate(
        &self,
        row: &RowContext<'_>,
        _rng: &mut dyn RngCore,
    ) -> Result<Value, GenerationError> {
        let offset = i64::try_from(row.row_index).map_err(|_| GenerationError::Overflow {
            column: "id".to_string(),
            row: row.row_index,
        })?;
        self.start
            .checked_add(offset)
            .map(Value::Long)
            .ok_or(GenerationError::Overflow {
                column: "id".to_string(),
                row: row.row_index,
            })
    }
}

#[derive(Debug, Clone)]
enum RangeSampler {
    Long(i64, i64),
    Double(f64, f64),
    Decimal {
        min: f64,
        max: f64,
        precision: u32,
        scale: u32,
    },
    /// Bounds in seconds since the Unix epoch.
    Timestamp(i64, i64),
    Date(NaiveDate, i64),
}

/// Uniform sample between two inclusive bounds.
#[derive(Debug, Clone)]
pub struct RangeGenerator {
    column: String,
    sampler: RangeSampler,
}

impl RangeGenerator {
    pub fn new(
        column: &str,
        data_type: &DataType,
        min: &RangeBound,
        max: &RangeBound,
    ) -> Result<Self, GenerationError> {
        let invalid = |message: &str| {
            GenerationError::InvalidSpec(format!("range for column '{column}': {message}"))
        };
        let (Some(min), Some(max)) = (min.to_value(data_type), max.to_value(data_type)) else {
            return Err(invalid(&format!("bounds are not valid {data_type} values")));
        };
        if min.compare(&max) == Some(std::cmp::Ordering::Greater) {
            return Err(invalid("min must be <= max"));
        }

        let sampler = match (data_type, min, max) {
            (DataType::Long, Value::Long(min), Value::Long(max)) => RangeSampler::Long(min, max),
            (DataType::Double, Value::Double(min), Value::Double(max)) => {
                if !(max - min).is_finite() {
                    return Err(invalid("max - min overflows a double"));
                }
                RangeSampler::Double(min, max)
            }
            (DataType::Decimal { precision, scale }, min, max) => RangeSampler::Decimal {
                min: min.as_f64().unwrap_or_default(),
                max: max.as_f64().unwrap_or_default(),
                precision: *precision,
                scale: *scale,
            },
            (DataType::Timestamp, Value::Timestamp(min), Value::Timestamp(max)) => {
                RangeSampler::Timestamp(min.and_utc().timestamp(), max.and_utc().timestamp())
            }
            (DataType::Date, Value::Date(min), Value::Date(max)) => {
                RangeSampler::Date(min, (max - min).num_days())
            }
            _ => return Err(invalid(&format!("{data_type} does not support ranges"))),
        };

        Ok(Self {
            column: column.to_string(),
            sampler,
        })
    }
}

impl Generator for RangeGenerator {
    fn id(&self) -> &'static str {
        match self.sampler {
            RangeSampler::Long(..) => "range.long",
            RangeSampler::Double(..) => "range.double",
            RangeSampler::Decimal { .. } => "range.decimal",
            RangeSampler::Timestamp(..) => "range.timestamp",
            RangeSampler::Date(..) => "range.date",
        }
    }

    fn generate(
        &self,
        row: &RowContext<'_>,
        rng: &mut dyn RngCore,
    ) -> Result<Value, GenerationError> {
        let value = match &self.sampler {
            RangeSampler::Long(min, max) => Value::Long(rng.random_range(*min..=*max)),
            RangeSampler::Double(min, max) => Value::Double(rng.random_range(*min..=*max)),
            RangeSampler::Decimal {
                min,
                max,
                precision,
                scale,
            } => {
                let raw = rng.random_range(*min..=*max);
                let value = decimal_from_f64(raw, *precision, *scale).ok_or_else(|| {
                    GenerationError::Eval {
                        column: self.column.clone(),
                        row: row.row_index,
                        message: format!("{raw} does not fit decimal({precision},{scale})"),
                    }
                })?;
                Value::Decimal(value)
            }
            RangeSampler::Timestamp(min, max) => {
                let secs = rng.random_range(*min..=*max);
                let ts = DateTime::from_timestamp(secs, 0).ok_or_else(|| GenerationError::Eval {
                    column: self.column.clone(),
                    row: row.row_index,
                    message: format!("timestamp {secs} out of range"),
                })?;
                Value::Timestamp(ts.naive_utc())
            }
            RangeSampler::Date(min, span) => {
                let offset = rng.random_range(0..=*span);
                Value::Date(*min + chrono::Duration::days(offset))
            }
        };
        Ok(value)
    }
}

/// Pick from a fixed list, uniformly or by integer weights.
#[derive(Debug, Clone)]
pub struct ValuesGenerator {
    choices: Vec<Value>,
    weights: Option<WeightedIndex<u32>>,
}

impl ValuesGenerator {
    pub fn new(
        column: &str,
        data_type: &DataType,
        values: &[JsonValue],
        weights: Option<&[u32]>,
    ) -> Result<Self, GenerationError> {
        let invalid = |message: String| {
            GenerationError::InvalidSpec(format!("values for column '{column}': {message}"))
        };
        if values.is_empty() {
            return Err(invalid("value list is empty".to_string()));
        }

        let choices = values
            .iter()
            .map(|raw| {
                Value::from_json(raw, data_type)
                    .ok_or_else(|| invalid(format!("{raw} is not a valid {data_type} value")))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let weights = match weights {
            Some(weights) if weights.len() != choices.len() => {
                return Err(invalid(format!(
                    "{} weight(s) for {} value(s)",
                    weights.len(),
                    choices.len()
                )));
            }
            Some(weights) => Some(
                WeightedIndex::new(weights.iter().copied())
                    .map_err(|err| invalid(err.to_string()))?,
            ),
            None => None,
        };

        Ok(Self { choices, weights })
    }
}

impl Generator for ValuesGenerator {
    fn id(&self) -> &'static str {
        if self.weights.is_some() {
            "values.weighted"
        } else {
            "values"
        }
    }

    fn generate(
        &self,
        _row: &RowContext<'_>,
        rng: &mut dyn RngCore,
    ) -> Result<Value, GenerationError> {
        let index = match &self.weights {
            Some(weights) => weights.sample(rng),
            None => rng.random_range(0..self.choices.len()),
        };
        Ok(self.choices[index].clone())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;

    fn sample(generator: &dyn Generator, rows: u64) -> Vec<Value> {
        let names = HashMap::new();
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        (0..rows)
            .map(|row_index| {
                let row = RowContext::new(row_index, &names, &[]);
                generator.generate(&row, &mut rng).expect("generate")
            })
            .collect()
    }

    #[test]
    fn sequence_counts_rows_from_start() {
        let values = sample(&SequenceGenerator::new(0), 3);
        assert_eq!(values, vec![Value::Long(0), Value::Long(1), Value::Long(2)]);
    }

    #[test]
    fn long_ranges_are_inclusive() {
        let generator =
            RangeGenerator::new("n", &DataType::Long, &RangeBound::Int(1), &RangeBound::Int(3))
                .expect("range");
        let values = sample(&generator, 500);
        for bound in [1, 2, 3] {
            assert!(values.contains(&Value::Long(bound)));
        }
        assert!(values.iter().all(|v| matches!(v, Value::Long(1..=3))));
    }

    #[test]
    fn timestamp_ranges_stay_within_bounds() {
        let min = RangeBound::from("2022-01-01 00:00:00");
        let max = RangeBound::from("2022-12-31 23:59:59");
        let generator =
            RangeGenerator::new("at", &DataType::Timestamp, &min, &max).expect("range");
        let lower = min.to_value(&DataType::Timestamp).expect("min");
        let upper = max.to_value(&DataType::Timestamp).expect("max");
        for value in sample(&generator, 200) {
            assert_ne!(value.compare(&lower), Some(std::cmp::Ordering::Less));
            assert_ne!(value.compare(&upper), Some(std::cmp::Ordering::Greater));
        }
    }

    #[test]
    fn decimal_ranges_keep_scale() {
        let generator = RangeGenerator::new(
            "price",
            &DataType::decimal(6, 2),
            &RangeBound::Float(0.5),
            &RangeBound::Float(99.99),
        )
        .expect("range");
        for value in sample(&generator, 50) {
            let decimal = value.as_decimal().expect("decimal");
            assert_eq!(decimal.scale(), 2);
        }
    }

    #[test]
    fn double_ranges_wider_than_f64_are_rejected() {
        let err = RangeGenerator::new(
            "x",
            &DataType::Double,
            &RangeBound::Float(-1.7e308),
            &RangeBound::Float(1.7e308),
        )
        .expect_err("overflowing span");
        assert!(matches!(err, GenerationError::InvalidSpec(_)));
    }

    #[test]
    fn weighted_values_skip_zero_weights() {
        let generator = ValuesGenerator::new(
            "m",
            &DataType::String,
            &[serde_json::json!("never"), serde_json::json!("always")],
            Some(&[0, 1]),
        )
        .expect("values");
        assert_eq!(generator.id(), "values.weighted");
        assert!(
            sample(&generator, 100)
                .iter()
                .all(|v| v.as_str() == Some("always"))
        );
    }

    #[test]
    fn rejects_mismatched_weights() {
        let err = ValuesGenerator::new(
            "m",
            &DataType::String,
            &[serde_json::json!("a")],
            Some(&[1, 2]),
        )
        .expect_err("length mismatch");
        assert!(matches!(err, GenerationError::InvalidSpec(_)));
    }
}
