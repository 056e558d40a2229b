use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use txseed_core::{DataType, Value, decimal_from_f64, parse_date, parse_timestamp};

/// Name of the sequential identifier column added by [`DataSpec::with_id_output`].
pub const DEFAULT_ID_COLUMN: &str = "id";

/// Declarative description of a generated table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DataSpec {
    /// Logical name of the dataset (used in logs and reports).
    pub name: String,
    /// Number of rows to generate.
    pub rows: u64,
    /// Seed for deterministic output; a random seed is drawn when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    /// Optional sequential identifier column emitted before all other columns.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_column: Option<String>,
    /// Column definitions in output order.
    #[serde(default)]
    pub columns: Vec<ColumnSpec>,
}

impl DataSpec {
    pub fn new(name: impl Into<String>, rows: u64) -> Self {
        Self {
            name: name.into(),
            rows,
            seed: None,
            id_column: None,
            columns: Vec::new(),
        }
    }

    /// Prepend a sequential `id` column starting at zero.
    pub fn with_id_output(mut self) -> Self {
        self.id_column = Some(DEFAULT_ID_COLUMN.to_string());
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_rows(mut self, rows: u64) -> Self {
        self.rows = rows;
        self
    }

    pub fn with_column(mut self, column: ColumnSpec) -> Self {
        self.columns.push(column);
        self
    }

    /// Output column names, id column included.
    pub fn column_names(&self) -> Vec<&str> {
        self.id_column
            .as_deref()
            .into_iter()
            .chain(self.columns.iter().map(|col| col.name.as_str()))
            .collect()
    }

    pub fn column(&self, name: &str) -> Option<&ColumnSpec> {
        self.columns
            .iter()
            .find(|col| col.name.eq_ignore_ascii_case(name))
    }
}

/// One column definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ColumnSpec {
    pub name: String,
    pub data_type: DataType,
    #[serde(default = "default_nullable")]
    pub nullable: bool,
    pub generator: ColumnKind,
}

fn default_nullable() -> bool {
    true
}

/// How the values of a column are produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ColumnKind {
    /// Uniform random value between `min` and `max` (inclusive).
    Range { min: RangeBound, max: RangeBound },
    /// Random pick from `values`, optionally weighted.
    Values {
        values: Vec<JsonValue>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        weights: Option<Vec<u32>>,
    },
    /// Expression evaluated per row over sibling columns.
    Expr { expr: String },
}

impl ColumnKind {
    pub fn label(&self) -> &'static str {
        match self {
            ColumnKind::Range { .. } => "range",
            ColumnKind::Values { .. } => "values",
            ColumnKind::Expr { .. } => "expr",
        }
    }
}

/// Bound of a range generator: integer, float or timestamp/date text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum RangeBound {
    Int(i64),
    Float(f64),
    Text(String),
}

impl RangeBound {
    /// Interpret the bound as a value of `data_type`, if it fits.
    pub fn to_value(&self, data_type: &DataType) -> Option<Value> {
        match (data_type, self) {
            (DataType::Long, RangeBound::Int(value)) => Some(Value::Long(*value)),
            (DataType::Long, RangeBound::Float(value)) if value.fract() == 0.0 => {
                Some(Value::Long(*value as i64))
            }
            (DataType::Double, RangeBound::Int(value)) => Some(Value::Double(*value as f64)),
            (DataType::Double, RangeBound::Float(value)) if value.is_finite() => {
                Some(Value::Double(*value))
            }
            (DataType::Decimal { precision, scale }, RangeBound::Int(value)) => {
                decimal_from_f64(*value as f64, *precision, *scale).map(Value::Decimal)
            }
            (DataType::Decimal { precision, scale }, RangeBound::Float(value)) => {
                decimal_from_f64(*value, *precision, *scale).map(Value::Decimal)
            }
            (DataType::Timestamp, RangeBound::Text(text)) => {
                parse_timestamp(text).map(Value::Timestamp)
            }
            (DataType::Date, RangeBound::Text(text)) => parse_date(text).map(Value::Date),
            _ => None,
        }
    }
}

impl From<i64> for RangeBound {
    fn from(value: i64) -> Self {
        RangeBound::Int(value)
    }
}

impl From<i32> for RangeBound {
    fn from(value: i32) -> Self {
        RangeBound::Int(value.into())
    }
}

impl From<f64> for RangeBound {
    fn from(value: f64) -> Self {
        RangeBound::Float(value)
    }
}

impl From<&str> for RangeBound {
    fn from(value: &str) -> Self {
        RangeBound::Text(value.to_string())
    }
}

impl From<String> for RangeBound {
    fn from(value: String) -> Self {
        RangeBound::Text(value)
    }
}

impl ColumnSpec {
    pub fn new(name: impl Into<String>, data_type: DataType, generator: ColumnKind) -> Self {
        Self {
            name: name.into(),
            data_type,
            nullable: true,
            generator,
        }
    }

    pub fn range(
        name: impl Into<String>,
        data_type: DataType,
        min: impl Into<RangeBound>,
        max: impl Into<RangeBound>,
    ) -> Self {
        Self::new(
            name,
            data_type,
            ColumnKind::Range {
                min: min.into(),
                max: max.into(),
            },
        )
    }

    pub fn values<I, V>(name: impl Into<String>, data_type: DataType, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<JsonValue>,
    {
        Self::new(
            name,
            data_type,
            ColumnKind::Values {
                values: values.into_iter().map(Into::into).collect(),
                weights: None,
            },
        )
    }

    /// Skewed pick: each value is chosen with probability `weight / sum(weights)`.
    pub fn weighted<I, V>(name: impl Into<String>, data_type: DataType, pairs: I) -> Self
    where
        I: IntoIterator<Item = (V, u32)>,
        V: Into<JsonValue>,
    {
        let (values, weights): (Vec<JsonValue>, Vec<u32>) = pairs
            .into_iter()
            .map(|(value, weight)| (value.into(), weight))
            .unzip();
        Self::new(
            name,
            data_type,
            ColumnKind::Values {
                values,
                weights: Some(weights),
            },
        )
    }

    pub fn expr(name: impl Into<String>, data_type: DataType, expr: impl Into<String>) -> Self {
        Self::new(name, data_type, ColumnKind::Expr { expr: expr.into() })
    }

    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    pub fn is_expr(&self) -> bool {
        matches!(self.generator, ColumnKind::Expr { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_keeps_declaration_order() {
        let spec = DataSpec::new("orders", 10)
            .with_id_output()
            .with_column(ColumnSpec::range("qty", DataType::Long, 1, 5))
            .with_column(ColumnSpec::expr("total", DataType::Double, "qty * 2.5"));
        assert_eq!(spec.column_names(), vec!["id", "qty", "total"]);
        assert!(spec.column("TOTAL").is_some_and(ColumnSpec::is_expr));
    }

    #[test]
    fn column_kind_is_tagged() {
        let column = ColumnSpec::weighted("method", DataType::String, [("card", 9), ("cash", 1)]);
        let json = serde_json::to_value(&column).expect("serialize");
        assert_eq!(json["generator"]["kind"], "values");
        assert_eq!(json["generator"]["weights"], serde_json::json!([9, 1]));

        let parsed: ColumnSpec = serde_json::from_value(json).expect("parse back");
        assert_eq!(parsed, column);
    }

    #[test]
    fn range_bounds_convert_by_type() {
        assert_eq!(
            RangeBound::Int(5).to_value(&DataType::Double),
            Some(Value::Double(5.0))
        );
        assert!(RangeBound::Float(1.5).to_value(&DataType::Long).is_none());
        assert!(
            RangeBound::from("2022-12-31 23:59:59")
                .to_value(&DataType::Timestamp)
                .is_some()
        );
        assert!(RangeBound::from("yesterday").to_value(&DataType::Date).is_none());
    }

    #[test]
    fn range_bounds_accept_numbers_and_text() {
        let json = serde_json::json!({
            "name": "at",
            "data_type": "timestamp",
            "generator": {"kind": "range", "min": "2022-01-01 00:00:00", "max": "2022-12-31 23:59:59"}
        });
        let column: ColumnSpec = serde_json::from_value(json).expect("parse");
        assert!(column.nullable);
        assert!(matches!(
            column.generator,
            ColumnKind::Range {
                min: RangeBound::Text(_),
                ..
            }
        ));
    }
}
