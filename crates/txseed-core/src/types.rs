use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Logical type of a generated column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    /// 64-bit signed integer.
    Long,
    /// 64-bit floating point.
    Double,
    Boolean,
    String,
    /// Naive timestamp with second precision.
    Timestamp,
    Date,
    /// Fixed-point decimal with `precision` total digits and `scale` fractional digits.
    Decimal { precision: u32, scale: u32 },
    Array(Box<DataType>),
    Struct(Vec<StructField>),
}

/// Named member of a struct type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct StructField {
    pub name: String,
    pub data_type: DataType,
    #[serde(default = "default_nullable")]
    pub nullable: bool,
}

fn default_nullable() -> bool {
    true
}

impl StructField {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            nullable: true,
        }
    }
}

impl DataType {
    pub fn array(element: DataType) -> Self {
        DataType::Array(Box::new(element))
    }

    pub fn decimal(precision: u32, scale: u32) -> Self {
        DataType::Decimal { precision, scale }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            DataType::Long | DataType::Double | DataType::Decimal { .. }
        )
    }

    pub fn is_scalar(&self) -> bool {
        !matches!(self, DataType::Array(_) | DataType::Struct(_))
    }

    /// Types that a `range` generator can sample uniformly.
    pub fn supports_range(&self) -> bool {
        matches!(
            self,
            DataType::Long
                | DataType::Double
                | DataType::Decimal { .. }
                | DataType::Timestamp
                | DataType::Date
        )
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Long => f.write_str("long"),
            DataType::Double => f.write_str("double"),
            DataType::Boolean => f.write_str("boolean"),
            DataType::String => f.write_str("string"),
            DataType::Timestamp => f.write_str("timestamp"),
            DataType::Date => f.write_str("date"),
            DataType::Decimal { precision, scale } => write!(f, "decimal({precision},{scale})"),
            DataType::Array(element) => write!(f, "array<{element}>"),
            DataType::Struct(fields) => {
                f.write_str("struct<")?;
                for (idx, field) in fields.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{}:{}", field.name, field.data_type)?;
                }
                f.write_str(">")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_nested_types() {
        let items = DataType::array(DataType::Struct(vec![
            StructField::new("item_id", DataType::Long),
            StructField::new("price", DataType::Double),
        ]));
        assert_eq!(
            items.to_string(),
            "array<struct<item_id:long,price:double>>"
        );
        assert_eq!(DataType::decimal(5, 2).to_string(), "decimal(5,2)");
    }

    #[test]
    fn serializes_in_snake_case() {
        let json = serde_json::to_value(DataType::array(DataType::String)).expect("serialize");
        assert_eq!(json, serde_json::json!({"array": "string"}));

        let parsed: DataType =
            serde_json::from_value(serde_json::json!({"decimal": {"precision": 5, "scale": 2}}))
                .expect("parse decimal");
        assert_eq!(parsed, DataType::decimal(5, 2));
    }
}
