use txseed_core::{DataType, StructField};

use crate::model::{ColumnSpec, DataSpec};

pub const TRANSACTIONS: &str = "transactions";

const PRODUCT_CATEGORIES: [&str; 7] = [
    "Electronics",
    "Books",
    "Clothing",
    "Home",
    "Toys",
    "Sports",
    "Automotive",
];

const SHIPPING_ADDRESS_EXPR: &str = "named_struct(
    'street', concat(cast(rand() * 9999 as INT), ' Main St'),
    'city', element_at(array('New York', 'Los Angeles', 'Chicago', 'Houston', 'Phoenix'), cast(rand() * 5 + 1 as INT)),
    'state', element_at(array('NY', 'CA', 'IL', 'TX', 'AZ'), cast(rand() * 5 + 1 as INT)),
    'zip', concat(cast(rand() * 89999 + 10000 as INT))
)";

const ITEMS_EXPR: &str = "array(
    named_struct('item_id', cast(rand() * 1000 as INT), 'quantity', cast(rand() * 5 + 1 as INT), 'price', rand() * 100),
    named_struct('item_id', cast(rand() * 1000 as INT), 'quantity', cast(rand() * 5 + 1 as INT), 'price', rand() * 100)
)";

/// The built-in mock `transactions` dataset: an `id` column plus 14
/// generated and derived columns.
pub fn transactions_spec(rows: u64) -> DataSpec {
    let address = DataType::Struct(vec![
        StructField::new("street", DataType::String),
        StructField::new("city", DataType::String),
        StructField::new("state", DataType::String),
        StructField::new("zip", DataType::String),
    ]);
    let item = DataType::Struct(vec![
        StructField::new("item_id", DataType::Long),
        StructField::new("quantity", DataType::Long),
        StructField::new("price", DataType::Double),
    ]);

    DataSpec::new(TRANSACTIONS, rows)
        .with_id_output()
        .with_column(ColumnSpec::range("user_id", DataType::Long, 1, 100_000_000).nullable(false))
        .with_column(
            ColumnSpec::range("transaction_amount", DataType::Double, 1.0, 5000.0).nullable(false),
        )
        .with_column(
            ColumnSpec::range(
                "transaction_date",
                DataType::Timestamp,
                "2022-01-01 00:00:00",
                "2022-12-31 23:59:59",
            )
            .nullable(false),
        )
        .with_column(
            ColumnSpec::values("product_category", DataType::String, PRODUCT_CATEGORIES)
                .nullable(false),
        )
        .with_column(ColumnSpec::values("is_returned", DataType::Boolean, [true, false]).nullable(false))
        .with_column(
            ColumnSpec::expr(
                "tags",
                DataType::array(DataType::String),
                "array(product_category, substr(transaction_date, 0, 10))",
            )
            .nullable(false),
        )
        .with_column(ColumnSpec::expr("shipping_address", address, SHIPPING_ADDRESS_EXPR))
        .with_column(
            ColumnSpec::expr("tax", DataType::decimal(5, 2), "transaction_amount * 0.08")
                .nullable(false),
        )
        .with_column(
            ColumnSpec::expr(
                "delivery_date",
                DataType::Timestamp,
                "date_add(transaction_date, cast(rand() * 7 as INT))",
            )
            .nullable(false),
        )
        .with_column(
            ColumnSpec::weighted(
                "payment_method",
                DataType::String,
                [("Credit Card", 80), ("PayPal", 15), ("Bitcoin", 5)],
            )
            .nullable(false),
        )
        .with_column(ColumnSpec::expr(
            "coupon_code",
            DataType::String,
            "CASE WHEN rand() < 0.2 THEN concat('SAVE', cast(rand() * 100 as INT)) ELSE NULL END",
        ))
        .with_column(
            ColumnSpec::expr(
                "loyalty_points",
                DataType::Long,
                "CASE WHEN user_id % 2 = 0 THEN cast(transaction_amount / 10 as INT) ELSE 0 END",
            )
            .nullable(false),
        )
        .with_column(
            ColumnSpec::expr("items", DataType::array(item), ITEMS_EXPR).nullable(false),
        )
        .with_column(
            ColumnSpec::expr(
                "location",
                DataType::String,
                "concat(cast(rand() * 180 - 90 as STRING), ', ', cast(rand() * 360 - 180 as STRING))",
            )
            .nullable(false),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate::compile_spec;

    #[test]
    fn transactions_spec_is_valid_without_warnings() {
        let compiled = compile_spec(&transactions_spec(100)).expect("valid preset");
        assert!(compiled.warnings.is_empty(), "{:?}", compiled.warnings);
        assert_eq!(compiled.spec.column_names().len(), 15);
        assert_eq!(compiled.evaluation_order.len(), 8);
    }

    #[test]
    fn transactions_spec_lists_transaction_columns() {
        let spec = transactions_spec(1);
        assert_eq!(
            spec.column_names(),
            vec![
                "id",
                "user_id",
                "transaction_amount",
                "transaction_date",
                "product_category",
                "is_returned",
                "tags",
                "shipping_address",
                "tax",
                "delivery_date",
                "payment_method",
                "coupon_code",
                "loyalty_points",
                "items",
                "location",
            ]
        );
    }
}
