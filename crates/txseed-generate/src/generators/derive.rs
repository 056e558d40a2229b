use rand::RngCore;
use txseed_core::Value;
use txseed_spec::Expr;

use super::{Generator, RowContext};
use crate::errors::GenerationError;
use crate::eval::evaluate;

/// Column computed from an expression over sibling columns.
#[derive(Debug, Clone)]
pub struct ExprGenerator {
    column: String,
    expr: Expr,
}

impl ExprGenerator {
    pub fn new(column: &str, expr: Expr) -> Self {
        Self {
            column: column.to_string(),
            expr,
        }
    }
}

impl Generator for ExprGenerator {
    fn id(&self) -> &'static str {
        "expr"
    }

    fn generate(
        &self,
        row: &RowContext<'_>,
        rng: &mut dyn RngCore,
    ) -> Result<Value, GenerationError> {
        evaluate(&self.expr, row, rng).map_err(|err| GenerationError::Eval {
            column: self.column.clone(),
            row: row.row_index,
            message: err.to_string(),
        })
    }
}
