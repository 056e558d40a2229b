//! Column generators.
//!
//! Each column of a spec is backed by one [`Generator`]; primitives sample
//! from ranges and value lists, `derive` evaluates expressions over the
//! values already produced for the row.

mod derive;
mod primitives;

use std::collections::HashMap;

use rand::RngCore;
use txseed_core::Value;
use txseed_spec::{ColumnKind, ColumnSpec, Expr};

use crate::errors::GenerationError;

pub use derive::ExprGenerator;
pub use primitives::{RangeGenerator, SequenceGenerator, ValuesGenerator};

/// Read access to the values produced so far for the current row.
#[derive(Debug, Clone, Copy)]
pub struct RowContext<'a> {
    pub row_index: u64,
    /// Lowercased column name -> position in `values`.
    names: &'a HashMap<String, usize>,
    values: &'a [Value],
}

impl<'a> RowContext<'a> {
    pub fn new(row_index: u64, names: &'a HashMap<String, usize>, values: &'a [Value]) -> Self {
        Self {
            row_index,
            names,
            values,
        }
    }

    /// Look up a column value by name, ignoring case.
    pub fn value(&self, name: &str) -> Option<&'a Value> {
        let index = match self.names.get(name) {
            Some(index) => *index,
            None => *self.names.get(&name.to_ascii_lowercase())?,
        };
        self.values.get(index)
    }
}

/// Produces one cell per row.
pub trait Generator: Send + Sync {
    /// Stable identifier used in generation reports.
    fn id(&self) -> &'static str;

    fn generate(
        &self,
        row: &RowContext<'_>,
        rng: &mut dyn RngCore,
    ) -> Result<Value, GenerationError>;
}

/// Build the generator backing `column`.
///
/// `expr` is the parsed expression for expression columns.
pub fn build_generator(
    column: &ColumnSpec,
    expr: Option<&Expr>,
) -> Result<Box<dyn Generator>, GenerationError> {
    let generator: Box<dyn Generator> = match (&column.generator, expr) {
        (ColumnKind::Range { min, max }, _) => {
            Box::new(RangeGenerator::new(&column.name, &column.data_type, min, max)?)
        }
        (ColumnKind::Values { values, weights }, _) => Box::new(ValuesGenerator::new(
            &column.name,
            &column.data_type,
            values,
            weights.as_deref(),
        )?),
        (ColumnKind::Expr { .. }, Some(expr)) => Box::new(ExprGenerator::new(&column.name, expr.clone())),
        (ColumnKind::Expr { .. }, None) => {
            return Err(GenerationError::InvalidSpec(format!(
                "column '{}' has no parsed expression",
                column.name
            )));
        }
    };
    Ok(generator)
}
