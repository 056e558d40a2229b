use std::collections::HashMap;
use std::time::Instant;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, warn};

use txseed_core::{DataType, Frame, FrameColumn, Value};
use txseed_spec::{DataSpec, ValidatedSpec, ValidationIssue, compile_spec};

use crate::cast::cast_value;
use crate::errors::GenerationError;
use crate::generators::{Generator, RowContext, SequenceGenerator, build_generator};
use crate::model::{GenerateOptions, GenerationIssue, GenerationReport};

/// Result of a generation run.
#[derive(Debug, Clone)]
pub struct GenerationResult {
    pub frame: Frame,
    pub report: GenerationReport,
}

/// Entry point for materializing a spec into rows.
#[derive(Debug, Clone, Default)]
pub struct GenerationEngine {
    options: GenerateOptions,
}

/// One output column and the generator that fills it.
struct ColumnPlan {
    /// Position in the output frame.
    index: usize,
    name: String,
    data_type: DataType,
    nullable: bool,
    generator: Box<dyn Generator>,
}

impl GenerationEngine {
    pub fn new(options: GenerateOptions) -> Self {
        Self { options }
    }

    /// Validate `spec` and generate its rows.
    pub fn run(&self, spec: &DataSpec) -> Result<GenerationResult, GenerationError> {
        let compiled = compile_spec(spec)?;
        for issue in &compiled.warnings {
            log_spec_warning(issue);
        }
        self.run_compiled(&compiled)
    }

    /// Generate rows for an already validated spec.
    pub fn run_compiled(
        &self,
        compiled: &ValidatedSpec,
    ) -> Result<GenerationResult, GenerationError> {
        let start = Instant::now();
        let spec = &compiled.spec;
        let run_id = uuid::Uuid::new_v4().to_string();
        let seed = self
            .options
            .seed
            .or(spec.seed)
            .unwrap_or_else(|| rand::rng().random());
        let table_seed = hash_seed(seed, &spec.name);

        let capacity = usize::try_from(spec.rows).map_err(|_| {
            GenerationError::InvalidSpec(format!("row count {} is too large", spec.rows))
        })?;
        let plan = plan_columns(compiled)?;
        let mut frame = Frame::with_capacity(frame_columns(spec), capacity)?;
        let names: HashMap<String, usize> = frame
            .columns()
            .iter()
            .enumerate()
            .map(|(idx, col)| (col.name.to_ascii_lowercase(), idx))
            .collect();

        let mut report = GenerationReport::new(run_id.clone(), &spec.name, seed, spec.rows);

        info!(
            run_id = %run_id,
            spec = %spec.name,
            rows = spec.rows,
            columns = frame.width(),
            seed,
            strict = self.options.strict,
            "generation started"
        );

        for row_index in 0..spec.rows {
            let mut rng = ChaCha8Rng::seed_from_u64(hash_row_seed(table_seed, row_index));
            let mut values = vec![Value::Null; frame.width()];
            for column in &plan {
                let row = RowContext::new(row_index, &names, &values);
                let raw = column.generator.generate(&row, &mut rng)?;
                values[column.index] = self.coerce(column, raw, row_index, &mut report)?;
            }
            frame.push_row(values)?;
        }

        for column in &plan {
            report.record_generator_usage(column.generator.id(), spec.rows);
        }
        report.rows_generated = frame.len() as u64;
        report.duration_ms = start.elapsed().as_millis() as u64;

        info!(
            run_id = %run_id,
            spec = %spec.name,
            rows_generated = report.rows_generated,
            null_cells = report.null_counts.values().sum::<u64>(),
            duration_ms = report.duration_ms,
            "generation completed"
        );

        Ok(GenerationResult { frame, report })
    }

    /// Bring a generated value to the column's declared type and enforce
    /// nullability.
    fn coerce(
        &self,
        column: &ColumnPlan,
        raw: Value,
        row: u64,
        report: &mut GenerationReport,
    ) -> Result<Value, GenerationError> {
        let value = if raw.is_null() || has_exact_type(&raw, &column.data_type) {
            raw
        } else {
            match cast_value(&raw, &column.data_type) {
                Some(value) => value,
                None if self.options.strict => {
                    return Err(GenerationError::Eval {
                        column: column.name.clone(),
                        row,
                        message: format!(
                            "{} value {} cannot be stored as {}",
                            raw.kind(),
                            raw.to_text(),
                            column.data_type
                        ),
                    });
                }
                None => {
                    if report.record_coercion_failure(&column.name) {
                        record_warning(
                            report,
                            GenerationIssue {
                                level: "warning".to_string(),
                                code: "coercion_null".to_string(),
                                message: format!(
                                    "{} value {} cannot be stored as {}; writing NULL",
                                    raw.kind(),
                                    raw.to_text(),
                                    column.data_type
                                ),
                                column: Some(column.name.clone()),
                            },
                        );
                    }
                    Value::Null
                }
            }
        };

        if value.is_null() {
            if !column.nullable {
                return Err(GenerationError::NullValue {
                    column: column.name.clone(),
                    row,
                });
            }
            report.record_null(&column.name);
        }
        Ok(value)
    }
}

fn frame_columns(spec: &DataSpec) -> Vec<FrameColumn> {
    spec.id_column
        .iter()
        .map(|id| FrameColumn::new(id.as_str(), DataType::Long, false))
        .chain(
            spec.columns
                .iter()
                .map(|col| FrameColumn::new(col.name.as_str(), col.data_type.clone(), col.nullable)),
        )
        .collect()
}

/// Generation order: id, then sampled columns in declaration order, then
/// derived columns dependencies first.
fn plan_columns(compiled: &ValidatedSpec) -> Result<Vec<ColumnPlan>, GenerationError> {
    let spec = &compiled.spec;
    let offset = usize::from(spec.id_column.is_some());
    let mut plan = Vec::with_capacity(spec.columns.len() + offset);

    if let Some(id) = &spec.id_column {
        plan.push(ColumnPlan {
            index: 0,
            name: id.clone(),
            data_type: DataType::Long,
            nullable: false,
            generator: Box::new(SequenceGenerator::new(0)),
        });
    }

    let sampled = spec
        .columns
        .iter()
        .enumerate()
        .filter(|(_, col)| !col.is_expr())
        .map(|(idx, _)| idx);
    for idx in sampled.chain(compiled.evaluation_order.iter().copied()) {
        let column = &spec.columns[idx];
        let generator = build_generator(column, compiled.expressions[idx].as_ref())?;
        debug!(
            column = %column.name,
            generator = generator.id(),
            data_type = %column.data_type,
            "column planned"
        );
        plan.push(ColumnPlan {
            index: idx + offset,
            name: column.name.clone(),
            data_type: column.data_type.clone(),
            nullable: column.nullable,
            generator,
        });
    }

    Ok(plan)
}

/// Scalars already of the declared type skip the cast.
fn has_exact_type(value: &Value, data_type: &DataType) -> bool {
    matches!(
        (value, data_type),
        (Value::Long(_), DataType::Long)
            | (Value::Double(_), DataType::Double)
            | (Value::Bool(_), DataType::Boolean)
            | (Value::String(_), DataType::String)
            | (Value::Timestamp(_), DataType::Timestamp)
            | (Value::Date(_), DataType::Date)
    )
}

fn log_spec_warning(issue: &ValidationIssue) {
    warn!(
        code = %issue.code,
        path = %issue.path,
        hint = issue.hint.as_deref().unwrap_or(""),
        "{}",
        issue.message
    );
}

fn record_warning(report: &mut GenerationReport, issue: GenerationIssue) {
    warn!(
        code = %issue.code,
        column = issue.column.as_deref().unwrap_or(""),
        "{}",
        issue.message
    );
    report.record_warning(issue);
}

fn hash_seed(seed: u64, key: &str) -> u64 {
    let mut hash = seed ^ 0xcbf29ce484222325;
    for byte in key.as_bytes() {
        hash ^= *byte as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

fn hash_row_seed(table_seed: u64, row_index: u64) -> u64 {
    let hash = table_seed ^ row_index.wrapping_mul(0x9e3779b97f4a7c15);
    hash.wrapping_mul(0x100000001b3)
}

#[cfg(test)]
mod tests {
    use txseed_spec::ColumnSpec;

    use super::*;

    fn engine(seed: u64) -> GenerationEngine {
        GenerationEngine::new(GenerateOptions {
            seed: Some(seed),
            strict: false,
        })
    }

    #[test]
    fn row_seeds_differ_per_row() {
        let table_seed = hash_seed(1, "orders");
        assert_ne!(hash_row_seed(table_seed, 0), hash_row_seed(table_seed, 1));
        assert_ne!(hash_seed(1, "orders"), hash_seed(1, "users"));
    }

    #[test]
    fn output_keeps_declaration_order() {
        let spec = DataSpec::new("orders", 4)
            .with_id_output()
            .with_column(ColumnSpec::expr("total", DataType::Double, "qty * 2.5"))
            .with_column(ColumnSpec::range("qty", DataType::Long, 1, 3));
        let result = engine(3).run(&spec).expect("generate");
        assert_eq!(result.frame.column_names(), vec!["id", "total", "qty"]);
        for row in result.frame.rows() {
            let qty = row[2].as_i64().expect("qty");
            assert_eq!(row[1], Value::Double(qty as f64 * 2.5));
        }
        assert_eq!(result.report.generator_usage.get("expr"), Some(&4));
        assert_eq!(result.report.seed, 3);
    }

    #[test]
    fn failed_coercions_become_null_with_a_warning() {
        let spec = DataSpec::new("c", 3)
            .with_column(ColumnSpec::expr("n", DataType::Long, "'not a number'"));
        let result = engine(1).run(&spec).expect("generate");
        assert!(result.frame.rows().iter().all(|row| row[0].is_null()));
        assert_eq!(result.report.coercion_failures.get("n"), Some(&3));
        assert_eq!(result.report.warnings.len(), 1);
        assert_eq!(result.report.null_counts.get("n"), Some(&3));
    }

    #[test]
    fn strict_mode_rejects_failed_coercions() {
        let spec = DataSpec::new("c", 1)
            .with_column(ColumnSpec::expr("n", DataType::Long, "'not a number'"));
        let strict = GenerationEngine::new(GenerateOptions {
            seed: Some(1),
            strict: true,
        });
        assert!(matches!(
            strict.run(&spec),
            Err(GenerationError::Eval { row: 0, .. })
        ));
    }

    #[test]
    fn non_nullable_columns_reject_nulls() {
        let spec = DataSpec::new("c", 2)
            .with_column(ColumnSpec::expr("n", DataType::Long, "NULL").nullable(false));
        assert!(matches!(
            engine(1).run(&spec),
            Err(GenerationError::NullValue { .. })
        ));
    }

    #[test]
    fn overflowing_double_range_is_a_validation_error() {
        let spec = DataSpec::new("wide", 3).with_column(ColumnSpec::range(
            "x",
            DataType::Double,
            -1.7e308,
            1.7e308,
        ));
        let err = engine(1).run(&spec).expect_err("invalid");
        let GenerationError::Spec(txseed_spec::SpecError::Invalid(report)) = err else {
            panic!("expected a validation report, got {err:?}");
        };
        assert!(report.has_code("range_invalid"));
    }

    #[test]
    fn invalid_specs_fail_before_generation() {
        let spec = DataSpec::new("bad", 0)
            .with_column(ColumnSpec::expr("n", DataType::Long, "missing + 1"));
        let err = engine(1).run(&spec).expect_err("invalid");
        let GenerationError::Spec(txseed_spec::SpecError::Invalid(report)) = err else {
            panic!("expected a validation report, got {err:?}");
        };
        assert!(report.has_code("rows_not_positive"));
        assert!(report.has_code("unknown_column"));
    }
}
