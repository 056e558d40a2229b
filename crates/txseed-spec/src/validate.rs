use std::collections::{BTreeMap, HashMap};
use std::sync::OnceLock;

use jsonschema::JSONSchema;
use regex::Regex;
use serde_json::Value as JsonValue;
use tracing::debug;
use txseed_core::{DataType, MAX_DECIMAL_SCALE, Value, dependency_order};

use crate::errors::{SpecError, ValidationIssue, ValidationReport};
use crate::expr::{Expr, ExprError, parse_expr};
use crate::model::{ColumnKind, ColumnSpec, DataSpec, RangeBound};
use crate::schema::spec_json_schema;

/// A spec that passed validation, with its expressions parsed and ordered.
#[derive(Debug, Clone)]
pub struct ValidatedSpec {
    pub spec: DataSpec,
    /// Parsed expression per entry of `spec.columns` (`None` for
    /// non-expression columns).
    pub expressions: Vec<Option<Expr>>,
    /// Indexes into `spec.columns` of expression columns, dependencies first.
    pub evaluation_order: Vec<usize>,
    pub warnings: Vec<ValidationIssue>,
}

/// Validate a raw JSON document against the spec JSON Schema, then against
/// the semantic rules of [`validate_spec`].
pub fn validate_spec_json(spec_json: &JsonValue) -> Result<ValidationReport, SpecError> {
    let mut report = schema_report(spec_json)?;
    if !report.is_ok() {
        return Ok(report);
    }

    match serde_json::from_value::<DataSpec>(spec_json.clone()) {
        Ok(spec) => report.merge(validate_spec(&spec)),
        Err(err) => report.push(ValidationIssue::error(
            "schema_violation",
            "/",
            err.to_string(),
            None,
        )),
    }
    Ok(report)
}

/// Structural check of a raw JSON document against the spec JSON Schema.
pub(crate) fn schema_report(spec_json: &JsonValue) -> Result<ValidationReport, SpecError> {
    let schema = serde_json::to_value(spec_json_schema())?;
    let compiled =
        JSONSchema::compile(&schema).map_err(|err| SpecError::Schema(err.to_string()))?;

    let mut report = ValidationReport::default();
    if let Err(errors) = compiled.validate(spec_json) {
        for error in errors {
            report.push(ValidationIssue::error(
                "schema_violation",
                normalized_json_pointer(&error.instance_path.to_string()),
                error.to_string(),
                None,
            ));
        }
    }
    Ok(report)
}

/// Check a spec for structural and semantic problems.
pub fn validate_spec(spec: &DataSpec) -> ValidationReport {
    analyze(spec).report
}

/// Validate a spec and prepare it for generation.
pub fn compile_spec(spec: &DataSpec) -> Result<ValidatedSpec, SpecError> {
    let analysis = analyze(spec);
    let Analysis {
        report,
        expressions,
        evaluation_order,
    } = analysis;

    match evaluation_order {
        Some(evaluation_order) if report.is_ok() => {
            debug!(
                spec = %spec.name,
                columns = spec.columns.len(),
                derived = evaluation_order.len(),
                warnings = report.warnings.len(),
                "spec compiled"
            );
            Ok(ValidatedSpec {
                spec: spec.clone(),
                expressions,
                evaluation_order,
                warnings: report.warnings,
            })
        }
        _ => Err(SpecError::Invalid(report)),
    }
}

struct Analysis {
    report: ValidationReport,
    expressions: Vec<Option<Expr>>,
    evaluation_order: Option<Vec<usize>>,
}

fn analyze(spec: &DataSpec) -> Analysis {
    let mut report = ValidationReport::default();

    if spec.rows == 0 {
        report.push(ValidationIssue::error(
            "rows_not_positive",
            "/rows",
            "row count must be greater than zero",
            None,
        ));
    }
    if spec.columns.is_empty() {
        report.push(ValidationIssue::error(
            "columns_empty",
            "/columns",
            "spec declares no columns",
            Some("add at least one column definition".to_string()),
        ));
    }

    let names = check_names(spec, &mut report);

    let mut expressions = Vec::with_capacity(spec.columns.len());
    for (idx, column) in spec.columns.iter().enumerate() {
        let path = format!("/columns/{idx}");
        check_type(&column.data_type, &format!("{path}/data_type"), &mut report);
        let expr = match &column.generator {
            ColumnKind::Range { min, max } => {
                check_range(column, min, max, &path, &mut report);
                None
            }
            ColumnKind::Values { values, weights } => {
                check_values(column, values, weights.as_deref(), &path, &mut report);
                None
            }
            ColumnKind::Expr { expr } => check_expr(spec, column, expr, &path, &names, &mut report),
        };
        expressions.push(expr);
    }

    let evaluation_order = order_expressions(spec, &expressions, &names, &mut report);

    Analysis {
        report,
        expressions,
        evaluation_order,
    }
}

fn is_valid_name(name: &str) -> bool {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").ok())
        .as_ref()
        .is_some_and(|re| re.is_match(name))
}

/// Lowercased column name -> index into `spec.columns` (`None` for the id column).
fn check_names(spec: &DataSpec, report: &mut ValidationReport) -> HashMap<String, Option<usize>> {
    let mut names = HashMap::new();

    if let Some(id) = &spec.id_column {
        if !is_valid_name(id) {
            report.push(invalid_name(id, "/id_column"));
        }
        names.insert(id.to_ascii_lowercase(), None);
    }

    for (idx, column) in spec.columns.iter().enumerate() {
        let path = format!("/columns/{idx}/name");
        if !is_valid_name(&column.name) {
            report.push(invalid_name(&column.name, &path));
        }
        let key = column.name.to_ascii_lowercase();
        if names.contains_key(&key) {
            report.push(ValidationIssue::error(
                "duplicate_column",
                path,
                format!("column '{}' is declared more than once", column.name),
                Some("column names are compared case-insensitively".to_string()),
            ));
            continue;
        }
        names.insert(key, Some(idx));
    }

    names
}

fn invalid_name(name: &str, path: &str) -> ValidationIssue {
    ValidationIssue::error(
        "invalid_column_name",
        path,
        format!("'{name}' is not a valid column name"),
        Some("use letters, digits and underscores, not starting with a digit".to_string()),
    )
}

fn check_type(data_type: &DataType, path: &str, report: &mut ValidationReport) {
    match data_type {
        DataType::Decimal { precision, scale } => {
            if *precision == 0 || *precision > MAX_DECIMAL_SCALE || scale > precision {
                report.push(ValidationIssue::error(
                    "invalid_type",
                    path,
                    format!("{data_type} is not a valid decimal type"),
                    Some(format!(
                        "precision must be 1..={MAX_DECIMAL_SCALE} and scale at most precision"
                    )),
                ));
            }
        }
        DataType::Array(element) => check_type(element, &format!("{path}/array"), report),
        DataType::Struct(fields) => {
            if fields.is_empty() {
                report.push(ValidationIssue::error(
                    "invalid_type",
                    path,
                    "struct type has no fields",
                    None,
                ));
            }
            let mut seen = BTreeMap::new();
            for (idx, field) in fields.iter().enumerate() {
                let field_path = format!("{path}/struct/{idx}");
                if seen.insert(field.name.as_str(), idx).is_some() {
                    report.push(ValidationIssue::error(
                        "invalid_type",
                        &field_path,
                        format!("struct field '{}' is declared more than once", field.name),
                        None,
                    ));
                }
                check_type(&field.data_type, &format!("{field_path}/data_type"), report);
            }
        }
        _ => {}
    }
}

fn check_range(
    column: &ColumnSpec,
    min: &RangeBound,
    max: &RangeBound,
    path: &str,
    report: &mut ValidationReport,
) {
    let path = format!("{path}/generator");
    if !column.data_type.supports_range() {
        report.push(ValidationIssue::error(
            "range_invalid",
            &path,
            format!(
                "column '{}' of type {} cannot use a range generator",
                column.name, column.data_type
            ),
            Some("ranges apply to long, double, decimal, timestamp and date columns".to_string()),
        ));
        return;
    }

    let min_value = min.to_value(&column.data_type);
    let max_value = max.to_value(&column.data_type);
    for (label, bound, value) in [("min", min, &min_value), ("max", max, &max_value)] {
        if value.is_none() {
            report.push(ValidationIssue::error(
                "range_invalid",
                format!("{path}/{label}"),
                format!(
                    "{label} bound {bound:?} is not a valid {} value",
                    column.data_type
                ),
                Some("timestamps use 'YYYY-MM-DD HH:MM:SS', dates 'YYYY-MM-DD'".to_string()),
            ));
        }
    }

    if let (Some(min_value), Some(max_value)) = (&min_value, &max_value)
        && min_value.compare(max_value) == Some(std::cmp::Ordering::Greater)
    {
        report.push(ValidationIssue::error(
            "range_invalid",
            path,
            format!(
                "range for '{}' has min {} greater than max {}",
                column.name,
                min_value.to_text(),
                max_value.to_text()
            ),
            None,
        ));
    } else if let (Some(Value::Double(min)), Some(Value::Double(max))) = (&min_value, &max_value)
        && !(max - min).is_finite()
    {
        report.push(ValidationIssue::error(
            "range_invalid",
            path,
            format!(
                "range for '{}' spans more than a double can hold",
                column.name
            ),
            Some("narrow the bounds so that max - min is finite".to_string()),
        ));
    }
}

fn check_values(
    column: &ColumnSpec,
    values: &[JsonValue],
    weights: Option<&[u32]>,
    path: &str,
    report: &mut ValidationReport,
) {
    let path = format!("{path}/generator");
    if values.is_empty() {
        report.push(ValidationIssue::error(
            "values_empty",
            format!("{path}/values"),
            format!("column '{}' has an empty value list", column.name),
            None,
        ));
        return;
    }

    for (idx, raw) in values.iter().enumerate() {
        let value_path = format!("{path}/values/{idx}");
        match Value::from_json(raw, &column.data_type) {
            Some(Value::Null) if !column.nullable => report.push(ValidationIssue::error(
                "value_type_mismatch",
                value_path,
                format!("null listed for non-nullable column '{}'", column.name),
                None,
            )),
            Some(_) => {}
            None => report.push(ValidationIssue::error(
                "value_type_mismatch",
                value_path,
                format!("{raw} is not a valid {} value", column.data_type),
                None,
            )),
        }
    }

    if let Some(weights) = weights {
        if weights.len() != values.len() {
            report.push(ValidationIssue::error(
                "weights_length_mismatch",
                format!("{path}/weights"),
                format!(
                    "{} weight(s) given for {} value(s)",
                    weights.len(),
                    values.len()
                ),
                None,
            ));
        } else if weights.iter().all(|weight| *weight == 0) {
            report.push(ValidationIssue::error(
                "weights_zero",
                format!("{path}/weights"),
                "at least one weight must be greater than zero",
                None,
            ));
        }
    }
}

fn check_expr(
    spec: &DataSpec,
    column: &ColumnSpec,
    source: &str,
    path: &str,
    names: &HashMap<String, Option<usize>>,
    report: &mut ValidationReport,
) -> Option<Expr> {
    let path = format!("{path}/generator/expr");
    let expr = match parse_expr(source) {
        Ok(expr) => expr,
        Err(err) => {
            let (code, hint) = match &err {
                ExprError::UnknownFunction(_) => (
                    "unknown_function",
                    Some(format!(
                        "supported functions: {}",
                        crate::expr::Function::ALL.map(|func| func.name()).join(", ")
                    )),
                ),
                ExprError::Arity { .. } => ("function_arity", None),
                _ => ("expr_parse_error", None),
            };
            report.push(ValidationIssue::error(
                code,
                path,
                format!("column '{}': {err}", column.name),
                hint,
            ));
            return None;
        }
    };

    let mut resolved = true;
    for reference in expr.columns() {
        if !names.contains_key(&reference.to_ascii_lowercase()) {
            resolved = false;
            report.push(ValidationIssue::error(
                "unknown_column",
                &path,
                format!(
                    "column '{}' references undefined column '{reference}'",
                    column.name
                ),
                None,
            ));
        }
    }

    if resolved && !column.nullable {
        let nullable = |name: &str| match names.get(&name.to_ascii_lowercase()) {
            Some(Some(idx)) => spec.columns[*idx].nullable,
            _ => false,
        };
        if expr.may_yield_null(&nullable) {
            report.push(ValidationIssue::warning(
                "nullable_mismatch",
                &path,
                format!(
                    "column '{}' is not nullable but its expression can yield NULL",
                    column.name
                ),
                Some("mark the column nullable or add an ELSE branch".to_string()),
            ));
        }
    }

    Some(expr)
}

/// Order expression columns so each is evaluated after the expression
/// columns it reads. Returns `None` on a cycle or when some expression
/// failed to parse.
fn order_expressions(
    spec: &DataSpec,
    expressions: &[Option<Expr>],
    names: &HashMap<String, Option<usize>>,
    report: &mut ValidationReport,
) -> Option<Vec<usize>> {
    let mut nodes = Vec::new();
    let mut indexes = Vec::new();
    let mut complete = true;

    for (idx, column) in spec.columns.iter().enumerate() {
        if !column.is_expr() {
            continue;
        }
        let Some(expr) = &expressions[idx] else {
            complete = false;
            continue;
        };
        let deps: Vec<String> = expr
            .columns()
            .into_iter()
            .filter_map(|name| match names.get(&name.to_ascii_lowercase()) {
                Some(Some(dep)) if spec.columns[*dep].is_expr() => {
                    Some(spec.columns[*dep].name.to_ascii_lowercase())
                }
                _ => None,
            })
            .collect();
        nodes.push((column.name.to_ascii_lowercase(), deps));
        indexes.push(idx);
    }

    let ordered = dependency_order(&nodes);
    if let Some(cycle) = ordered.cycle {
        report.push(ValidationIssue::error(
            "cyclic_dependency",
            "/columns",
            format!("derived columns depend on each other: {}", cycle.join(", ")),
            Some("break the cycle by deriving one column from a generated one".to_string()),
        ));
        return None;
    }

    if !complete {
        return None;
    }
    ordered
        .order
        .map(|order| order.into_iter().map(|node| indexes[node]).collect())
}

fn normalized_json_pointer(pointer: &str) -> String {
    if pointer.is_empty() {
        "/".to_string()
    } else {
        pointer.to_string()
    }
}
