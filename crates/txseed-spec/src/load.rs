use std::fs;
use std::path::Path;

use serde_json::Value as JsonValue;
use tracing::info;

use crate::errors::SpecError;
use crate::model::DataSpec;
use crate::validate::schema_report;

/// Load a spec from a `.json` or `.toml` file.
///
/// The document is checked against the spec JSON Schema before it is
/// deserialized; semantic validation is left to [`crate::compile_spec`].
pub fn load_spec_file(path: &Path) -> Result<DataSpec, SpecError> {
    let raw = fs::read_to_string(path)?;
    let is_toml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));

    let spec = if is_toml {
        parse_spec_toml(&raw)?
    } else {
        parse_spec_json(&raw)?
    };

    info!(
        path = %path.display(),
        spec = %spec.name,
        rows = spec.rows,
        columns = spec.columns.len(),
        "spec loaded"
    );
    Ok(spec)
}

pub fn parse_spec_json(raw: &str) -> Result<DataSpec, SpecError> {
    let json: JsonValue = serde_json::from_str(raw)?;
    from_json_document(json)
}

/// TOML documents are converted to JSON so both formats share one schema.
pub fn parse_spec_toml(raw: &str) -> Result<DataSpec, SpecError> {
    let document: toml::Value = toml::from_str(raw)?;
    let json = serde_json::to_value(document)?;
    from_json_document(json)
}

fn from_json_document(json: JsonValue) -> Result<DataSpec, SpecError> {
    let report = schema_report(&json)?;
    if !report.is_ok() {
        return Err(SpecError::Invalid(report));
    }
    Ok(serde_json::from_value(json)?)
}
