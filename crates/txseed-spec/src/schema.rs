use schemars::schema::RootSchema;
use schemars::schema_for;

use crate::model::DataSpec;

/// Emit the JSON Schema for spec documents.
pub fn spec_json_schema() -> RootSchema {
    schema_for!(DataSpec)
}
