//! Data specification contracts for txseed.
//!
//! A [`DataSpec`] declares a row count and an ordered list of column
//! definitions. This crate owns the model, the expression language used by
//! derived columns, JSON Schema emission and validation.

pub mod errors;
pub mod expr;
pub mod load;
pub mod model;
pub mod presets;
pub mod schema;
pub mod validate;

pub use errors::{IssueSeverity, SpecError, ValidationIssue, ValidationReport};
pub use expr::{Expr, ExprError, Function, parse_expr};
pub use load::{load_spec_file, parse_spec_json, parse_spec_toml};
pub use model::{ColumnKind, ColumnSpec, DataSpec, RangeBound};
pub use presets::transactions_spec;
pub use schema::spec_json_schema;
pub use validate::{ValidatedSpec, compile_spec, validate_spec, validate_spec_json};
