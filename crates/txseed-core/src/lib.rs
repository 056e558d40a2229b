//! Core contracts and helpers for txseed.
//!
//! This crate defines the column types, cell values and the in-memory
//! tabular result shared by the spec, generation and sink crates.

pub mod error;
pub mod frame;
pub mod graph;
pub mod redaction;
pub mod types;
pub mod value;

pub use error::{CoreError, Result};
pub use frame::{Frame, FrameColumn};
pub use graph::{DependencyOrder, dependency_order};
pub use redaction::{RedactedConnection, redact_connection_string};
pub use types::{DataType, StructField};
pub use value::{
    MAX_DECIMAL_SCALE, Value, decimal_from_f64, fit_decimal, format_double, parse_date,
    parse_timestamp,
};

/// Timestamp layout used for parsing and rendering timestamps.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Date layout used for parsing and rendering dates.
pub const DATE_FORMAT: &str = "%Y-%m-%d";
