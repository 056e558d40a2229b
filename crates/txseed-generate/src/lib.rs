//! Deterministic row generation for txseed.
//!
//! Consumes a validated [`txseed_spec::DataSpec`] and materializes it into a
//! [`txseed_core::Frame`]: sampled columns first, then derived columns in
//! dependency order, each row driven by its own seeded RNG.

pub mod cast;
pub mod engine;
pub mod errors;
pub mod eval;
pub mod generators;
pub mod model;
pub mod output;

pub use engine::{GenerationEngine, GenerationResult};
pub use errors::GenerationError;
pub use model::{GenerateOptions, GenerationIssue, GenerationReport};
