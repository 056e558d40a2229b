use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Options for the generation engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerateOptions {
    /// Seed override; takes precedence over the spec seed.
    pub seed: Option<u64>,
    /// Fail when a value cannot be coerced to its column type instead of
    /// writing `NULL`.
    pub strict: bool,
}

/// Structured generation issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationIssue {
    pub level: String,
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
}

/// Report for a generation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationReport {
    pub run_id: String,
    pub spec: String,
    /// Seed actually used; rerunning with it reproduces the frame.
    pub seed: u64,
    pub rows_requested: u64,
    pub rows_generated: u64,
    pub duration_ms: u64,
    pub generator_usage: BTreeMap<String, u64>,
    pub null_counts: BTreeMap<String, u64>,
    pub coercion_failures: BTreeMap<String, u64>,
    pub warnings_by_code: BTreeMap<String, u64>,
    pub warnings: Vec<GenerationIssue>,
}

impl GenerationReport {
    pub fn new(run_id: String, spec: &str, seed: u64, rows_requested: u64) -> Self {
        Self {
            run_id,
            spec: spec.to_string(),
            seed,
            rows_requested,
            rows_generated: 0,
            duration_ms: 0,
            generator_usage: BTreeMap::new(),
            null_counts: BTreeMap::new(),
            coercion_failures: BTreeMap::new(),
            warnings_by_code: BTreeMap::new(),
            warnings: Vec::new(),
        }
    }

    pub fn record_generator_usage(&mut self, id: &str, count: u64) {
        *self.generator_usage.entry(id.to_string()).or_insert(0) += count;
    }

    pub fn record_null(&mut self, column: &str) {
        *self.null_counts.entry(column.to_string()).or_insert(0) += 1;
    }

    /// Returns true the first time a column records a failure.
    pub fn record_coercion_failure(&mut self, column: &str) -> bool {
        let count = self.coercion_failures.entry(column.to_string()).or_insert(0);
        *count += 1;
        *count == 1
    }

    pub fn record_warning(&mut self, issue: GenerationIssue) {
        *self.warnings_by_code.entry(issue.code.clone()).or_insert(0) += 1;
        self.warnings.push(issue);
    }
}
