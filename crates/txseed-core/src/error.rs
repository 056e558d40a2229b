use thiserror::Error;

/// Core error type shared across txseed crates.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A frame row does not match the frame's column layout.
    #[error("row {row} has {found} values, expected {expected}")]
    RowWidth {
        row: usize,
        expected: usize,
        found: usize,
    },
    /// Two columns share the same name.
    #[error("duplicate column '{0}'")]
    DuplicateColumn(String),
    /// A column lookup failed.
    #[error("unknown column '{0}'")]
    UnknownColumn(String),
}

/// Convenience alias for results returned by txseed crates.
pub type Result<T> = std::result::Result<T, CoreError>;
