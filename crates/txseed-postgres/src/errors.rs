use thiserror::Error;

/// Errors raised while configuring or writing to PostgreSQL.
#[derive(Debug, Error)]
pub enum PostgresError {
    #[error("missing environment variable {0}")]
    MissingEnv(&'static str),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),
    #[error("schema '{0}' does not exist")]
    SchemaNotFound(String),
    #[error("table {0} already exists")]
    TableExists(String),
    #[error("table {table} does not match the frame: {details}")]
    IncompatibleSchema { table: String, details: String },
    #[error("column '{column}': {message}")]
    Value { column: String, message: String },
}

pub type Result<T> = std::result::Result<T, PostgresError>;
