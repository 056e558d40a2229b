//! PostgreSQL sink for txseed frames.

pub mod config;
pub mod connector;
pub mod errors;
pub mod mapping;
mod queries;

pub use config::{PostgresConfig, load_dotenv};
pub use connector::{IfExists, PostgresConnector, WriteSummary};
pub use errors::{PostgresError, Result};
