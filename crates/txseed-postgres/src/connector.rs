use std::fmt;
use std::str::FromStr;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use sqlx::{Connection, PgConnection};
use tracing::{debug, info};
use txseed_core::Frame;

use crate::config::PostgresConfig;
use crate::errors::{PostgresError, Result};
use crate::mapping::{SqlCell, column_type, udt_name};
use crate::queries::{self, MAX_BIND_PARAMS};

pub const DEFAULT_SCHEMA: &str = "public";

/// What to do when the target table already exists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IfExists {
    /// Drop and recreate the table.
    #[default]
    Replace,
    Fail,
    /// Insert into the existing table after checking its columns.
    Append,
}

impl IfExists {
    pub fn as_str(&self) -> &'static str {
        match self {
            IfExists::Replace => "replace",
            IfExists::Fail => "fail",
            IfExists::Append => "append",
        }
    }
}

impl fmt::Display for IfExists {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IfExists {
    type Err = String;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "replace" => Ok(IfExists::Replace),
            "fail" => Ok(IfExists::Fail),
            "append" => Ok(IfExists::Append),
            other => Err(format!(
                "unknown if-exists mode '{other}' (expected replace, fail or append)"
            )),
        }
    }
}

/// Outcome of [`PostgresConnector::write_frame`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteSummary {
    /// Schema-qualified table name.
    pub table: String,
    pub rows_written: u64,
    pub mode: IfExists,
    /// Whether the table was created by this write.
    pub created: bool,
}

/// Writes frames into PostgreSQL tables.
#[derive(Debug, Clone)]
pub struct PostgresConnector {
    config: PostgresConfig,
}

impl PostgresConnector {
    pub fn new(config: PostgresConfig) -> Self {
        Self { config }
    }

    /// Build a connector from `POSTGRES_*` environment variables.
    pub fn from_env() -> Result<Self> {
        PostgresConfig::from_env().map(Self::new)
    }

    pub fn config(&self) -> &PostgresConfig {
        &self.config
    }

    pub async fn connect(&self) -> Result<PgConnection> {
        info!(url = %self.config.redacted_url(), "connecting to postgres");
        let conn = PgConnection::connect_with(&self.config.connect_options()?).await?;
        Ok(conn)
    }

    /// Write every row of `frame` into `schema.table` in one transaction.
    ///
    /// `schema` defaults to `public`. The connection is closed before
    /// returning.
    pub async fn write_frame(
        &self,
        frame: &Frame,
        table: &str,
        schema: Option<&str>,
        mode: IfExists,
    ) -> Result<WriteSummary> {
        let start = Instant::now();
        let schema = schema.unwrap_or(DEFAULT_SCHEMA);

        let mut conn = self.connect().await?;
        let summary = write_in_transaction(&mut conn, frame, schema, table, mode).await;
        conn.close().await?;
        let summary = summary?;

        info!(
            table = %summary.table,
            rows = summary.rows_written,
            mode = %mode,
            created = summary.created,
            duration_ms = start.elapsed().as_millis() as u64,
            "frame written to postgres"
        );
        Ok(summary)
    }
}

async fn write_in_transaction(
    conn: &mut PgConnection,
    frame: &Frame,
    schema: &str,
    table: &str,
    mode: IfExists,
) -> Result<WriteSummary> {
    let qualified = queries::qualified_name(schema, table);
    let display_name = format!("{schema}.{table}");
    let mut tx = conn.begin().await?;

    if !queries::schema_exists(&mut *tx, schema).await? {
        return Err(PostgresError::SchemaNotFound(schema.to_string()));
    }

    let exists = queries::table_exists(&mut *tx, schema, table).await?;
    let create = match (exists, mode) {
        (false, _) => true,
        (true, IfExists::Fail) => return Err(PostgresError::TableExists(display_name)),
        (true, IfExists::Replace) => {
            debug!(table = %display_name, "dropping existing table");
            queries::drop_table(&mut *tx, &qualified).await?;
            true
        }
        (true, IfExists::Append) => {
            let existing = queries::list_columns(&mut *tx, schema, table).await?;
            check_compatible(&display_name, frame, &existing)?;
            false
        }
    };

    if create {
        let columns: Vec<(String, String, bool)> = frame
            .columns()
            .iter()
            .map(|col| (col.name.clone(), column_type(&col.data_type), col.nullable))
            .collect();
        queries::create_table(&mut *tx, &qualified, &columns).await?;
        debug!(table = %display_name, columns = columns.len(), "table created");
    }

    let names: Vec<String> = frame.columns().iter().map(|col| col.name.clone()).collect();
    let batch_rows = (MAX_BIND_PARAMS / frame.width().max(1)).max(1);
    let mut rows_written = 0u64;
    for (batch_index, batch) in frame.rows().chunks(batch_rows).enumerate() {
        let cells = batch
            .iter()
            .map(|row| {
                frame
                    .columns()
                    .iter()
                    .zip(row)
                    .map(|(col, value)| SqlCell::from_value(&col.name, value, &col.data_type))
                    .collect::<Result<Vec<_>>>()
            })
            .collect::<Result<Vec<_>>>()?;
        let inserted = queries::insert_rows(&mut *tx, &qualified, &names, cells).await?;
        rows_written += inserted;
        debug!(batch = batch_index, rows = inserted, "batch inserted");
    }

    tx.commit().await?;

    Ok(WriteSummary {
        table: display_name,
        rows_written,
        mode,
        created: create,
    })
}

fn check_compatible(
    table: &str,
    frame: &Frame,
    existing: &[queries::RawColumn],
) -> Result<()> {
    let mut problems = Vec::new();
    for column in frame.columns() {
        let expected = udt_name(&column.data_type);
        match existing.iter().find(|raw| raw.name == column.name) {
            None => problems.push(format!("missing column '{}'", column.name)),
            Some(raw) if raw.udt_name != expected => problems.push(format!(
                "column '{}' is {} but the frame needs {}",
                column.name, raw.udt_name, expected
            )),
            Some(_) => {}
        }
    }
    if problems.is_empty() {
        Ok(())
    } else {
        Err(PostgresError::IncompatibleSchema {
            table: table.to_string(),
            details: problems.join("; "),
        })
    }
}
