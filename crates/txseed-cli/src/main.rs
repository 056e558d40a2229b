mod logging;

use std::fs;
use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use logging::{LogFormat, init_logging};
use thiserror::Error;
use tracing::{debug, error, info, warn};
use txseed_generate::output::{render_preview, write_frame_csv};
use txseed_generate::{GenerateOptions, GenerationEngine, GenerationError};
use txseed_postgres::{IfExists, PostgresConfig, PostgresConnector, PostgresError, load_dotenv};
use txseed_spec::{SpecError, ValidationReport, load_spec_file, spec_json_schema, transactions_spec};

const DEFAULT_ROWS: u64 = 100;

#[derive(Debug, Error)]
enum CliError {
    #[error("spec error: {0}")]
    Spec(#[from] SpecError),
    #[error("generation failed: {0}")]
    Generation(#[from] GenerationError),
    #[error("failed to write CSV {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("database configuration error: {0}")]
    DatabaseConfig(#[source] PostgresError),
    #[error("database write failed (CSV already written to {csv}): {source}")]
    Database {
        csv: PathBuf,
        #[source]
        source: PostgresError,
    },
    #[error("failed to write report {path}: {source}")]
    Report {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("logging error: {0}")]
    Logging(String),
}

/// Database write mode for an existing table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
enum IfExistsArg {
    #[default]
    Replace,
    Fail,
    Append,
}

impl From<IfExistsArg> for IfExists {
    fn from(value: IfExistsArg) -> Self {
        match value {
            IfExistsArg::Replace => IfExists::Replace,
            IfExistsArg::Fail => IfExists::Fail,
            IfExistsArg::Append => IfExists::Append,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "txseed",
    version,
    about = "Generate a synthetic transactions dataset into CSV and PostgreSQL"
)]
struct Cli {
    /// Rows to generate (default 100, or the row count of --spec).
    #[arg(long)]
    rows: Option<u64>,
    /// Seed for reproducible output; random when omitted.
    #[arg(long)]
    seed: Option<u64>,
    /// JSON or TOML data spec; defaults to the built-in transactions spec.
    #[arg(long, value_name = "PATH")]
    spec: Option<PathBuf>,
    /// CSV output path.
    #[arg(long, value_name = "PATH", default_value = "sample_data.csv")]
    csv: PathBuf,
    /// Target table.
    #[arg(long, default_value = "transactions")]
    table: String,
    /// Target schema.
    #[arg(long, default_value = "public")]
    schema: String,
    /// Behaviour when the table already exists.
    #[arg(long, value_enum, default_value_t = IfExistsArg::Replace)]
    if_exists: IfExistsArg,
    /// Skip the database sink.
    #[arg(long, default_value_t = false)]
    no_db: bool,
    /// Rows shown in the console preview.
    #[arg(long, default_value_t = 5)]
    preview: usize,
    /// Fail instead of writing NULL when a value cannot be stored in its column type.
    #[arg(long, default_value_t = false)]
    strict: bool,
    /// Write the generation report as JSON.
    #[arg(long, value_name = "PATH")]
    report: Option<PathBuf>,
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
    /// Print the data spec JSON Schema and exit.
    #[arg(long, default_value_t = false)]
    emit_schema: bool,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let cli = Cli::parse();
    // .env may carry RUST_LOG, so it is read before the filter is built
    let dotenv = load_dotenv();
    init_logging(cli.log_format).map_err(CliError::Logging)?;
    match &dotenv {
        Some(path) => debug!(path = %path.display(), "loaded .env"),
        None => debug!("no .env file found"),
    }

    run(cli).await.inspect_err(|err| {
        if let Some(report) = validation_report(err) {
            log_validation(report);
        }
        error!(error = %err, "txseed failed");
    })
}

async fn run(cli: Cli) -> Result<(), CliError> {
    if cli.emit_schema {
        println!("{}", serde_json::to_string_pretty(&spec_json_schema())?);
        return Ok(());
    }

    let mut spec = match &cli.spec {
        Some(path) => load_spec_file(path)?,
        None => transactions_spec(DEFAULT_ROWS),
    };
    if let Some(rows) = cli.rows {
        spec.rows = rows;
    }

    // read connection settings before generating so a misconfigured
    // environment fails fast
    let connector = if cli.no_db {
        None
    } else {
        let config = PostgresConfig::from_env().map_err(CliError::DatabaseConfig)?;
        Some(PostgresConnector::new(config))
    };

    let engine = GenerationEngine::new(GenerateOptions {
        seed: cli.seed,
        strict: cli.strict,
    });
    let result = engine.run(&spec)?;
    let frame = &result.frame;

    print!("{}", render_preview(frame, cli.preview));
    println!("{}", frame.len());

    let bytes = write_frame_csv(&cli.csv, frame).map_err(|source| CliError::Csv {
        path: cli.csv.clone(),
        source,
    })?;
    info!(path = %cli.csv.display(), rows = frame.len(), bytes, "csv written");

    if let Some(path) = &cli.report {
        let json = serde_json::to_string_pretty(&result.report)?;
        fs::write(path, json).map_err(|source| CliError::Report {
            path: path.clone(),
            source,
        })?;
        info!(path = %path.display(), "generation report written");
    }

    match connector {
        Some(connector) => {
            let summary = connector
                .write_frame(frame, &cli.table, Some(&cli.schema), cli.if_exists.into())
                .await
                .map_err(|source| CliError::Database {
                    csv: cli.csv.clone(),
                    source,
                })?;
            info!(
                table = %summary.table,
                rows = summary.rows_written,
                created = summary.created,
                "database table written"
            );
        }
        None => info!("database sink skipped"),
    }

    Ok(())
}

fn validation_report(err: &CliError) -> Option<&ValidationReport> {
    match err {
        CliError::Spec(SpecError::Invalid(report))
        | CliError::Generation(GenerationError::Spec(SpecError::Invalid(report))) => Some(report),
        _ => None,
    }
}

fn log_validation(report: &ValidationReport) {
    for issue in &report.errors {
        error!(code = %issue.code, path = %issue.path, "{}", issue.message);
    }
    for issue in &report.warnings {
        warn!(code = %issue.code, path = %issue.path, "{}", issue.message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_transactions_pipeline() {
        let cli = Cli::try_parse_from(["txseed"]).expect("parse");
        assert_eq!(cli.rows, None);
        assert_eq!(cli.csv, PathBuf::from("sample_data.csv"));
        assert_eq!(cli.table, "transactions");
        assert_eq!(cli.schema, "public");
        assert_eq!(IfExists::from(cli.if_exists), IfExists::Replace);
        assert_eq!(cli.preview, 5);
        assert_eq!(cli.log_format, LogFormat::Text);
        assert!(!cli.no_db);
    }

    #[test]
    fn parses_overrides() {
        let cli = Cli::try_parse_from([
            "txseed",
            "--rows",
            "10",
            "--seed",
            "42",
            "--if-exists",
            "append",
            "--no-db",
            "--log-format",
            "json",
        ])
        .expect("parse");
        assert_eq!(cli.rows, Some(10));
        assert_eq!(cli.seed, Some(42));
        assert_eq!(IfExists::from(cli.if_exists), IfExists::Append);
        assert!(cli.no_db);
        assert_eq!(cli.log_format, LogFormat::Json);
    }

    #[test]
    fn rejects_unknown_modes() {
        assert!(Cli::try_parse_from(["txseed", "--if-exists", "truncate"]).is_err());
    }
}
