use anyhow::{Context, Result};
use sqlx::{Connection, PgConnection};
use txseed_generate::{GenerateOptions, GenerationEngine};
use txseed_postgres::{IfExists, PostgresConfig, PostgresConnector, PostgresError, load_dotenv};
use txseed_spec::transactions_spec;

/// Connection settings from `.env` or the environment; `None` skips the test.
fn config() -> Option<PostgresConfig> {
    load_dotenv();
    match PostgresConfig::from_env() {
        Ok(config) => Some(config),
        Err(err) => {
            eprintln!("skipping postgres integration test: {err}");
            None
        }
    }
}

async fn count_rows(config: &PostgresConfig, table: &str) -> Result<i64> {
    let mut conn = PgConnection::connect_with(&config.connect_options()?)
        .await
        .context("connecting to Postgres")?;
    let count = sqlx::query_scalar::<_, i64>(&format!("select count(*) from public.\"{table}\""))
        .fetch_one(&mut conn)
        .await
        .with_context(|| format!("counting rows of {table}"))?;
    conn.close().await?;
    Ok(count)
}

#[tokio::test]
async fn replace_append_and_fail_modes() -> Result<()> {
    let Some(config) = config() else {
        return Ok(());
    };
    let frame = GenerationEngine::new(GenerateOptions {
        seed: Some(7),
        strict: true,
    })
    .run(&transactions_spec(100))?
    .frame;
    let table = format!("txseed_it_{}", std::process::id());
    let connector = PostgresConnector::new(config.clone());

    let summary = connector
        .write_frame(&frame, &table, None, IfExists::Replace)
        .await?;
    assert_eq!(summary.rows_written, 100);
    assert!(summary.created);
    assert_eq!(count_rows(&config, &table).await?, 100);

    let summary = connector
        .write_frame(&frame, &table, Some("public"), IfExists::Append)
        .await?;
    assert!(!summary.created);
    assert_eq!(count_rows(&config, &table).await?, 200);

    let err = connector
        .write_frame(&frame, &table, None, IfExists::Fail)
        .await
        .expect_err("table exists");
    assert!(matches!(err, PostgresError::TableExists(_)));

    connector
        .write_frame(&frame, &table, None, IfExists::Replace)
        .await?;
    assert_eq!(count_rows(&config, &table).await?, 100);

    let mut conn = connector.connect().await?;
    sqlx::query(&format!("drop table public.\"{table}\""))
        .execute(&mut conn)
        .await?;
    conn.close().await?;
    Ok(())
}

#[tokio::test]
async fn missing_schema_is_reported() -> Result<()> {
    let Some(config) = config() else {
        return Ok(());
    };
    let frame = GenerationEngine::new(GenerateOptions {
        seed: Some(1),
        strict: false,
    })
    .run(&transactions_spec(3))?
    .frame;

    let err = PostgresConnector::new(config)
        .write_frame(&frame, "transactions", Some("txseed_no_such_schema"), IfExists::Replace)
        .await
        .expect_err("schema missing");
    assert!(matches!(err, PostgresError::SchemaNotFound(name) if name == "txseed_no_such_schema"));
    Ok(())
}
