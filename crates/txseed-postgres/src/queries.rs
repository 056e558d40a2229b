use sqlx::{PgConnection, QueryBuilder, Postgres};

use crate::errors::Result;
use crate::mapping::SqlCell;

/// Postgres caps bind parameters per statement at `u16::MAX`.
pub const MAX_BIND_PARAMS: usize = u16::MAX as usize;

pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

pub fn qualified_name(schema: &str, table: &str) -> String {
    format!("{}.{}", quote_ident(schema), quote_ident(table))
}

pub async fn schema_exists(conn: &mut PgConnection, schema: &str) -> Result<bool> {
    let exists = sqlx::query_scalar::<_, bool>(
        "select exists(select 1 from pg_namespace where nspname = $1)",
    )
    .bind(schema)
    .fetch_one(conn)
    .await?;
    Ok(exists)
}

pub async fn table_exists(conn: &mut PgConnection, schema: &str, table: &str) -> Result<bool> {
    let exists = sqlx::query_scalar::<_, bool>(
        r#"
        select exists(
          select 1
          from information_schema.tables
          where table_schema = $1 and table_name = $2
        )
        "#,
    )
    .bind(schema)
    .bind(table)
    .fetch_one(conn)
    .await?;
    Ok(exists)
}

pub struct RawColumn {
    pub name: String,
    pub udt_name: String,
}

pub async fn list_columns(
    conn: &mut PgConnection,
    schema: &str,
    table: &str,
) -> Result<Vec<RawColumn>> {
    let rows = sqlx::query_as::<_, (String, String)>(
        r#"
        select column_name::text, udt_name::text
        from information_schema.columns
        where table_schema = $1 and table_name = $2
        order by ordinal_position
        "#,
    )
    .bind(schema)
    .bind(table)
    .fetch_all(conn)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(name, udt_name)| RawColumn { name, udt_name })
        .collect())
}

pub async fn drop_table(conn: &mut PgConnection, qualified: &str) -> Result<()> {
    sqlx::query(&format!("drop table if exists {qualified}"))
        .execute(conn)
        .await?;
    Ok(())
}

/// `columns` holds `(name, ddl type, nullable)`.
pub async fn create_table(
    conn: &mut PgConnection,
    qualified: &str,
    columns: &[(String, String, bool)],
) -> Result<()> {
    let definitions: Vec<String> = columns
        .iter()
        .map(|(name, ddl, nullable)| {
            let constraint = if *nullable { "" } else { " not null" };
            format!("{} {ddl}{constraint}", quote_ident(name))
        })
        .collect();
    let sql = format!("create table {qualified} ({})", definitions.join(", "));
    sqlx::query(&sql).execute(conn).await?;
    Ok(())
}

/// Insert one batch of rows with a single multi-row `INSERT`.
pub async fn insert_rows(
    conn: &mut PgConnection,
    qualified: &str,
    columns: &[String],
    rows: Vec<Vec<SqlCell>>,
) -> Result<u64> {
    if rows.is_empty() {
        return Ok(0);
    }
    let names: Vec<String> = columns.iter().map(|name| quote_ident(name)).collect();
    let mut builder: QueryBuilder<'_, Postgres> =
        QueryBuilder::new(format!("insert into {qualified} ({}) ", names.join(", ")));
    builder.push_values(rows, |mut row, cells| {
        for cell in cells {
            cell.bind(&mut row);
        }
    });
    let result = builder.build().execute(conn).await?;
    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quotes_identifiers() {
        assert_eq!(quote_ident("transactions"), "\"transactions\"");
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
        assert_eq!(
            qualified_name("public", "Transactions"),
            "\"public\".\"Transactions\""
        );
    }
}
