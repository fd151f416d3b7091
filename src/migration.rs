//! Create the database and entity tables from the registry when missing.

use crate::config::{EntityKind, EntitySchema};
use crate::error::AppError;
use sqlx::postgres::PgConnectOptions;
use sqlx::{ConnectOptions, PgPool};

fn quote(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

/// `CREATE TABLE IF NOT EXISTS` for one entity: key column first, required columns NOT NULL.
pub fn table_ddl(schema: &EntitySchema) -> String {
    let columns: Vec<String> = schema
        .fields
        .iter()
        .map(|f| {
            let constraint = if schema.is_key(f) {
                " NOT NULL PRIMARY KEY"
            } else if f.required {
                " NOT NULL"
            } else {
                ""
            };
            format!("{} {}{}", quote(f.name), f.kind.pg_type(), constraint)
        })
        .collect();
    format!(
        "CREATE TABLE IF NOT EXISTS {} ({})",
        quote(schema.table),
        columns.join(", ")
    )
}

/// Idempotent: existing tables are left untouched.
pub async fn ensure_tables(pool: &PgPool) -> Result<(), AppError> {
    for kind in EntityKind::ALL {
        let ddl = table_ddl(kind.schema());
        tracing::debug!(sql = %ddl, "migrate");
        sqlx::query(&ddl).execute(pool).await?;
    }
    tracing::info!("entity tables ready");
    Ok(())
}

/// Connect to the `postgres` maintenance database and create the target database if missing.
pub async fn ensure_database_exists(opts: &PgConnectOptions) -> Result<(), AppError> {
    let db_name = match opts.get_database() {
        Some(name) if !name.is_empty() && name != "postgres" => name.to_string(),
        _ => return Ok(()),
    };
    let mut conn = opts.clone().database("postgres").connect().await?;
    let exists: (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM pg_database WHERE datname = $1)")
        .bind(&db_name)
        .fetch_one(&mut conn)
        .await?;
    if !exists.0 {
        tracing::info!(database = %db_name, "creating database");
        sqlx::query(&format!("CREATE DATABASE {}", quote(&db_name)))
            .execute(&mut conn)
            .await?;
    }
    Ok(())
}
