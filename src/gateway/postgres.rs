//! PostgreSQL gateway over a bounded `PgPool`.

use super::{Gateway, Outcome, Row};
use crate::config::{EntitySchema, FieldKind};
use crate::error::AppError;
use crate::sql::{bind_all, Statement, StatementKind};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::Value;
use sqlx::pool::PoolConnection;
use sqlx::postgres::{PgPool, PgRow, Postgres};
use sqlx::Row as _;

#[derive(Clone)]
pub struct PgGateway {
    pool: PgPool,
}

impl PgGateway {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn execute_on(conn: &mut PoolConnection<Postgres>, statement: &Statement) -> Result<Outcome, AppError> {
        tracing::debug!(sql = %statement.sql, params = ?statement.params, "query");
        let query = bind_all(sqlx::query(&statement.sql), &statement.params);
        match statement.kind {
            StatementKind::SelectAll => {
                let schema = statement.entity.schema();
                let rows = query.fetch_all(&mut **conn).await?;
                let rows = rows.iter().map(|r| row_to_json(schema, r)).collect::<Result<Vec<_>, _>>()?;
                Ok(Outcome::Rows(rows))
            }
            StatementKind::Insert
            | StatementKind::UpdateFull
            | StatementKind::UpdatePartial
            | StatementKind::Delete => {
                let done = query.execute(&mut **conn).await?;
                Ok(Outcome::Affected {
                    affected_rows: done.rows_affected(),
                })
            }
        }
    }
}

#[async_trait]
impl Gateway for PgGateway {
    async fn run(&self, statement: &Statement) -> Result<Outcome, AppError> {
        let mut conn = self.pool.acquire().await.map_err(|e| {
            tracing::warn!(error = %e, "connection acquire failed");
            AppError::from(e)
        })?;
        let result = Self::execute_on(&mut conn, statement).await;
        drop(conn);
        if let Err(e) = &result {
            tracing::warn!(entity = %statement.entity, error = %e, "statement failed");
        }
        result
    }

    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// Decode one row by the registry's column kinds.
fn row_to_json(schema: &EntitySchema, row: &PgRow) -> Result<Row, sqlx::Error> {
    let mut map = Row::new();
    for f in schema.fields {
        let v = match f.kind {
            FieldKind::String => row.try_get::<Option<String>, _>(f.name)?.map(Value::String),
            FieldKind::Integer => row.try_get::<Option<i64>, _>(f.name)?.map(|n| Value::Number(n.into())),
            FieldKind::Float => row
                .try_get::<Option<f64>, _>(f.name)?
                .and_then(serde_json::Number::from_f64)
                .map(Value::Number),
            FieldKind::Date => row
                .try_get::<Option<NaiveDate>, _>(f.name)?
                .map(|d| Value::String(d.format("%Y-%m-%d").to_string())),
        };
        map.insert(f.name.to_string(), v.unwrap_or(Value::Null));
    }
    Ok(map)
}
