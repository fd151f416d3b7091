//! Per-entity CRUD: validate, build one statement, run it through the gateway.

use crate::config::EntitySchema;
use crate::error::AppError;
use crate::gateway::{Gateway, Outcome, Row};
use crate::response::MutationResult;
use crate::service::{RequestValidator, ValidationMode};
use crate::sql::{delete, insert, select_all, update_full, update_partial, Statement};
use serde_json::{Map, Value};

pub struct CrudService;

impl CrudService {
    /// Every row of the entity's table, ordered by primary key.
    pub async fn list(gateway: &dyn Gateway, schema: &EntitySchema) -> Result<Vec<Row>, AppError> {
        match gateway.run(&select_all(schema)).await? {
            Outcome::Rows(rows) => Ok(rows),
            Outcome::Affected { .. } => Err(AppError::Persistence(format!(
                "unexpected outcome: {} select reported affected rows",
                schema.kind
            ))),
        }
    }

    pub async fn create(
        gateway: &dyn Gateway,
        schema: &EntitySchema,
        body: &Map<String, Value>,
    ) -> Result<MutationResult, AppError> {
        let fields = RequestValidator::validate(schema, ValidationMode::Create, body)?;
        let key = fields
            .get(schema.key().name)
            .and_then(|v| v.as_text())
            .unwrap_or_default()
            .to_string();
        Self::mutate(gateway, &insert(schema, &fields), key).await
    }

    /// Full update: every mutable column is overwritten.
    pub async fn replace(
        gateway: &dyn Gateway,
        schema: &EntitySchema,
        key: &str,
        body: &Map<String, Value>,
    ) -> Result<MutationResult, AppError> {
        let key = RequestValidator::normalize_key(schema, key)?;
        let fields = RequestValidator::validate(schema, ValidationMode::Replace, body)?;
        Self::mutate(gateway, &update_full(schema, &key, &fields), key).await
    }

    /// Partial update: only the fields present in the body change.
    pub async fn patch(
        gateway: &dyn Gateway,
        schema: &EntitySchema,
        key: &str,
        body: &Map<String, Value>,
    ) -> Result<MutationResult, AppError> {
        let key = RequestValidator::normalize_key(schema, key)?;
        let fields = RequestValidator::validate(schema, ValidationMode::Patch, body)?;
        Self::mutate(gateway, &update_partial(schema, &key, &fields), key).await
    }

    /// Deleting a missing key succeeds with zero affected rows.
    pub async fn delete(gateway: &dyn Gateway, schema: &EntitySchema, key: &str) -> Result<MutationResult, AppError> {
        let key = RequestValidator::normalize_key(schema, key)?;
        Self::mutate(gateway, &delete(schema, &key), key).await
    }

    async fn mutate(gateway: &dyn Gateway, statement: &Statement, key: String) -> Result<MutationResult, AppError> {
        let affected_rows = match gateway.run(statement).await? {
            Outcome::Affected { affected_rows } => affected_rows,
            Outcome::Rows(_) => {
                return Err(AppError::Persistence(format!(
                    "unexpected outcome: {} mutation returned rows",
                    statement.entity
                )))
            }
        };
        Ok(MutationResult { affected_rows, key })
    }
}
