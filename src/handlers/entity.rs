//! Entity CRUD handlers: list, create, replace, patch, delete.

use crate::config::{EntityKind, EntitySchema};
use crate::error::AppError;
use crate::response::success;
use crate::service::CrudService;
use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    response::IntoResponse,
    Json,
};
use serde_json::{Map, Value};

fn entity_by_path(segment: &str) -> Result<&'static EntitySchema, AppError> {
    EntityKind::from_path(segment)
        .map(EntityKind::schema)
        .ok_or_else(|| AppError::NotFound(segment.to_string()))
}

fn body_to_map(body: Result<Json<Value>, JsonRejection>) -> Result<Map<String, Value>, AppError> {
    let Json(value) = body?;
    match value {
        Value::Object(m) => Ok(m),
        _ => Err(AppError::BadRequest("body must be a JSON object".into())),
    }
}

pub async fn list(
    State(state): State<AppState>,
    Path(path_segment): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let schema = entity_by_path(&path_segment)?;
    let rows = CrudService::list(state.gateway.as_ref(), schema).await?;
    Ok(Json(rows))
}

pub async fn create(
    State(state): State<AppState>,
    Path(path_segment): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let schema = entity_by_path(&path_segment)?;
    let body = body_to_map(body)?;
    let result = CrudService::create(state.gateway.as_ref(), schema, &body).await?;
    Ok(success(format!("{} added", schema.label), result))
}

pub async fn replace(
    State(state): State<AppState>,
    Path((path_segment, key)): Path<(String, String)>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let schema = entity_by_path(&path_segment)?;
    let body = body_to_map(body)?;
    let result = CrudService::replace(state.gateway.as_ref(), schema, &key, &body).await?;
    Ok(success(format!("{} fully updated", schema.label), result))
}

pub async fn patch(
    State(state): State<AppState>,
    Path((path_segment, key)): Path<(String, String)>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let schema = entity_by_path(&path_segment)?;
    let body = body_to_map(body)?;
    let result = CrudService::patch(state.gateway.as_ref(), schema, &key, &body).await?;
    Ok(success(format!("{} updated", schema.label), result))
}

pub async fn delete(
    State(state): State<AppState>,
    Path((path_segment, key)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let schema = entity_by_path(&path_segment)?;
    let result = CrudService::delete(state.gateway.as_ref(), schema, &key).await?;
    Ok(success(format!("{} deleted", schema.label), result))
}
