//! Standard response envelope helpers.

use axum::{http::StatusCode, Json};
use serde::Serialize;

#[derive(Serialize)]
pub struct Envelope<T> {
    pub success: bool,
    pub message: String,
    pub result: T,
}

/// What a mutation did: rows touched and the primary key it targeted.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationResult {
    pub affected_rows: u64,
    pub key: String,
}

pub fn success<T: Serialize>(message: impl Into<String>, result: T) -> (StatusCode, Json<Envelope<T>>) {
    (
        StatusCode::OK,
        Json(Envelope {
            success: true,
            message: message.into(),
            result,
        }),
    )
}
