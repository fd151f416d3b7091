//! Typed errors and HTTP mapping.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid {key}='{value}': {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Why validation rejected one field of a request body.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Violation {
    pub field: String,
    pub reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
}

impl Violation {
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Violation {
            field: field.into(),
            reason: reason.into(),
            value: None,
        }
    }

    pub fn with_value(mut self, value: &serde_json::Value) -> Self {
        self.value = Some(value.clone());
        self
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("validation failed: {} violation(s)", .0.len())]
    Validation(Vec<Violation>),
    /// Anything the store reported while acquiring a connection or running a statement.
    #[error("{0}")]
    Persistence(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("bad request: {0}")]
    BadRequest(String),
    /// Body could not be read as JSON; keeps the extractor's status (400, 413, 415, 422).
    #[error("{1}")]
    Body(StatusCode, String),
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Body(rejection.status(), rejection.body_text())
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::Database(db) => AppError::Persistence(db.message().to_string()),
            other => AppError::Persistence(other.to_string()),
        }
    }
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<Violation>>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Body(status, _) => *status,
        };
        let body = match self {
            AppError::Validation(violations) => ErrorBody {
                success: false,
                message: "validation failed".into(),
                errors: Some(violations),
            },
            other => ErrorBody {
                success: false,
                message: other.to_string(),
                errors: None,
            },
        };
        (status, Json(body)).into_response()
    }
}
