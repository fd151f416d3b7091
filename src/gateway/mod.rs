//! Persistence gateway: runs exactly one statement on one pooled connection.
//!
//! The connection is released on every exit path before the outcome is returned.
//! Store failures of any kind surface as [`AppError::Persistence`].

mod memory;
mod postgres;

pub use memory::MemoryGateway;
pub use postgres::PgGateway;

use crate::error::AppError;
use crate::sql::Statement;
use async_trait::async_trait;

/// One result row: column name to JSON value, in registry column order.
pub type Row = serde_json::Map<String, serde_json::Value>;

#[derive(Clone, Debug, PartialEq)]
pub enum Outcome {
    Rows(Vec<Row>),
    Affected { affected_rows: u64 },
}

#[async_trait]
pub trait Gateway: Send + Sync {
    async fn run(&self, statement: &Statement) -> Result<Outcome, AppError>;

    /// Cheap round trip used by readiness checks.
    async fn ping(&self) -> Result<(), AppError>;
}
