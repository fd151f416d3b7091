//! In-memory gateway: interprets built statements over per-table maps.
//!
//! Models the pool with a bounded semaphore so tests can observe connection
//! checkout, waiting and acquire timeouts without a running database.

use super::{Gateway, Outcome, Row};
use crate::config::EntityKind;
use crate::error::AppError;
use crate::sql::{SqlValue, Statement, StatementKind};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::{Semaphore, SemaphorePermit};

const POOL_TIMEOUT: &str = "pool timed out while waiting for an open connection";

type Table = BTreeMap<String, Row>;

pub struct MemoryGateway {
    tables: Mutex<HashMap<EntityKind, Table>>,
    permits: Semaphore,
    acquire_timeout: Duration,
    /// Simulated statement latency while a connection is held.
    hold: Duration,
    in_use: AtomicUsize,
    peak: AtomicUsize,
    statements: AtomicUsize,
    offline: AtomicBool,
}

impl Default for MemoryGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::with_capacity(5)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        MemoryGateway {
            tables: Mutex::new(HashMap::new()),
            permits: Semaphore::new(capacity),
            acquire_timeout: Duration::from_secs(30),
            hold: Duration::ZERO,
            in_use: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            statements: AtomicUsize::new(0),
            offline: AtomicBool::new(false),
        }
    }

    pub fn with_hold(mut self, hold: Duration) -> Self {
        self.hold = hold;
        self
    }

    pub fn with_acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    /// Make every statement and ping fail as if the store were unreachable.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Highest number of connections held at the same time so far.
    pub fn peak_connections(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    /// Number of statements that reached the store.
    pub fn statements_run(&self) -> usize {
        self.statements.load(Ordering::SeqCst)
    }

    /// Snapshot of a table in primary-key order.
    pub fn rows(&self, entity: EntityKind) -> Vec<Row> {
        self.lock().get(&entity).map(|t| t.values().cloned().collect()).unwrap_or_default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<EntityKind, Table>> {
        self.tables.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Number of connections currently checked out.
    pub fn connections_in_use(&self) -> usize {
        self.in_use.load(Ordering::SeqCst)
    }

    async fn checkout(&self) -> Result<Checkout<'_>, AppError> {
        let permit = tokio::time::timeout(self.acquire_timeout, self.permits.acquire())
            .await
            .map_err(|_| AppError::Persistence(POOL_TIMEOUT.into()))?
            .map_err(|_| AppError::Persistence("pool closed".into()))?;
        let held = self.in_use.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(held, Ordering::SeqCst);
        Ok(Checkout {
            _permit: permit,
            in_use: &self.in_use,
        })
    }

    fn check_online(&self) -> Result<(), AppError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(AppError::Persistence("connection refused".into()));
        }
        Ok(())
    }

    fn apply(&self, statement: &Statement) -> Result<Outcome, AppError> {
        let schema = statement.entity.schema();
        let mut tables = self.lock();
        let table = tables.entry(statement.entity).or_default();
        let bound = || statement.columns.iter().zip(&statement.params);
        match statement.kind {
            StatementKind::SelectAll => Ok(Outcome::Rows(table.values().cloned().collect())),
            StatementKind::Insert => {
                let mut row = Row::new();
                for f in schema.fields {
                    row.insert(f.name.to_string(), serde_json::Value::Null);
                }
                for (col, v) in bound() {
                    row.insert((*col).to_string(), v.to_json());
                }
                let key = statement
                    .params
                    .first()
                    .map(key_text)
                    .ok_or_else(|| AppError::Persistence("insert without key".into()))?;
                if table.contains_key(&key) {
                    return Err(AppError::Persistence(format!(
                        "duplicate key value violates unique constraint \"{}_pkey\"",
                        schema.table
                    )));
                }
                table.insert(key, row);
                Ok(Outcome::Affected { affected_rows: 1 })
            }
            StatementKind::UpdateFull | StatementKind::UpdatePartial => {
                let Some(key) = statement.params.last().map(key_text) else {
                    return Err(AppError::Persistence("update without key".into()));
                };
                let Some(row) = table.get_mut(&key) else {
                    return Ok(Outcome::Affected { affected_rows: 0 });
                };
                let assignments = statement.params.len() - 1;
                for (col, v) in bound().take(assignments) {
                    row.insert((*col).to_string(), v.to_json());
                }
                Ok(Outcome::Affected { affected_rows: 1 })
            }
            StatementKind::Delete => {
                let key = statement.params.first().map(key_text).unwrap_or_default();
                let affected_rows = u64::from(table.remove(&key).is_some());
                Ok(Outcome::Affected { affected_rows })
            }
        }
    }
}

/// One checked-out connection. Dropping it, including when the request is
/// cancelled mid-statement, returns the permit and the in-use count together.
struct Checkout<'a> {
    _permit: SemaphorePermit<'a>,
    in_use: &'a AtomicUsize,
}

impl Drop for Checkout<'_> {
    fn drop(&mut self) {
        self.in_use.fetch_sub(1, Ordering::SeqCst);
    }
}

fn key_text(v: &SqlValue) -> String {
    match v {
        SqlValue::Text(s) => s.clone(),
        other => other.to_json().to_string(),
    }
}

#[async_trait]
impl Gateway for MemoryGateway {
    async fn run(&self, statement: &Statement) -> Result<Outcome, AppError> {
        let conn = self.checkout().await?;
        if !self.hold.is_zero() {
            tokio::time::sleep(self.hold).await;
        }
        let result = self.check_online().and_then(|_| {
            self.statements.fetch_add(1, Ordering::SeqCst);
            self.apply(statement)
        });
        drop(conn);
        result
    }

    async fn ping(&self) -> Result<(), AppError> {
        self.check_online()
    }
}
