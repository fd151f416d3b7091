//! Builds parameterized SELECT, INSERT, UPDATE and DELETE from the entity registry.
//! Identifiers come from the registry only; every value is a positional parameter.

use crate::config::{EntityKind, EntitySchema, FieldKind};
use crate::sql::{FieldMap, SqlValue};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatementKind {
    SelectAll,
    Insert,
    UpdateFull,
    UpdatePartial,
    Delete,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Statement {
    pub entity: EntityKind,
    pub kind: StatementKind,
    pub sql: String,
    /// Column each placeholder binds to, in placeholder order. For UPDATE and DELETE
    /// the last entry is the primary-key predicate.
    pub columns: Vec<&'static str>,
    pub params: Vec<SqlValue>,
}

impl Statement {
    fn new(schema: &EntitySchema, kind: StatementKind) -> Self {
        Statement {
            entity: schema.kind,
            kind,
            sql: String::new(),
            columns: Vec::new(),
            params: Vec::new(),
        }
    }

    /// Record a bound value and return its placeholder (`$n`).
    fn push_param(&mut self, column: &'static str, v: SqlValue) -> String {
        self.columns.push(column);
        self.params.push(v);
        format!("${}", self.params.len())
    }
}

/// Quote identifier for PostgreSQL (safe: only from the registry).
fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

/// SELECT list: every registry column, numerics cast so rows decode the same whatever the declared column type.
fn select_column_list(schema: &EntitySchema) -> String {
    schema
        .fields
        .iter()
        .map(|f| {
            let q = quoted(f.name);
            match f.kind {
                FieldKind::Integer => format!("{}::bigint AS {}", q, q),
                FieldKind::Float => format!("{}::double precision AS {}", q, q),
                FieldKind::String | FieldKind::Date => q,
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn select_all(schema: &EntitySchema) -> Statement {
    let mut q = Statement::new(schema, StatementKind::SelectAll);
    q.sql = format!(
        "SELECT {} FROM {} ORDER BY {}",
        select_column_list(schema),
        quoted(schema.table),
        quoted(schema.key().name)
    );
    q
}

/// INSERT every registry column in schema order; fields absent from the map insert NULL.
pub fn insert(schema: &EntitySchema, fields: &FieldMap) -> Statement {
    let mut q = Statement::new(schema, StatementKind::Insert);
    let mut cols = Vec::with_capacity(schema.fields.len());
    let mut placeholders = Vec::with_capacity(schema.fields.len());
    for f in schema.fields {
        let v = fields.get(f.name).cloned().unwrap_or(SqlValue::Null(f.kind));
        placeholders.push(q.push_param(f.name, v));
        cols.push(quoted(f.name));
    }
    q.sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quoted(schema.table),
        cols.join(", "),
        placeholders.join(", ")
    );
    q
}

/// UPDATE every non-key column in schema order.
pub fn update_full(schema: &EntitySchema, key: &str, fields: &FieldMap) -> Statement {
    let mut q = Statement::new(schema, StatementKind::UpdateFull);
    let mut sets = Vec::with_capacity(schema.mutable_fields().len());
    for f in schema.mutable_fields() {
        let v = fields.get(f.name).cloned().unwrap_or(SqlValue::Null(f.kind));
        let ph = q.push_param(f.name, v);
        sets.push(format!("{} = {}", quoted(f.name), ph));
    }
    finish_update(&mut q, schema, key, sets);
    q
}

/// UPDATE only the columns present in the map, in map order. An empty map
/// becomes a self-assignment of the key so the statement still reports matched rows.
pub fn update_partial(schema: &EntitySchema, key: &str, fields: &FieldMap) -> Statement {
    let mut q = Statement::new(schema, StatementKind::UpdatePartial);
    let mut sets = Vec::with_capacity(fields.len());
    for (f, v) in fields.iter() {
        if schema.is_key(f) {
            continue;
        }
        let ph = q.push_param(f.name, v.clone());
        sets.push(format!("{} = {}", quoted(f.name), ph));
    }
    if sets.is_empty() {
        let pk = quoted(schema.key().name);
        sets.push(format!("{} = {}", pk, pk));
    }
    finish_update(&mut q, schema, key, sets);
    q
}

fn finish_update(q: &mut Statement, schema: &EntitySchema, key: &str, sets: Vec<String>) {
    let pk = schema.key().name;
    let id_ph = q.push_param(pk, SqlValue::Text(key.to_string()));
    q.sql = format!(
        "UPDATE {} SET {} WHERE {} = {}",
        quoted(schema.table),
        sets.join(", "),
        quoted(pk),
        id_ph
    );
}

pub fn delete(schema: &EntitySchema, key: &str) -> Statement {
    let mut q = Statement::new(schema, StatementKind::Delete);
    let pk = schema.key().name;
    let id_ph = q.push_param(pk, SqlValue::Text(key.to_string()));
    q.sql = format!("DELETE FROM {} WHERE {} = {}", quoted(schema.table), quoted(pk), id_ph);
    q
}

/// Dispatch by statement kind. `key` is ignored for SELECT and INSERT.
pub fn build(schema: &EntitySchema, kind: StatementKind, fields: &FieldMap, key: &str) -> Statement {
    match kind {
        StatementKind::SelectAll => select_all(schema),
        StatementKind::Insert => insert(schema, fields),
        StatementKind::UpdateFull => update_full(schema, key, fields),
        StatementKind::UpdatePartial => update_partial(schema, key, fields),
        StatementKind::Delete => delete(schema, key),
    }
}
