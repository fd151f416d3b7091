//! Normalized field values and their binding to sqlx queries.

use crate::config::{FieldDescriptor, FieldKind};
use chrono::NaiveDate;
use serde_json::Value;
use sqlx::postgres::{PgArguments, Postgres};
use sqlx::query::Query;

/// A validated value, typed by its column kind. NULL remembers the kind so the store sees a typed NULL.
#[derive(Clone, Debug, PartialEq)]
pub enum SqlValue {
    Null(FieldKind),
    Text(String),
    Int(i64),
    Float(f64),
    Date(NaiveDate),
}

impl SqlValue {
    pub fn to_json(&self) -> Value {
        match self {
            SqlValue::Null(_) => Value::Null,
            SqlValue::Text(s) => Value::String(s.clone()),
            SqlValue::Int(n) => Value::Number((*n).into()),
            SqlValue::Float(f) => serde_json::Number::from_f64(*f).map(Value::Number).unwrap_or(Value::Null),
            SqlValue::Date(d) => Value::String(d.format("%Y-%m-%d").to_string()),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            SqlValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// Validated fields of one request body, in schema column order.
/// Keys are registry descriptors, so a field outside the registry cannot be represented.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FieldMap {
    entries: Vec<(&'static FieldDescriptor, SqlValue)>,
}

impl FieldMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: &'static FieldDescriptor, value: SqlValue) {
        match self.entries.iter_mut().find(|(f, _)| f.name == field.name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((field, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&SqlValue> {
        self.entries.iter().find(|(f, _)| f.name == name).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static FieldDescriptor, &SqlValue)> + '_ {
        self.entries.iter().map(|(f, v)| (*f, v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Bind every parameter in placeholder order.
pub fn bind_all<'q>(mut query: Query<'q, Postgres, PgArguments>, params: &'q [SqlValue]) -> Query<'q, Postgres, PgArguments> {
    for p in params {
        query = match p {
            SqlValue::Null(FieldKind::String) => query.bind(None::<String>),
            SqlValue::Null(FieldKind::Integer) => query.bind(None::<i64>),
            SqlValue::Null(FieldKind::Float) => query.bind(None::<f64>),
            SqlValue::Null(FieldKind::Date) => query.bind(None::<NaiveDate>),
            SqlValue::Text(s) => query.bind(s.as_str()),
            SqlValue::Int(n) => query.bind(*n),
            SqlValue::Float(f) => query.bind(*f),
            SqlValue::Date(d) => query.bind(*d),
        };
    }
    query
}
