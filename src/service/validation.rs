//! Request validation against the entity registry.
//!
//! Every field is checked and every violation collected before returning, so a
//! caller sees all problems at once.

use crate::config::{EntitySchema, FieldDescriptor, FieldKind};
use crate::error::{AppError, Violation};
use crate::sql::{FieldMap, SqlValue};
use chrono::NaiveDate;
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::OnceLock;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValidationMode {
    /// Insert: required fields must be present and non-empty.
    Create,
    /// Full update: every non-key field must be present.
    Replace,
    /// Partial update: absent fields are left unchanged.
    Patch,
}

pub struct RequestValidator;

impl RequestValidator {
    /// Validate and normalize a request body. Returns fields in schema order.
    pub fn validate(
        schema: &EntitySchema,
        mode: ValidationMode,
        body: &Map<String, Value>,
    ) -> Result<FieldMap, AppError> {
        let mut fields = FieldMap::new();
        let mut violations = Vec::new();

        for field in schema.fields {
            let raw = body.get(field.name);
            if schema.is_key(field) && mode != ValidationMode::Create {
                if let Some(v) = raw {
                    violations.push(
                        Violation::new(field.name, format!("{} is the primary key and cannot be changed", field.name))
                            .with_value(v),
                    );
                }
                continue;
            }
            match raw {
                None => match mode {
                    ValidationMode::Create if field.required => violations.push(required(field)),
                    ValidationMode::Create => fields.insert(field, SqlValue::Null(field.kind)),
                    ValidationMode::Replace => violations.push(required(field)),
                    ValidationMode::Patch => {}
                },
                Some(Value::Null) if field.required => {
                    let v = if mode == ValidationMode::Patch {
                        Violation::new(field.name, format!("{} cannot be null", field.name))
                    } else {
                        required(field)
                    };
                    violations.push(v.with_value(&Value::Null));
                }
                Some(Value::Null) => fields.insert(field, SqlValue::Null(field.kind)),
                Some(v) => match normalize(field, v) {
                    Ok(SqlValue::Text(s)) if s.is_empty() && field.required && mode != ValidationMode::Patch => {
                        violations.push(required(field).with_value(v));
                    }
                    Ok(value) => fields.insert(field, value),
                    Err(reason) => violations.push(Violation::new(field.name, reason).with_value(v)),
                },
            }
        }

        for (name, v) in body {
            if schema.field(name).is_none() {
                violations.push(Violation::new(name.as_str(), "unknown field").with_value(v));
            }
        }

        if violations.is_empty() {
            Ok(fields)
        } else {
            tracing::debug!(entity = %schema.kind, violations = violations.len(), "request rejected");
            Err(AppError::Validation(violations))
        }
    }

    /// Normalize a primary key taken from the URL the same way stored keys were normalized.
    pub fn normalize_key(schema: &EntitySchema, raw: &str) -> Result<String, AppError> {
        let key = escape_markup(raw.trim());
        if key.is_empty() {
            return Err(AppError::Validation(vec![required(schema.key())]));
        }
        Ok(key)
    }
}

fn required(field: &FieldDescriptor) -> Violation {
    Violation::new(field.name, format!("{} is required", field.name))
}

fn normalize(field: &FieldDescriptor, v: &Value) -> Result<SqlValue, String> {
    match field.kind {
        FieldKind::String => {
            let s = match v {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                _ => return Err(format!("{} must be a string", field.name)),
            };
            Ok(SqlValue::Text(escape_markup(s.trim())))
        }
        FieldKind::Float => parse_float(v)
            .map(SqlValue::Float)
            .ok_or_else(|| format!("{} must be a number", field.name)),
        FieldKind::Integer => parse_integer(v)
            .map(SqlValue::Int)
            .ok_or_else(|| format!("{} must be an integer", field.name)),
        FieldKind::Date => parse_date(v)
            .map(SqlValue::Date)
            .ok_or_else(|| format!("{} must be a valid date", field.name)),
    }
}

fn parse_float(v: &Value) -> Option<f64> {
    let f = match v {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    f.is_finite().then_some(f)
}

/// Integral values are accepted in either JSON form, so `2`, `2.0` and `"2.0"` all give 2.
fn parse_integer(v: &Value) -> Option<i64> {
    match v {
        Value::Number(n) => n.as_i64().or_else(|| integral(n.as_f64()?)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>().ok().or_else(|| integral(s.parse::<f64>().ok()?))
        }
        _ => None,
    }
}

/// `i64::MAX as f64` rounds up to 2^63, which is out of range, hence the strict upper bound.
fn integral(f: f64) -> Option<i64> {
    (f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64).then_some(f as i64)
}

fn iso_date() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("static date pattern"))
}

fn parse_date(v: &Value) -> Option<NaiveDate> {
    let s = v.as_str()?.trim();
    if !iso_date().is_match(s) {
        return None;
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

/// Replace markup-significant characters with HTML entities.
pub fn escape_markup(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            '/' => out.push_str("&#x2F;"),
            '\\' => out.push_str("&#x5C;"),
            '`' => out.push_str("&#96;"),
            _ => out.push(c),
        }
    }
    out
}
