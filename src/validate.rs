//! Schema validation: fill defaults, coerce parseable values, reject the rest.
//!
//! Walks the schema and the document side by side. For each declared field:
//!
//! - missing with a default: the default is copied in;
//! - missing without a default: a failure if the field is required;
//! - present: the value is checked against the field's kind and, if it only
//!   parses as that kind (`"42"` for an integer), replaced by the parsed value.
//!
//! Declared sections are created when missing. A section's wildcard schema is
//! applied to every sub-section the section does not declare by name. Keys the
//! schema does not mention are left alone.
//!
//! Every failure is collected so one pass reports them all. On failure the
//! document may already hold some filled defaults; callers validate a copy
//! when that matters.

use toml::{Table, Value};

use crate::error::{ValidationError, ValidationFailure};
use crate::keypath;
use crate::schema::{Entry, Section, ValueKind};

pub fn validate(schema: &Section, document: &mut Table) -> Result<(), ValidationError> {
    let mut failures = Vec::new();
    validate_section(schema, document, &mut Vec::new(), &mut failures);
    if failures.is_empty() {
        Ok(())
    } else {
        Err(ValidationError { failures })
    }
}

fn validate_section(
    schema: &Section,
    table: &mut Table,
    path: &mut Vec<String>,
    failures: &mut Vec<ValidationFailure>,
) {
    for (name, entry) in schema.entries() {
        path.push(name.to_string());
        match entry {
            Entry::Field(field) => match table.get_mut(name) {
                Some(value) => match coerce(field.kind, value) {
                    Ok(Some(coerced)) => *value = coerced,
                    Ok(None) => {}
                    Err(reason) => failures.push(failure(path, reason)),
                },
                None => match &field.default {
                    Some(default) => {
                        table.insert(name.to_string(), default.clone());
                    }
                    None if field.required => {
                        failures.push(failure(path, "required value is missing".into()));
                    }
                    None => {}
                },
            },
            Entry::Section(sub) => {
                let value = table
                    .entry(name)
                    .or_insert_with(|| Value::Table(Table::new()));
                match value {
                    Value::Table(nested) => validate_section(sub, nested, path, failures),
                    other => failures.push(failure(
                        path,
                        format!("expected a section, found {}", describe(other)),
                    )),
                }
            }
        }
        path.pop();
    }

    let Some(wildcard) = schema.wildcard() else {
        return;
    };
    for (name, value) in table.iter_mut() {
        if schema.get(name).is_some() {
            continue;
        }
        path.push(name.clone());
        match value {
            Value::Table(record) => validate_section(wildcard, record, path, failures),
            other => failures.push(failure(
                path,
                format!("expected a section, found {}", describe(other)),
            )),
        }
        path.pop();
    }
}

fn failure(path: &[String], reason: String) -> ValidationFailure {
    ValidationFailure {
        key: keypath::join(path),
        reason,
    }
}

/// Check `value` against `kind`.
///
/// Returns `Ok(None)` when the value already has the right kind,
/// `Ok(Some(converted))` when it parses as that kind, and a reason otherwise.
pub fn coerce(kind: ValueKind, value: &Value) -> Result<Option<Value>, String> {
    let converted = match (kind, value) {
        (ValueKind::String, Value::String(_))
        | (ValueKind::Integer, Value::Integer(_))
        | (ValueKind::Float, Value::Float(_))
        | (ValueKind::Boolean, Value::Boolean(_))
        | (ValueKind::List, Value::Array(_)) => return Ok(None),

        (ValueKind::Integer, Value::String(s)) => s.trim().parse::<i64>().ok().map(Value::Integer),
        (ValueKind::Float, Value::Integer(i)) => Some(Value::Float(*i as f64)),
        (ValueKind::Float, Value::String(s)) => s.trim().parse::<f64>().ok().map(Value::Float),
        (ValueKind::Boolean, Value::String(s)) => parse_bool(s).map(Value::Boolean),
        // A lone value stands for a one-element list.
        (ValueKind::List, Value::Table(_)) => None,
        (ValueKind::List, scalar) => Some(Value::Array(vec![scalar.clone()])),
        _ => None,
    };
    converted
        .map(Some)
        .ok_or_else(|| format!("expected {kind}, found {}", describe(value)))
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}

fn describe(value: &Value) -> String {
    match value {
        Value::String(s) => format!("string {s:?}"),
        Value::Integer(i) => format!("integer {i}"),
        Value::Float(f) => format!("float {f}"),
        Value::Boolean(b) => format!("boolean {b}"),
        other => other.type_str().to_string(),
    }
}
