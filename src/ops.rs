//! Store operations behind `list`, `get`, `set`, `unset` and `sync`, and the
//! `StoreResult` enum callers use to display outcomes.

use std::fmt;

use toml::Value;

use crate::error::StoreError;
use crate::keypath;
use crate::store::Store;
use crate::types::StoreAction;

/// Result of a store operation. Returned to the caller for display.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreResult {
    /// A key's current value.
    KeyValue { key: String, value: String },
    /// Confirmation that a value was saved.
    ValueSet { key: String, value: String },
    /// Confirmation that a value was removed.
    ValueUnset { key: String },
    /// Every leaf of the document as dotted key-value pairs.
    Listing { entries: Vec<(String, String)> },
    /// Outcome of a sync.
    Synced { changed: bool },
}

impl fmt::Display for StoreResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreResult::KeyValue { key, value } => write!(f, "{key} = {value}"),
            StoreResult::ValueSet { key, value } => write!(f, "Set {key} = {value}"),
            StoreResult::ValueUnset { key } => write!(f, "Unset {key}"),
            StoreResult::Listing { entries } => {
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        writeln!(f)?;
                    }
                    write!(f, "{key} = {value}")?;
                }
                Ok(())
            }
            StoreResult::Synced { changed: true } => write!(f, "Picked up external changes"),
            StoreResult::Synced { changed: false } => write!(f, "Already up to date"),
        }
    }
}

pub(crate) fn handle(store: &mut Store, action: &StoreAction) -> Result<StoreResult, StoreError> {
    match action {
        StoreAction::List => Ok(list_values(store)),
        StoreAction::Get { key } => get_value(store, key),
        StoreAction::Set { key, value } => {
            let parsed = parse_value(value);

            // Validation fills defaults in place, so try it on a copy first.
            let segments = keypath::parse(key)?;
            let mut candidate = store.document().clone();
            keypath::set(&mut candidate, &segments, parsed.clone())?;
            store.schema().validate(&mut candidate)?;

            let previous = store.set(key, parsed)?;
            if let Err(e) = store.save() {
                match previous {
                    Some(old) => {
                        store.set(key, old)?;
                    }
                    None => {
                        store.remove(key);
                    }
                }
                return Err(e);
            }
            // Report what validation made of it.
            let stored = store.get(key).map_or_else(|| value.clone(), format_value);
            Ok(StoreResult::ValueSet {
                key: key.clone(),
                value: stored,
            })
        }
        StoreAction::Unset { key } => {
            keypath::parse(key)?;
            store.remove(key);
            store.save()?;
            Ok(StoreResult::ValueUnset { key: key.clone() })
        }
        StoreAction::Sync => Ok(StoreResult::Synced {
            changed: store.sync()?,
        }),
    }
}

fn get_value(store: &Store, key: &str) -> Result<StoreResult, StoreError> {
    let segments = keypath::parse(key)?;
    let value = keypath::get(store.document(), &segments)
        .ok_or_else(|| StoreError::KeyNotFound(key.into()))?;
    Ok(StoreResult::KeyValue {
        key: key.into(),
        value: format_value(value),
    })
}

fn list_values(store: &Store) -> StoreResult {
    let entries = keypath::leaves(store.document())
        .into_iter()
        .map(|(key, value)| (key, format_value(value)))
        .collect();
    StoreResult::Listing { entries }
}

/// Interpret a command-line string as the most specific TOML scalar it spells.
fn parse_value(s: &str) -> Value {
    if s.eq_ignore_ascii_case("true") {
        return Value::Boolean(true);
    }
    if s.eq_ignore_ascii_case("false") {
        return Value::Boolean(false);
    }
    if let Ok(i) = s.parse::<i64>() {
        return Value::Integer(i);
    }
    if s.contains('.')
        && let Ok(f) = s.parse::<f64>()
    {
        return Value::Float(f);
    }
    Value::String(s.to_string())
}

/// Format a TOML value for display.
pub fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Integer(i) => i.to_string(),
        Value::Float(f) => f.to_string(),
        Value::Boolean(b) => b.to_string(),
        Value::Array(_) | Value::Datetime(_) => value.to_string(),
        Value::Table(t) => toml::to_string(t).unwrap_or_else(|_| format!("{t:?}")),
    }
}
