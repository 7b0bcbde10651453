//! Key paths into a document.
//!
//! Paths use TOML dotted-key syntax, so a segment that itself contains dots
//! (a record keyed by a file name, say) is written quoted:
//! `keypairdb."/home/me/id.key".fingerprint`.

use toml::{Table, Value};

use crate::error::StoreError;

/// Split a dotted key expression into its segments.
pub fn parse(key: &str) -> Result<Vec<String>, StoreError> {
    let keys = toml_edit::Key::parse(key).map_err(|e| StoreError::InvalidKey {
        key: key.into(),
        reason: e.to_string().trim().to_string(),
    })?;
    Ok(keys.iter().map(|k| k.get().to_string()).collect())
}

/// Join segments back into a dotted key, quoting where TOML requires it.
pub fn join<S: AsRef<str>>(segments: &[S]) -> String {
    segments
        .iter()
        .map(|s| toml_edit::Key::new(s.as_ref()).display_repr().into_owned())
        .collect::<Vec<_>>()
        .join(".")
}

/// Navigate a table by path segments.
pub fn get<'a, S: AsRef<str>>(table: &'a Table, segments: &[S]) -> Option<&'a Value> {
    let (leaf, parents) = segments.split_last()?;
    let mut current = table;
    for segment in parents {
        current = current.get(segment.as_ref())?.as_table()?;
    }
    current.get(leaf.as_ref())
}

/// Set a value, creating intermediate tables as needed.
///
/// Fails if an intermediate segment already holds something other than a
/// table; the document is left unchanged in that case.
pub fn set<S: AsRef<str>>(
    table: &mut Table,
    segments: &[S],
    value: Value,
) -> Result<Option<Value>, StoreError> {
    let Some((leaf, parents)) = segments.split_last() else {
        return Err(StoreError::InvalidKey {
            key: String::new(),
            reason: "empty key".into(),
        });
    };

    let mut current = table;
    for (i, segment) in parents.iter().enumerate() {
        let entry = current
            .entry(segment.as_ref())
            .or_insert_with(|| Value::Table(Table::new()));
        current = match entry {
            Value::Table(t) => t,
            _ => {
                return Err(StoreError::InvalidKey {
                    key: join(segments),
                    reason: format!("'{}' is not a section", join(&segments[..=i])),
                });
            }
        };
    }

    Ok(current.insert(leaf.as_ref().to_string(), value))
}

/// Remove a value, returning it. Missing paths are not an error.
pub fn remove<S: AsRef<str>>(table: &mut Table, segments: &[S]) -> Option<Value> {
    let (leaf, parents) = segments.split_last()?;
    let mut current = table;
    for segment in parents {
        current = current.get_mut(segment.as_ref())?.as_table_mut()?;
    }
    current.remove(leaf.as_ref())
}

/// Flatten a table into `(dotted_key, value)` leaf pairs, depth first.
/// Empty sections produce no entries.
pub fn leaves(table: &Table) -> Vec<(String, &Value)> {
    let mut out = Vec::new();
    collect_leaves(table, &mut Vec::new(), &mut out);
    out
}

fn collect_leaves<'a>(
    table: &'a Table,
    prefix: &mut Vec<&'a str>,
    out: &mut Vec<(String, &'a Value)>,
) {
    for (key, value) in table {
        prefix.push(key);
        match value {
            Value::Table(nested) => collect_leaves(nested, prefix, out),
            leaf => out.push((join(prefix.as_slice()), leaf)),
        }
        prefix.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(toml_str: &str) -> Table {
        toml_str.parse::<Table>().unwrap()
    }

    #[test]
    fn parse_plain_dotted() {
        assert_eq!(parse("ui.locale").unwrap(), vec!["ui", "locale"]);
    }

    #[test]
    fn parse_quoted_segment_keeps_dots() {
        let segments = parse(r#"keypairdb."/home/me/id.key".name"#).unwrap();
        assert_eq!(segments, vec!["keypairdb", "/home/me/id.key", "name"]);
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(matches!(
            parse("ui..locale"),
            Err(StoreError::InvalidKey { .. })
        ));
    }

    #[test]
    fn join_quotes_when_needed() {
        assert_eq!(join(&["ui", "locale"]), "ui.locale");
        let joined = join(&["keypairdb", "/home/me/id.key"]);
        assert_ne!(joined, "keypairdb./home/me/id.key");
        assert_eq!(parse(&joined).unwrap(), vec!["keypairdb", "/home/me/id.key"]);
    }

    #[test]
    fn get_flat_and_nested() {
        let t = table("port = 1\n[db]\nurl = \"x\"\n");
        assert_eq!(get(&t, &["port"]).and_then(Value::as_integer), Some(1));
        assert_eq!(get(&t, &["db", "url"]).and_then(Value::as_str), Some("x"));
        assert!(get(&t, &["db", "nope"]).is_none());
        assert!(get(&t, &["port", "deeper"]).is_none());
    }

    #[test]
    fn set_creates_intermediate_tables() {
        let mut t = Table::new();
        set(&mut t, &["a", "b", "c"], Value::Integer(42)).unwrap();
        assert_eq!(t["a"]["b"]["c"].as_integer(), Some(42));
    }

    #[test]
    fn set_returns_previous_value() {
        let mut t = table("port = 1");
        let old = set(&mut t, &["port"], Value::Integer(2)).unwrap();
        assert_eq!(old, Some(Value::Integer(1)));
    }

    #[test]
    fn set_through_scalar_fails() {
        let mut t = table("port = 1");
        let err = set(&mut t, &["port", "inner"], Value::Integer(2)).unwrap_err();
        match err {
            StoreError::InvalidKey { key, reason } => {
                assert_eq!(key, "port.inner");
                assert!(reason.contains("'port'"));
            }
            other => panic!("Expected InvalidKey, got {other:?}"),
        }
        assert_eq!(t, table("port = 1"));
    }

    #[test]
    fn remove_nested() {
        let mut t = table("[db]\nurl = \"x\"\npool = 5\n");
        assert_eq!(remove(&mut t, &["db", "pool"]), Some(Value::Integer(5)));
        assert!(remove(&mut t, &["db", "pool"]).is_none());
        assert!(remove(&mut t, &["missing", "pool"]).is_none());
        assert_eq!(t, table("[db]\nurl = \"x\"\n"));
    }

    #[test]
    fn leaves_flattens_with_quoting() {
        let t = table(
            r#"
            port = 1
            [keypairdb."/k/id.key"]
            name = "id"
            [empty]
            "#,
        );
        let keys: Vec<String> = leaves(&t).into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys.len(), 2);
        assert_eq!(keys[0], "port");
        assert_eq!(parse(&keys[1]).unwrap(), vec!["keypairdb", "/k/id.key", "name"]);
    }
}
