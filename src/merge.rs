//! Diff and merge of nested tables.
//!
//! [`diff`] extracts what changed between two states of a document; [`merge`]
//! lays such a change set over another document. Together they let a store
//! replay its own in-memory edits on top of whatever another process wrote to
//! disk, so independent leaves survive instead of one writer clobbering the
//! other wholesale.

use toml::{Table, Value};

use crate::types::SyncDepth;

/// Entries of `new` that are absent from `old` or differ from it.
///
/// When a key holds a table on both sides and `depth` still allows recursion
/// at this level, the result carries the nested diff for that key, which may
/// be an empty table. Keys absent from `old` are copied wholesale. Keys
/// removed in `new` are not represented.
pub fn diff(old: &Table, new: &Table, depth: SyncDepth) -> Table {
    diff_at(old, new, depth, 0)
}

fn diff_at(old: &Table, new: &Table, depth: SyncDepth, level: u32) -> Table {
    let mut changed = Table::new();
    for (key, new_val) in new {
        match (old.get(key), new_val) {
            (None, _) => {
                changed.insert(key.clone(), new_val.clone());
            }
            (Some(Value::Table(old_tbl)), Value::Table(new_tbl)) if depth.recurses_at(level) => {
                changed.insert(
                    key.clone(),
                    Value::Table(diff_at(old_tbl, new_tbl, depth, level + 1)),
                );
            }
            (Some(old_val), _) if old_val != new_val => {
                changed.insert(key.clone(), new_val.clone());
            }
            _ => {}
        }
    }
    changed
}

/// Deep-merge `updates` on top of a copy of `base`.
/// If `updates` holds a table for a key, recurse into `base`'s value for that
/// key (an empty table when absent or not a table).
/// Otherwise, `updates`' value wins.
pub fn merge(base: &Table, updates: &Table) -> Table {
    merge_owned(base.clone(), updates)
}

fn merge_owned(mut base: Table, updates: &Table) -> Table {
    for (key, update_val) in updates {
        let merged = match update_val {
            Value::Table(update_tbl) => {
                let nested = match base.remove(key) {
                    Some(Value::Table(base_tbl)) => base_tbl,
                    _ => Table::new(),
                };
                Value::Table(merge_owned(nested, update_tbl))
            }
            other => other.clone(),
        };
        base.insert(key.clone(), merged);
    }
    base
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(toml_str: &str) -> Table {
        toml_str.parse::<Table>().unwrap()
    }

    #[test]
    fn diff_depth_zero_compares_top_level_only() {
        let old = table("port = 1\nhost = \"a\"\n[db]\nurl = \"x\"\npool = 5\n");
        let new = table("port = 2\nhost = \"a\"\n[db]\nurl = \"x\"\npool = 6\n");
        let changed = diff(&old, &new, SyncDepth::Levels(0));
        assert_eq!(changed, table("port = 2\n[db]\nurl = \"x\"\npool = 6\n"));
    }

    #[test]
    fn diff_depth_zero_skips_equal_sections() {
        let old = table("[db]\nurl = \"x\"\n");
        let changed = diff(&old, &old.clone(), SyncDepth::Levels(0));
        assert!(changed.is_empty());
    }

    #[test]
    fn diff_depth_one_recurses_into_sections() {
        let old = table("[db]\nurl = \"x\"\npool = 5\n[ui]\nlocale = \"en\"\n");
        let new = table("[db]\nurl = \"x\"\npool = 6\n[ui]\nlocale = \"en\"\n");
        let changed = diff(&old, &new, SyncDepth::Levels(1));
        assert_eq!(changed["db"], Value::Table(table("pool = 6")));
        // Unchanged sections still appear, as empty nested diffs.
        assert_eq!(changed["ui"], Value::Table(Table::new()));
    }

    #[test]
    fn diff_depth_one_replaces_second_level_wholesale() {
        let old = table("[records.a]\nname = \"one\"\nused = 1\n");
        let new = table("[records.a]\nname = \"one\"\nused = 2\n");
        let changed = diff(&old, &new, SyncDepth::Levels(1));
        assert_eq!(
            changed["records"]["a"],
            Value::Table(table("name = \"one\"\nused = 2"))
        );
    }

    #[test]
    fn diff_new_keys_are_copied_wholesale() {
        let old = table("port = 1");
        let new = table("port = 1\n[db]\nurl = \"x\"\n[db.pool]\nsize = 5\n");
        let changed = diff(&old, &new, SyncDepth::Unlimited);
        assert_eq!(changed, table("[db]\nurl = \"x\"\n[db.pool]\nsize = 5\n"));
    }

    #[test]
    fn diff_type_change_takes_new_value() {
        let old = table("[db]\nurl = \"x\"\n");
        let new = table("db = \"flat\"");
        let changed = diff(&old, &new, SyncDepth::Unlimited);
        assert_eq!(changed["db"].as_str(), Some("flat"));
    }

    #[test]
    fn diff_ignores_removed_keys() {
        let old = table("port = 1\nhost = \"a\"");
        let new = table("port = 1");
        assert!(diff(&old, &new, SyncDepth::Unlimited).is_empty());
    }

    #[test]
    fn diff_compares_arrays_by_equality() {
        let old = table("removed = [\"a\"]");
        let new = table("removed = [\"a\", \"b\"]");
        let changed = diff(&old, &new, SyncDepth::Unlimited);
        assert_eq!(changed, new);
    }

    #[test]
    fn merge_of_full_diff_reproduces_new() {
        let old = table(
            r#"
            top = 1
            gone_scalar = "x"
            [a]
            keep = true
            [a.b]
            val = 1
            other = "keep"
            [c]
            list = [1, 2]
            "#,
        );
        let new = table(
            r#"
            top = 2
            gone_scalar = "x"
            added = 1.5
            [a]
            keep = false
            [a.b]
            val = 99
            other = "keep"
            [a.b.deeper]
            z = "new"
            [c]
            list = [3]
            "#,
        );
        let changed = diff(&old, &new, SyncDepth::Unlimited);
        assert_eq!(merge(&old, &changed), new);
    }

    #[test]
    fn merge_does_not_touch_base() {
        let base = table("[db]\nurl = \"x\"\npool = 5\n");
        let before = base.clone();
        let merged = merge(&base, &table("[db]\npool = 20\n"));
        assert_eq!(base, before);
        assert_eq!(merged["db"]["pool"].as_integer(), Some(20));
        assert_eq!(merged["db"]["url"].as_str(), Some("x"));
    }

    #[test]
    fn merge_empty_updates_returns_base() {
        let base = table("port = 8080\n[db]\nurl = \"x\"\n");
        assert_eq!(merge(&base, &Table::new()), base);
    }

    #[test]
    fn merge_into_empty_base_returns_updates() {
        let updates = table("port = 3000\n[db]\nurl = \"x\"\n");
        assert_eq!(merge(&Table::new(), &updates), updates);
    }

    #[test]
    fn merge_scalar_replaces_table() {
        let merged = merge(&table("[db]\nurl = \"x\"\n"), &table("db = \"flat\""));
        assert_eq!(merged["db"].as_str(), Some("flat"));
    }

    #[test]
    fn merge_table_replaces_scalar() {
        let merged = merge(&table("db = \"flat\""), &table("[db]\nurl = \"x\"\n"));
        assert_eq!(merged["db"], Value::Table(table("url = \"x\"")));
    }

    #[test]
    fn merge_empty_nested_update_creates_section() {
        let mut updates = Table::new();
        updates.insert("ui".into(), Value::Table(Table::new()));
        let merged = merge(&table("port = 1"), &updates);
        assert_eq!(merged["ui"], Value::Table(Table::new()));
        assert_eq!(merged["port"].as_integer(), Some(1));
    }

    #[test]
    fn sibling_edits_combine_with_depth_one() {
        let snapshot = table("[a]\nx = 0\ny = 0\n");
        let mine = table("[a]\nx = 0\ny = 2\n");
        let on_disk = table("[a]\nx = 1\ny = 0\n");
        let merged = merge(&on_disk, &diff(&snapshot, &mine, SyncDepth::Levels(1)));
        assert_eq!(merged, table("[a]\nx = 1\ny = 2\n"));
    }

    #[test]
    fn stale_sibling_wins_with_depth_zero() {
        let snapshot = table("[a]\nx = 0\ny = 0\n");
        let mine = table("[a]\nx = 0\ny = 2\n");
        let on_disk = table("[a]\nx = 1\ny = 0\n");
        let merged = merge(&on_disk, &diff(&snapshot, &mine, SyncDepth::Levels(0)));
        // The whole section travels, carrying the stale x.
        assert_eq!(merged, table("[a]\nx = 0\ny = 2\n"));
    }
}
