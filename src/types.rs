/// How deeply [`sync`](crate::Store::sync) diffs and merges nested sections
/// independently before treating a section as a single value.
///
/// With `Levels(0)` only top-level keys are compared, so a change anywhere
/// inside a section replaces the whole section. With `Levels(1)` the entries of
/// each top-level section merge independently, which is what a table of many
/// independent records (one sub-section per record) wants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncDepth {
    /// Recurse through every level of nesting.
    Unlimited,
    /// Recurse into nested sections while `n > current_level`.
    Levels(u32),
}

impl SyncDepth {
    /// Whether two tables found at `level` should be diffed key by key.
    pub fn recurses_at(self, level: u32) -> bool {
        match self {
            SyncDepth::Unlimited => true,
            SyncDepth::Levels(n) => n > level,
        }
    }
}

impl Default for SyncDepth {
    fn default() -> Self {
        SyncDepth::Levels(1)
    }
}

/// A store operation, independent of any CLI framework.
/// The CLI layer converts parsed clap args into this.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreAction {
    List,
    Get { key: String },
    Set { key: String, value: String },
    Unset { key: String },
    Sync,
}
