use std::path::PathBuf;
use std::time::Duration;

use crate::error::StoreError;
use crate::paths::{self, StorePaths};
use crate::schema::Schema;
use crate::store::{Settings, Store};
use crate::types::SyncDepth;

/// How long a lock file may exist before its holder is presumed dead, and how
/// long `open` waits for a missing primary before falling back to the backup.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(2);

/// Interval between retries while waiting on another process.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Builder for opening a [`Store`].
///
/// The file location comes either from an explicit [`path()`](Self::path) or
/// from [`app_name()`](Self::app_name), which resolves to the platform config
/// directory.
#[derive(Debug, Clone)]
pub struct StoreBuilder {
    path: Option<PathBuf>,
    app_name: Option<String>,
    file_name: Option<String>,
    schema: Schema,
    sync_depth: SyncDepth,
    lock_timeout: Duration,
    poll_interval: Duration,
}

impl StoreBuilder {
    pub(crate) fn new() -> Self {
        Self {
            path: None,
            app_name: None,
            file_name: None,
            schema: Schema::new(),
            sync_depth: SyncDepth::default(),
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Use an explicit primary file. Takes precedence over `app_name`.
    pub fn path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Place the store in the platform config directory for `name`:
    /// - `file_name` → `"{app_name}.toml"`
    pub fn app_name(mut self, name: &str) -> Self {
        self.app_name = Some(name.to_string());
        self
    }

    /// Override the file name used with `app_name` (default: `"{app_name}.toml"`).
    pub fn file_name(mut self, name: &str) -> Self {
        self.file_name = Some(name.to_string());
        self
    }

    pub fn schema(mut self, schema: Schema) -> Self {
        self.schema = schema;
        self
    }

    /// Set the sync depth (default: `SyncDepth::Levels(1)`).
    pub fn sync_depth(mut self, depth: SyncDepth) -> Self {
        self.sync_depth = depth;
        self
    }

    /// Set the lock timeout (default: 2 seconds).
    pub fn lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    /// Set the polling interval used while waiting (default: 10 ms).
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Resolve the primary file path.
    fn effective_path(&self) -> Result<PathBuf, StoreError> {
        if let Some(path) = &self.path {
            return Ok(path.clone());
        }
        let app = self.app_name.as_deref().ok_or(StoreError::PathRequired)?;
        let dir = paths::platform_dir(app).ok_or(StoreError::PathRequired)?;
        let file_name = match &self.file_name {
            Some(name) => name.clone(),
            None => format!("{app}.toml"),
        };
        Ok(dir.join(file_name))
    }

    /// Open the store, recovering from an interrupted save if needed.
    pub fn open(self) -> Result<Store, StoreError> {
        let paths = StorePaths::new(self.effective_path()?);
        Store::open_with(
            paths,
            Settings {
                schema: self.schema,
                sync_depth: self.sync_depth,
                lock_timeout: self.lock_timeout,
                poll_interval: self.poll_interval,
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Field;
    use tempfile::TempDir;

    #[test]
    fn defaults() {
        let builder = Store::builder();
        assert_eq!(builder.sync_depth, SyncDepth::Levels(1));
        assert_eq!(builder.lock_timeout, Duration::from_secs(2));
        assert_eq!(builder.poll_interval, Duration::from_millis(10));
    }

    #[test]
    fn path_or_app_name_required() {
        let err = Store::builder().open().unwrap_err();
        assert!(matches!(err, StoreError::PathRequired));
    }

    #[test]
    fn explicit_path_wins() {
        let builder = Store::builder()
            .app_name("myapp")
            .path("/tmp/explicit.toml");
        assert_eq!(
            builder.effective_path().unwrap(),
            PathBuf::from("/tmp/explicit.toml")
        );
    }

    #[test]
    fn app_name_derives_file_name() {
        let builder = Store::builder().app_name("myapp");
        if let Ok(path) = builder.effective_path() {
            assert!(path.ends_with("myapp.toml"));
        }
    }

    #[test]
    fn file_name_override() {
        let builder = Store::builder().app_name("myapp").file_name("userconfig.toml");
        if let Ok(path) = builder.effective_path() {
            assert!(path.ends_with("userconfig.toml"));
        }
    }

    #[test]
    fn open_applies_settings() {
        let dir = TempDir::new().unwrap();
        let store = Store::builder()
            .path(dir.path().join("conf.toml"))
            .schema(Schema::new().field("count", Field::integer().default(3)))
            .sync_depth(SyncDepth::Unlimited)
            .open()
            .unwrap();
        assert_eq!(store.sync_depth(), SyncDepth::Unlimited);
        assert_eq!(store.get("count").and_then(|v| v.as_integer()), Some(3));
    }
}
