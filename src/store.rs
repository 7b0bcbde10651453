//! The store handle: one in-memory document kept consistent with a file that
//! other processes read and write too.
//!
//! # Open
//!
//! The primary file is parsed and validated. If it is missing and the sentinel
//! says it has existed before, another process is probably mid-save: `open`
//! polls until the primary reappears or the lock timeout passes, then falls
//! back to the backup, then to an empty document.
//!
//! # Sync
//!
//! [`Store::sync`] compares the file's modification time with the time of the
//! last sync. If the file is newer, the edits made in memory since the last
//! sync ([`diff`] of the snapshot against the document) are replayed on top of
//! the freshly read file ([`merge`]), so another process's changes to other
//! leaves survive.
//!
//! # Save
//!
//! [`Store::save`] validates, takes the lock by renaming the primary to its
//! temp name, syncs against the temp file to pick up any last-moment change,
//! snapshots it to the backup, writes the document into the temp file and
//! renames it back. The primary is only ever replaced by that final rename.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant, SystemTime};

use serde::de::DeserializeOwned;
use toml::{Table, Value};
use tracing::{debug, info, instrument, warn};

use crate::builder::StoreBuilder;
use crate::error::StoreError;
use crate::keypath;
use crate::lock::{self, Acquired};
use crate::merge::{diff, merge};
use crate::ops::{self, StoreResult};
use crate::paths::StorePaths;
use crate::schema::Schema;
use crate::types::{StoreAction, SyncDepth};

/// Everything a store needs besides its location.
#[derive(Debug, Clone)]
pub(crate) struct Settings {
    pub schema: Schema,
    pub sync_depth: SyncDepth,
    pub lock_timeout: Duration,
    pub poll_interval: Duration,
}

/// A handle on a shared configuration file.
///
/// Each consumer holds its own handle; handles on the same path in one or many
/// processes stay consistent through the file protocol alone.
#[derive(Debug)]
pub struct Store {
    paths: StorePaths,
    settings: Settings,
    document: Table,
    /// The document as of the last sync, for computing local edits.
    snapshot: Table,
    sync_time: SystemTime,
}

impl Store {
    pub fn builder() -> StoreBuilder {
        StoreBuilder::new()
    }

    /// Open the store at `path` with default timing.
    pub fn open(
        path: impl AsRef<Path>,
        schema: Schema,
        sync_depth: SyncDepth,
    ) -> Result<Self, StoreError> {
        Self::builder()
            .path(path.as_ref())
            .schema(schema)
            .sync_depth(sync_depth)
            .open()
    }

    #[instrument(skip_all, fields(path = %paths.primary.display()))]
    pub(crate) fn open_with(paths: StorePaths, settings: Settings) -> Result<Self, StoreError> {
        let mut document = load_initial(&paths, &settings)?;
        let sync_time = SystemTime::now();
        settings.schema.validate(&mut document)?;
        debug!("opened");
        Ok(Self {
            paths,
            settings,
            snapshot: document.clone(),
            document,
            sync_time,
        })
    }

    pub fn path(&self) -> &Path {
        &self.paths.primary
    }

    pub fn paths(&self) -> &StorePaths {
        &self.paths
    }

    pub fn schema(&self) -> &Schema {
        &self.settings.schema
    }

    pub fn sync_depth(&self) -> SyncDepth {
        self.settings.sync_depth
    }

    pub fn document(&self) -> &Table {
        &self.document
    }

    /// Direct access for bulk edits. Changes are picked up by the next
    /// `sync` or `save` like any other in-memory edit.
    pub fn document_mut(&mut self) -> &mut Table {
        &mut self.document
    }

    /// Look up a value by dotted key. A malformed key finds nothing.
    pub fn get(&self, key: &str) -> Option<&Value> {
        let segments = keypath::parse(key).ok()?;
        keypath::get(&self.document, &segments)
    }

    /// Look up and deserialize a value by dotted key.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<T, StoreError> {
        let segments = keypath::parse(key)?;
        let value = keypath::get(&self.document, &segments)
            .ok_or_else(|| StoreError::KeyNotFound(key.into()))?;
        value
            .clone()
            .try_into()
            .map_err(|e: toml::de::Error| StoreError::InvalidValue {
                key: key.into(),
                reason: e.to_string(),
            })
    }

    /// Set a value in memory, creating sections as needed.
    /// Returns the previous value. Nothing reaches disk until [`save`](Self::save).
    pub fn set<V: Into<Value>>(
        &mut self,
        key: &str,
        value: V,
    ) -> Result<Option<Value>, StoreError> {
        let segments = keypath::parse(key)?;
        keypath::set(&mut self.document, &segments, value.into())
    }

    /// Remove a value in memory, returning it.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let segments = keypath::parse(key).ok()?;
        keypath::remove(&mut self.document, &segments)
    }

    /// Check the document against the schema, filling defaults and coercing
    /// parseable values in place.
    pub fn validate(&mut self) -> Result<(), StoreError> {
        self.settings.schema.validate(&mut self.document)?;
        Ok(())
    }

    /// Fold in changes other processes saved since the last sync.
    ///
    /// Returns `false` when the file has not changed. A missing primary means
    /// another process is mid-save and is also reported as unchanged.
    pub fn sync(&mut self) -> Result<bool, StoreError> {
        let primary = self.paths.primary.clone();
        match self.sync_from(&primary) {
            Err(StoreError::Io { source, .. }) if source.kind() == ErrorKind::NotFound => {
                debug!("primary is missing; another process is saving");
                Ok(false)
            }
            other => other,
        }
    }

    /// [`sync`](Self::sync) against an explicit file.
    ///
    /// If the merged document fails validation the error is returned and the
    /// in-memory state is left as it was.
    #[instrument(skip_all, fields(file = %target.display()))]
    pub fn sync_from(&mut self, target: &Path) -> Result<bool, StoreError> {
        let modified = fs::metadata(target)
            .and_then(|m| m.modified())
            .map_err(|e| StoreError::io(target, e))?;
        if !is_newer(modified, self.sync_time) {
            return Ok(false);
        }

        let edits = diff(&self.snapshot, &self.document, self.settings.sync_depth);

        // Taken before reading so a write landing after the read is still
        // seen as newer next time.
        let read_at = SystemTime::now();
        let on_disk = read_document(target)?.ok_or_else(|| {
            StoreError::io(target, std::io::Error::from(ErrorKind::NotFound))
        })?;

        let mut merged = merge(&on_disk, &edits);
        self.settings.schema.validate(&mut merged)?;

        self.snapshot = merged.clone();
        self.document = merged;
        self.sync_time = self.sync_time.max(read_at);
        debug!(local_edits = edits.len(), "merged external changes");
        Ok(true)
    }

    /// Persist the document.
    ///
    /// Validation runs first; an invalid document never touches disk. Any
    /// failure after the lock is taken hands the lock back with the previous
    /// file contents before the error is returned.
    #[instrument(skip_all, fields(path = %self.paths.primary.display()))]
    pub fn save(&mut self) -> Result<(), StoreError> {
        self.validate()?;
        self.ensure_dir()?;

        let acquired = lock::acquire(
            &self.paths,
            self.settings.lock_timeout,
            self.settings.poll_interval,
        )?;

        let mut temp_dirty = false;
        match self.write_locked(acquired, &mut temp_dirty) {
            Ok(()) => {
                debug!("saved");
                Ok(())
            }
            Err(e) => {
                lock::abandon(&self.paths, acquired, temp_dirty);
                Err(e)
            }
        }
    }

    fn write_locked(
        &mut self,
        acquired: Acquired,
        temp_dirty: &mut bool,
    ) -> Result<(), StoreError> {
        if acquired == Acquired::Existing {
            restrict_permissions(&self.paths.temp);
            let temp = self.paths.temp.clone();
            self.sync_from(&temp)?;
            self.write_backup()?;
        }

        let content = toml::to_string(&self.document)?;
        *temp_dirty = true;
        write_file(&self.paths.temp, &content)?;
        self.sync_time = self.sync_time.max(SystemTime::now());

        lock::release(&self.paths)
    }

    /// Copy the locked file to the backup via a staging copy and a rename, so
    /// the backup is never partially written.
    fn write_backup(&self) -> Result<(), StoreError> {
        let p = &self.paths;
        fs::copy(&p.temp, &p.backup_temp).map_err(|e| StoreError::io(&p.backup_temp, e))?;
        fs::rename(&p.backup_temp, &p.backup).map_err(|e| StoreError::io(&p.backup, e))?;
        debug!("backup updated");
        Ok(())
    }

    fn ensure_dir(&self) -> Result<(), StoreError> {
        let Some(dir) = self.paths.dir() else {
            return Ok(());
        };
        if dir.is_dir() {
            return Ok(());
        }
        let mut builder = fs::DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            builder.mode(0o700);
        }
        builder.create(dir).map_err(|e| StoreError::io(dir, e))
    }

    /// Handle a [`StoreAction`] (list / get / set / unset / sync).
    pub fn handle(&mut self, action: &StoreAction) -> Result<StoreResult, StoreError> {
        ops::handle(self, action)
    }
}

fn load_initial(paths: &StorePaths, settings: &Settings) -> Result<Table, StoreError> {
    let start = Instant::now();
    loop {
        if let Some(document) = read_document(&paths.primary)? {
            return Ok(document);
        }
        if !paths.sentinel.exists() {
            info!("no configuration yet; starting empty");
            return Ok(Table::new());
        }
        if start.elapsed() > settings.lock_timeout {
            return match read_document(&paths.backup)? {
                Some(document) => {
                    info!(
                        "{} still missing; recovered from {}",
                        paths.primary.display(),
                        paths.backup.display()
                    );
                    Ok(document)
                }
                None => {
                    warn!("primary and backup both missing; starting empty");
                    Ok(Table::new())
                }
            };
        }
        thread::sleep(settings.poll_interval);
    }
}

/// Read and parse a document. `None` if the file does not exist.
fn read_document(path: &Path) -> Result<Option<Table>, StoreError> {
    let content = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(StoreError::io(path, e)),
    };
    content
        .parse::<Table>()
        .map(Some)
        .map_err(|e| StoreError::Parse {
            path: path.to_path_buf(),
            source: e,
        })
}

fn write_file(path: &Path, content: &str) -> Result<(), StoreError> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path).map_err(|e| StoreError::io(path, e))?;
    file.write_all(content.as_bytes())
        .and_then(|()| file.sync_all())
        .map_err(|e| StoreError::io(path, e))
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) {
    use std::os::unix::fs::PermissionsExt;
    if let Err(e) = fs::set_permissions(path, fs::Permissions::from_mode(0o600)) {
        debug!("could not restrict permissions on {}: {e}", path.display());
    }
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) {}

/// Whether `modified` is later than `sync_time`, at hundredth-of-a-second
/// resolution to absorb coarse filesystem timestamps.
fn is_newer(modified: SystemTime, sync_time: SystemTime) -> bool {
    let delta = match modified.duration_since(sync_time) {
        Ok(ahead) => ahead.as_secs_f64(),
        Err(behind) => -behind.duration().as_secs_f64(),
    };
    (delta * 100.0).round() > 0.0
}
