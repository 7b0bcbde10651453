//! Lock-by-rename.
//!
//! A process owns the store while the primary file sits at its `.temp` name.
//! Taking ownership is a single rename of the primary onto the temp name;
//! handing it back is the reverse rename. A rename whose source is gone means
//! another process got there first. No OS lock API is involved, so this works
//! on filesystems that lack advisory locks.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::error::StoreError;
use crate::paths::StorePaths;

/// What the caller holds after [`acquire`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acquired {
    /// The previous primary now sits at the temp path.
    Existing,
    /// There is no previous state; the caller writes the temp file from
    /// scratch.
    BrandNew { created_sentinel: bool },
}

/// Take ownership of the store by renaming the primary onto the temp path.
///
/// While another process holds the temp file this polls every `poll_interval`.
/// Once `timeout` has passed the holder is presumed dead: its temp file is
/// renamed back to the primary and acquisition is tried one last time.
pub fn acquire(
    paths: &StorePaths,
    timeout: Duration,
    poll_interval: Duration,
) -> Result<Acquired, StoreError> {
    let start = Instant::now();
    let mut last_attempt = false;

    loop {
        let err = match fs::rename(&paths.primary, &paths.temp) {
            Ok(()) => {
                debug!("acquired {}", paths.temp.display());
                return Ok(Acquired::Existing);
            }
            Err(e) if is_contention(&e) => e,
            Err(e) => return Err(StoreError::io(&paths.primary, e)),
        };

        if !paths.sentinel.exists() && create_sentinel(&paths.sentinel)? {
            info!("creating new store at {}", paths.primary.display());
            return Ok(Acquired::BrandNew {
                created_sentinel: true,
            });
        }

        if last_attempt {
            return Err(StoreError::io(&paths.primary, err));
        }

        if start.elapsed() > timeout {
            match fs::rename(&paths.temp, &paths.primary) {
                Ok(()) => {
                    warn!(
                        timeout_ms = timeout.as_millis() as u64,
                        "stale {} outlived the lock timeout; taking it over",
                        paths.temp.display()
                    );
                    last_attempt = true;
                    continue;
                }
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    warn!(
                        "neither {} nor its lock file exist; recreating the store",
                        paths.primary.display()
                    );
                    return Ok(Acquired::BrandNew {
                        created_sentinel: false,
                    });
                }
                Err(e) => return Err(StoreError::io(&paths.temp, e)),
            }
        }

        thread::sleep(poll_interval);
    }
}

/// Hand the store back by renaming the temp file onto the primary.
pub fn release(paths: &StorePaths) -> Result<(), StoreError> {
    fs::rename(&paths.temp, &paths.primary).map_err(|e| StoreError::io(&paths.temp, e))
}

/// Undo [`acquire`] after a failed save, restoring the files to how they were
/// before the save began. Best effort: failures are logged, not returned.
///
/// `temp_dirty` says whether the temp file may already hold partially written
/// bytes; if so it is first restored from the backup taken during the save.
pub fn abandon(paths: &StorePaths, acquired: Acquired, temp_dirty: bool) {
    match acquired {
        Acquired::Existing => {
            if temp_dirty && let Err(e) = fs::copy(&paths.backup, &paths.temp) {
                warn!("could not restore {} from backup: {e}", paths.temp.display());
            }
            if let Err(e) = release(paths) {
                warn!("could not release lock after failed save: {e}");
            } else {
                warn!("save failed; lock released with previous contents");
            }
        }
        Acquired::BrandNew { created_sentinel } => {
            remove_if_present(&paths.temp);
            if created_sentinel {
                remove_if_present(&paths.sentinel);
            }
            warn!("save of new store failed; partial files removed");
        }
    }
}

/// Create the sentinel exclusively. `false` if another process created it
/// first, which makes that process the one setting up the new store.
fn create_sentinel(path: &Path) -> Result<bool, StoreError> {
    match fs::OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(_) => Ok(true),
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
            debug!("lost the race to create {}", path.display());
            Ok(false)
        }
        Err(e) => Err(StoreError::io(path, e)),
    }
}

fn remove_if_present(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => warn!("could not remove {}: {e}", path.display()),
    }
}

/// A rename failure that means "someone else holds the lock": the source is
/// gone (it was renamed away), or the target already exists on platforms whose
/// rename refuses to replace.
fn is_contention(err: &std::io::Error) -> bool {
    matches!(err.kind(), ErrorKind::NotFound | ErrorKind::AlreadyExists)
}
