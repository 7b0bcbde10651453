//! Locations of the primary file and its side files.
//!
//! Every side file lives next to the primary and is named by appending a
//! suffix to the primary's full file name:
//!
//! | File | Role |
//! |------|------|
//! | `<primary>.temp` | held by whichever process is mid-save |
//! | `<primary>.sentinel` | marks that the primary has existed before |
//! | `<primary>.backup` | last complete state, replaced only by rename |
//! | `<primary>.backup.temp` | staging copy for the next backup |

use std::ffi::OsString;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorePaths {
    pub primary: PathBuf,
    pub temp: PathBuf,
    pub sentinel: PathBuf,
    pub backup: PathBuf,
    pub backup_temp: PathBuf,
}

impl StorePaths {
    pub fn new(primary: impl Into<PathBuf>) -> Self {
        let primary = primary.into();
        let backup = with_suffix(&primary, ".backup");
        Self {
            temp: with_suffix(&primary, ".temp"),
            sentinel: with_suffix(&primary, ".sentinel"),
            backup_temp: with_suffix(&backup, ".temp"),
            backup,
            primary,
        }
    }

    /// Directory holding the primary and its side files, if the path has one.
    pub fn dir(&self) -> Option<&Path> {
        self.primary
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
    }
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

/// Platform config directory for `app_name` (XDG on Linux,
/// `~/Library/Application Support` on macOS, `%APPDATA%` on Windows).
///
/// Returns `None` if no home directory can be determined.
pub fn platform_dir(app_name: &str) -> Option<PathBuf> {
    let proj = directories::ProjectDirs::from("", "", app_name)?;
    Some(proj.config_dir().to_path_buf())
}
