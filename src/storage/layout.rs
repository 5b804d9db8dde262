//! On-disk directory layout and file helpers

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use crate::constants::{
    APP_DIR_NAME, APP_NAME, AUTO_SAVE_BACKUP_FILE, AUTO_SAVE_DIR, COLLECTIONS_DIR,
    CORRUPTED_SUFFIX, LEGACY_BACKUP_FILE, LEGACY_REQUESTS_FILE, LOG_FILE, MIGRATION_MARKER_FILE,
    SETTINGS_FILE, STATE_FILE,
};
use crate::error::{CoreError, Result};

/// Paths of every file the application reads or writes, relative to one root
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StorageLayout {
    root: PathBuf,
}

impl StorageLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        StorageLayout { root: root.into() }
    }

    /// Layout under the platform configuration root.
    pub fn from_default_root() -> Result<Self> {
        default_root().map(StorageLayout::new)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn settings_path(&self) -> PathBuf {
        self.root.join(SETTINGS_FILE)
    }

    pub fn state_path(&self) -> PathBuf {
        self.root.join(STATE_FILE)
    }

    pub fn migration_marker_path(&self) -> PathBuf {
        self.root.join(MIGRATION_MARKER_FILE)
    }

    pub fn legacy_requests_path(&self) -> PathBuf {
        self.root.join(LEGACY_REQUESTS_FILE)
    }

    pub fn legacy_backup_path(&self) -> PathBuf {
        self.root.join(LEGACY_BACKUP_FILE)
    }

    pub fn collections_dir(&self) -> PathBuf {
        self.root.join(COLLECTIONS_DIR)
    }

    pub fn auto_save_dir(&self) -> PathBuf {
        self.root.join(AUTO_SAVE_DIR)
    }

    pub fn auto_save_backup_path(&self) -> PathBuf {
        self.auto_save_dir().join(AUTO_SAVE_BACKUP_FILE)
    }

    pub fn log_path(&self) -> PathBuf {
        self.root.join(LOG_FILE)
    }

    /// `collections/<id>.json`. Ids that could escape the directory are rejected.
    pub fn collection_path(&self, id: &str) -> Result<PathBuf> {
        let valid = !id.is_empty()
            && id != "."
            && id != ".."
            && !id.contains(['/', '\\', ':', '\0']);
        if !valid {
            return Err(CoreError::InvalidPath(format!("collection id {:?}", id)));
        }
        Ok(self.collections_dir().join(format!("{}.json", id)))
    }

    /// Create the root, `collections/` and `auto_save/` if missing.
    pub fn ensure_dirs(&self) -> Result<()> {
        for dir in [self.root.clone(), self.collections_dir(), self.auto_save_dir()] {
            fs::create_dir_all(&dir).map_err(|e| CoreError::from_io(&dir, e))?;
        }
        Ok(())
    }
}

/// `%LOCALAPPDATA%\TinyRequest` on Windows, `~/.config/tinyrequest` elsewhere.
pub fn default_root() -> Result<PathBuf> {
    if cfg!(windows) {
        dirs::data_local_dir()
            .map(|dir| dir.join(APP_NAME))
            .ok_or_else(|| CoreError::InvalidPath("local application data directory".to_string()))
    } else {
        dirs::home_dir()
            .map(|home| home.join(".config").join(APP_DIR_NAME))
            .ok_or_else(|| CoreError::InvalidPath("home directory".to_string()))
    }
}

/// `<path>.corrupted.backup`
pub fn corrupted_backup_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(CORRUPTED_SUFFIX);
    PathBuf::from(name)
}

pub fn read_file(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).map_err(|e| CoreError::from_io(path, e))
}

/// Write to a sibling temp file, then rename over `path`.
/// A failed write leaves the previous file untouched.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut tmp = OsString::from(path.as_os_str());
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    if let Err(e) = fs::write(&tmp, bytes) {
        let _ = fs::remove_file(&tmp);
        return Err(CoreError::from_io(path, e));
    }
    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(CoreError::from_io(path, e));
    }
    Ok(())
}

pub fn copy_file(from: &Path, to: &Path) -> Result<()> {
    fs::copy(from, to)
        .map(|_| ())
        .map_err(|e| CoreError::from_io(from, e))
}
