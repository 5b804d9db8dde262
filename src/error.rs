//! Error taxonomy for the core.
//!
//! Domain operations fail narrowly: a rejected header or an oversized body
//! leaves the target untouched. Load paths collect errors and keep going,
//! save paths abort the file being written.

use std::io;
use std::path::{Path, PathBuf};

/// Broad classification of a [`CoreError`], used for user-facing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NullParam,
    FileNotFound,
    PermissionDenied,
    InvalidJson,
    CorruptedData,
    MemoryAllocation,
    DiskFull,
    InvalidPath,
    InvalidSize,
    BufferOverflow,
    InvalidHeader,
    InvalidIndex,
    Transport,
    Io,
}

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("missing required input: {0}")]
    NullParam(&'static str),
    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),
    #[error("permission denied: {}", .0.display())]
    PermissionDenied(PathBuf),
    #[error("invalid JSON in {}: {reason}", path.display())]
    InvalidJson { path: PathBuf, reason: String },
    #[error("corrupted data in {}: {reason}", path.display())]
    CorruptedData { path: PathBuf, reason: String },
    #[error("memory allocation failed while growing {0}")]
    MemoryAllocation(&'static str),
    #[error("disk full while writing {}", .0.display())]
    DiskFull(PathBuf),
    #[error("invalid path: {0}")]
    InvalidPath(String),
    #[error("{what} size {size} exceeds limit {max}")]
    InvalidSize { what: &'static str, size: usize, max: usize },
    #[error("{field} exceeds {max} characters or contains forbidden characters")]
    BufferOverflow { field: &'static str, max: usize },
    #[error("invalid header: {0}")]
    InvalidHeader(String),
    #[error("index {index} out of range (len {len})")]
    InvalidIndex { index: usize, len: usize },
    #[error("transport error: {0}")]
    Transport(String),
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

pub type Result<T> = std::result::Result<T, CoreError>;

impl CoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::NullParam(_) => ErrorKind::NullParam,
            CoreError::FileNotFound(_) => ErrorKind::FileNotFound,
            CoreError::PermissionDenied(_) => ErrorKind::PermissionDenied,
            CoreError::InvalidJson { .. } => ErrorKind::InvalidJson,
            CoreError::CorruptedData { .. } => ErrorKind::CorruptedData,
            CoreError::MemoryAllocation(_) => ErrorKind::MemoryAllocation,
            CoreError::DiskFull(_) => ErrorKind::DiskFull,
            CoreError::InvalidPath(_) => ErrorKind::InvalidPath,
            CoreError::InvalidSize { .. } => ErrorKind::InvalidSize,
            CoreError::BufferOverflow { .. } => ErrorKind::BufferOverflow,
            CoreError::InvalidHeader(_) => ErrorKind::InvalidHeader,
            CoreError::InvalidIndex { .. } => ErrorKind::InvalidIndex,
            CoreError::Transport(_) => ErrorKind::Transport,
            CoreError::Io { .. } => ErrorKind::Io,
        }
    }

    /// True for errors that cause a file to be backed up as corrupted.
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            CoreError::InvalidJson { .. } | CoreError::CorruptedData { .. }
        )
    }

    /// Classify an I/O error against the path it occurred on.
    pub fn from_io(path: &Path, source: io::Error) -> Self {
        match source.kind() {
            io::ErrorKind::NotFound => CoreError::FileNotFound(path.to_path_buf()),
            io::ErrorKind::PermissionDenied => CoreError::PermissionDenied(path.to_path_buf()),
            io::ErrorKind::WriteZero => CoreError::DiskFull(path.to_path_buf()),
            _ if is_storage_full(&source) => CoreError::DiskFull(path.to_path_buf()),
            _ => CoreError::Io {
                path: path.to_path_buf(),
                source,
            },
        }
    }

    pub(crate) fn invalid_index(index: usize, len: usize) -> Self {
        CoreError::InvalidIndex { index, len }
    }
}

// ENOSPC on unix, ERROR_DISK_FULL on windows
fn is_storage_full(err: &io::Error) -> bool {
    match err.raw_os_error() {
        Some(code) if cfg!(unix) => code == 28,
        Some(code) if cfg!(windows) => code == 112,
        _ => false,
    }
}

/// Single mapping from error kind and operation to a user-visible message.
pub fn user_message(kind: ErrorKind, operation: &str) -> String {
    let detail = match kind {
        ErrorKind::NullParam => "nothing is selected",
        ErrorKind::FileNotFound => "the file could not be found",
        ErrorKind::PermissionDenied => "permission was denied",
        ErrorKind::InvalidJson => "the file is not valid JSON (a backup was kept)",
        ErrorKind::CorruptedData => "the file is corrupted (a backup was kept)",
        ErrorKind::MemoryAllocation => "the system ran out of memory",
        ErrorKind::DiskFull => "the disk is full",
        ErrorKind::InvalidPath => "the path is invalid",
        ErrorKind::InvalidSize => "the content is too large",
        ErrorKind::BufferOverflow => "a field is too long or contains invalid characters",
        ErrorKind::InvalidHeader => "a header name or value is invalid",
        ErrorKind::InvalidIndex => "the selected item no longer exists",
        ErrorKind::Transport => "the request could not be completed",
        ErrorKind::Io => "an I/O error occurred",
    };
    format!("Failed to {}: {}", operation, detail)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_io_classifies_kinds() {
        let path = Path::new("/tmp/x.json");
        let err = CoreError::from_io(path, io::Error::from(io::ErrorKind::NotFound));
        assert_eq!(err.kind(), ErrorKind::FileNotFound);
        let err = CoreError::from_io(path, io::Error::from(io::ErrorKind::PermissionDenied));
        assert_eq!(err.kind(), ErrorKind::PermissionDenied);
        let err = CoreError::from_io(path, io::Error::from(io::ErrorKind::WriteZero));
        assert_eq!(err.kind(), ErrorKind::DiskFull);
        let err = CoreError::from_io(path, io::Error::from(io::ErrorKind::Interrupted));
        assert_eq!(err.kind(), ErrorKind::Io);
    }

    #[test]
    fn test_corruption_classification() {
        let err = CoreError::CorruptedData {
            path: PathBuf::from("a"),
            reason: "empty".into(),
        };
        assert!(err.is_corruption());
        assert!(!CoreError::NullParam("x").is_corruption());
    }

    #[test]
    fn test_user_message_mentions_operation() {
        let msg = user_message(ErrorKind::DiskFull, "save collection");
        assert_eq!(msg, "Failed to save collection: the disk is full");
    }
}
