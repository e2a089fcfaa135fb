//! Error types for indexing operations.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that stop an indexing run (or one root of it).
#[derive(Debug, Error)]
pub enum IndexError {
    /// Generic I/O error.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The exclusion pattern file could not be read.
    #[error("Could not read pattern file {path}: {source}")]
    PatternFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The catalog could not be opened or queried.
    #[error("Catalog error: {message}")]
    Catalog { message: String },

    /// Invalid configuration.
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },
}

impl IndexError {
    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Failures while streaming a file through the content digest.
#[derive(Debug, Error)]
pub enum HashError {
    #[error("opening file: {0}")]
    Open(#[source] std::io::Error),

    /// Linear read pass of the instrumented mode.
    #[error("reading file: {0}")]
    Read(#[source] std::io::Error),

    #[error("seeking file: {0}")]
    Seek(#[source] std::io::Error),

    #[error("hashing file: {0}")]
    Digest(#[source] std::io::Error),
}

/// Entry-level failures.
///
/// None of these abort a walk. Most are written into the `error` column of
/// the affected entry; the policy skips are reported through
/// [`EntryError::is_recorded`].
#[derive(Debug, Error)]
pub enum EntryError {
    /// Listing a directory (or reaching the root) failed.
    #[error("walking file: {0}")]
    WalkEnumeration(#[source] std::io::Error),

    /// The catalog failed while resolving the owning folder.
    #[error("getting folder ID: {0}")]
    FolderResolution(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// `lstat` failed.
    #[error("getting file info: {0}")]
    Metadata(#[source] std::io::Error),

    /// `readlink` failed.
    #[error("reading symlink: {0}")]
    SymlinkRead(#[source] std::io::Error),

    /// Named pipes are never opened. The message keeps the catalog format
    /// written by earlier indexer versions.
    #[error("FIFO: <nil>")]
    Fifo,

    #[error(transparent)]
    Hash(#[from] HashError),

    /// A followed symlink resolved to a directory that was already walked.
    #[error("symlink loop: {} already visited", target.display())]
    SymlinkLoop { target: PathBuf },
}

impl EntryError {
    /// Whether this error is stored on the entry's record.
    ///
    /// Symlink loops are only logged: the link itself still gets a
    /// regular symlink record.
    pub fn is_recorded(&self) -> bool {
        !matches!(self, Self::SymlinkLoop { .. })
    }

    /// Whether this is a policy decision rather than a failure.
    pub fn is_policy_skip(&self) -> bool {
        matches!(self, Self::Fifo | Self::SymlinkLoop { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifo_message() {
        assert_eq!(EntryError::Fifo.to_string(), "FIFO: <nil>");
        assert!(EntryError::Fifo.is_policy_skip());
        assert!(EntryError::Fifo.is_recorded());
    }

    #[test]
    fn test_hash_error_prefix() {
        let err = EntryError::from(HashError::Open(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "denied",
        )));
        assert_eq!(err.to_string(), "opening file: denied");
    }

    #[test]
    fn test_symlink_loop_not_recorded() {
        let err = EntryError::SymlinkLoop {
            target: PathBuf::from("/data/a"),
        };
        assert!(!err.is_recorded());
        assert!(err.to_string().contains("/data/a"));
    }
}
