//! Error types for catalog access.

use std::path::PathBuf;

use dirindex_core::IndexError;
use thiserror::Error;

/// Errors raised by a catalog engine.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The underlying sled database failed.
    #[error("storage error: {0}")]
    Sled(#[from] sled::Error),

    /// A stored value could not be decoded.
    #[error("corrupt record for {key}: {source}")]
    Decode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// A record could not be encoded.
    #[error("failed to encode record: {0}")]
    Encode(#[source] serde_json::Error),

    /// A folder id key did not have the expected width.
    #[error("corrupt folder id for {path}")]
    CorruptFolderId { path: PathBuf },

    /// Folder resolution was asked for a path with no components.
    #[error("cannot resolve folder for empty path")]
    EmptyPath,
}

impl StoreError {
    pub(crate) fn decode(key: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Decode {
            key: key.into(),
            source,
        }
    }
}

impl From<StoreError> for IndexError {
    fn from(err: StoreError) -> Self {
        IndexError::Catalog {
            message: err.to_string(),
        }
    }
}
