//! The persistence seam.

use std::path::{Path, PathBuf};

use dirindex_core::{ContentHash, FileEntryRecord, FolderId, FolderRecord};

use crate::error::StoreError;

/// Point lookups and upsert-by-key writes over entries and folders.
///
/// Every write fully supersedes the existing row for its key. Engines take
/// `&self` so a catalog can be shared with readers while the single walker
/// writes to it.
pub trait Catalog: Send + Sync {
    /// Look up the entry stored under an absolute path.
    fn entry(&self, path: &Path) -> Result<Option<FileEntryRecord>, StoreError>;

    /// Insert or replace the entry keyed by `record.path`.
    fn upsert_entry(&self, record: &FileEntryRecord) -> Result<(), StoreError>;

    fn folder(&self, id: FolderId) -> Result<Option<FolderRecord>, StoreError>;

    fn folder_by_path(&self, path: &Path) -> Result<Option<FolderRecord>, StoreError>;

    /// Insert a folder row and return its new id.
    ///
    /// If the path is already present the existing id is returned and the
    /// row is left as is.
    fn insert_folder(&self, path: &Path, parent_id: Option<FolderId>)
    -> Result<FolderId, StoreError>;

    /// Paths of all entries whose stored hash equals `hash`.
    fn paths_with_hash(&self, hash: &ContentHash) -> Result<Vec<PathBuf>, StoreError>;

    fn entry_count(&self) -> Result<usize, StoreError>;

    fn folder_count(&self) -> Result<usize, StoreError>;

    /// Make pending writes durable.
    fn flush(&self) -> Result<(), StoreError> {
        Ok(())
    }

    /// Error message stored for a path, if any.
    fn stored_error(&self, path: &Path) -> Result<Option<String>, StoreError> {
        Ok(self.entry(path)?.and_then(|record| record.error))
    }
}
