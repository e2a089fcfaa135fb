//! In-memory catalog.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use dirindex_core::{ContentHash, FileEntryRecord, FolderId, FolderRecord};

use crate::catalog::Catalog;
use crate::error::StoreError;

/// Catalog held entirely in concurrent maps. Nothing survives the process.
#[derive(Debug)]
pub struct MemoryCatalog {
    entries: DashMap<PathBuf, FileEntryRecord>,
    folders: DashMap<FolderId, FolderRecord>,
    folder_paths: DashMap<PathBuf, FolderId>,
    next_folder_id: AtomicU64,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            folders: DashMap::new(),
            folder_paths: DashMap::new(),
            next_folder_id: AtomicU64::new(1),
        }
    }

    /// Snapshot of every stored entry, sorted by path.
    pub fn entries(&self) -> Vec<FileEntryRecord> {
        let mut entries: Vec<_> = self.entries.iter().map(|e| e.value().clone()).collect();
        entries.sort_by(|a, b| a.path.cmp(&b.path));
        entries
    }
}

impl Default for MemoryCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl Catalog for MemoryCatalog {
    fn entry(&self, path: &Path) -> Result<Option<FileEntryRecord>, StoreError> {
        Ok(self.entries.get(path).map(|e| e.value().clone()))
    }

    fn upsert_entry(&self, record: &FileEntryRecord) -> Result<(), StoreError> {
        self.entries.insert(record.path.clone(), record.clone());
        Ok(())
    }

    fn folder(&self, id: FolderId) -> Result<Option<FolderRecord>, StoreError> {
        Ok(self.folders.get(&id).map(|f| f.value().clone()))
    }

    fn folder_by_path(&self, path: &Path) -> Result<Option<FolderRecord>, StoreError> {
        let Some(id) = self.folder_paths.get(path).map(|id| *id) else {
            return Ok(None);
        };
        self.folder(id)
    }

    fn insert_folder(
        &self,
        path: &Path,
        parent_id: Option<FolderId>,
    ) -> Result<FolderId, StoreError> {
        let id = *self.folder_paths.entry(path.to_path_buf()).or_insert_with(|| {
            let id = FolderId::new(self.next_folder_id.fetch_add(1, Ordering::Relaxed));
            self.folders.insert(
                id,
                FolderRecord {
                    id,
                    path: path.to_path_buf(),
                    parent_id,
                },
            );
            id
        });
        Ok(id)
    }

    fn paths_with_hash(&self, hash: &ContentHash) -> Result<Vec<PathBuf>, StoreError> {
        let mut paths: Vec<_> = self
            .entries
            .iter()
            .filter(|e| e.hash.as_ref() == Some(hash))
            .map(|e| e.path.clone())
            .collect();
        paths.sort();
        Ok(paths)
    }

    fn entry_count(&self) -> Result<usize, StoreError> {
        Ok(self.entries.len())
    }

    fn folder_count(&self) -> Result<usize, StoreError> {
        Ok(self.folders.len())
    }
}
