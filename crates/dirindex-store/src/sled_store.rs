//! On-disk catalog built on sled.
//!
//! Layout, one sled tree per keyspace:
//!
//! - `entries`: path bytes -> JSON [`FileEntryRecord`]
//! - `folders`: big-endian folder id -> JSON [`FolderRecord`]
//! - `folder_paths`: path bytes -> big-endian folder id (unique path index)
//! - `hash_index`: hex hash, `0x00`, path bytes -> JSON path

use std::path::{Path, PathBuf};

use dirindex_core::{ContentHash, FileEntryRecord, FolderId, FolderRecord};
use sled::{Db, Tree};

use crate::catalog::Catalog;
use crate::error::StoreError;

/// Catalog persisted in a sled database directory.
pub struct SledCatalog {
    db: Db,
    entries: Tree,
    folders: Tree,
    folder_paths: Tree,
    hash_index: Tree,
}

impl SledCatalog {
    /// Open or create a catalog at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let db = sled::open(path.as_ref())?;
        Self::from_db(db)
    }

    /// Create a catalog that is deleted when dropped.
    pub fn temporary() -> Result<Self, StoreError> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::from_db(db)
    }

    fn from_db(db: Db) -> Result<Self, StoreError> {
        Ok(Self {
            entries: db.open_tree("entries")?,
            folders: db.open_tree("folders")?,
            folder_paths: db.open_tree("folder_paths")?,
            hash_index: db.open_tree("hash_index")?,
            db,
        })
    }

    fn decode_entry(path: &Path, bytes: &[u8]) -> Result<FileEntryRecord, StoreError> {
        serde_json::from_slice(bytes)
            .map_err(|e| StoreError::decode(path.to_string_lossy(), e))
    }

    fn decode_folder_id(path: &Path, bytes: &[u8]) -> Result<FolderId, StoreError> {
        let raw: [u8; 8] = bytes
            .try_into()
            .map_err(|_| StoreError::CorruptFolderId {
                path: path.to_path_buf(),
            })?;
        Ok(FolderId::new(u64::from_be_bytes(raw)))
    }
}

fn path_key(path: &Path) -> &[u8] {
    path.as_os_str().as_encoded_bytes()
}

fn hash_prefix(hash: &ContentHash) -> Vec<u8> {
    let mut key = hash.to_hex().into_bytes();
    key.push(0);
    key
}

fn hash_key(hash: &ContentHash, path: &Path) -> Vec<u8> {
    let mut key = hash_prefix(hash);
    key.extend_from_slice(path_key(path));
    key
}

impl Catalog for SledCatalog {
    fn entry(&self, path: &Path) -> Result<Option<FileEntryRecord>, StoreError> {
        self.entries
            .get(path_key(path))?
            .map(|bytes| Self::decode_entry(path, &bytes))
            .transpose()
    }

    fn upsert_entry(&self, record: &FileEntryRecord) -> Result<(), StoreError> {
        let value = serde_json::to_vec(record).map_err(StoreError::Encode)?;
        let previous = self.entries.insert(path_key(&record.path), value)?;

        // Keep the hash index in step with the row it shadows.
        if let Some(previous) = previous {
            match Self::decode_entry(&record.path, &previous) {
                Ok(old) => {
                    if let Some(old_hash) = old.hash.filter(|h| Some(*h) != record.hash) {
                        self.hash_index.remove(hash_key(&old_hash, &record.path))?;
                    }
                }
                Err(err) => {
                    tracing::warn!(path = %record.path.display(), error = %err, "replaced undecodable entry");
                }
            }
        }

        if let Some(hash) = &record.hash {
            let path = serde_json::to_vec(&record.path).map_err(StoreError::Encode)?;
            self.hash_index.insert(hash_key(hash, &record.path), path)?;
        }
        Ok(())
    }

    fn folder(&self, id: FolderId) -> Result<Option<FolderRecord>, StoreError> {
        self.folders
            .get(id.0.to_be_bytes())?
            .map(|bytes| {
                serde_json::from_slice(&bytes)
                    .map_err(|e| StoreError::decode(format!("folder {id}"), e))
            })
            .transpose()
    }

    fn folder_by_path(&self, path: &Path) -> Result<Option<FolderRecord>, StoreError> {
        match self.folder_paths.get(path_key(path))? {
            Some(bytes) => self.folder(Self::decode_folder_id(path, &bytes)?),
            None => Ok(None),
        }
    }

    fn insert_folder(
        &self,
        path: &Path,
        parent_id: Option<FolderId>,
    ) -> Result<FolderId, StoreError> {
        if let Some(bytes) = self.folder_paths.get(path_key(path))? {
            return Self::decode_folder_id(path, &bytes);
        }

        // generate_id starts at zero; keep zero free so ids read like row ids.
        let id = FolderId::new(self.db.generate_id()? + 1);
        let record = FolderRecord {
            id,
            path: path.to_path_buf(),
            parent_id,
        };
        let value = serde_json::to_vec(&record).map_err(StoreError::Encode)?;

        self.folders.insert(id.0.to_be_bytes(), value)?;
        self.folder_paths.insert(path_key(path), id.0.to_be_bytes().to_vec())?;
        Ok(id)
    }

    fn paths_with_hash(&self, hash: &ContentHash) -> Result<Vec<PathBuf>, StoreError> {
        let mut paths = Vec::new();
        for item in self.hash_index.scan_prefix(hash_prefix(hash)) {
            let (key, value) = item?;
            let path: PathBuf = serde_json::from_slice(&value)
                .map_err(|e| StoreError::decode(String::from_utf8_lossy(&key), e))?;
            paths.push(path);
        }
        Ok(paths)
    }

    fn entry_count(&self) -> Result<usize, StoreError> {
        Ok(self.entries.len())
    }

    fn folder_count(&self) -> Result<usize, StoreError> {
        Ok(self.folders.len())
    }

    fn flush(&self) -> Result<(), StoreError> {
        self.db.flush()?;
        Ok(())
    }
}
