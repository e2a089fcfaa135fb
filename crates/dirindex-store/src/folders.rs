//! Folder identity resolution.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use dirindex_core::FolderId;

use crate::catalog::Catalog;
use crate::error::StoreError;

/// Resolves directory paths to folder ids, creating missing ancestors.
///
/// Resolved ids are cached by path, so within one walk every directory costs
/// at most one catalog round-trip. Resolution walks up the path until it
/// reaches a known folder (or the filesystem root) and then inserts the
/// unknown part of the chain top-down, so no folder row is ever written
/// before its parent.
pub struct FolderIndex<'a, C: Catalog + ?Sized> {
    catalog: &'a C,
    cache: HashMap<PathBuf, FolderId>,
    inserted: u64,
}

impl<'a, C: Catalog + ?Sized> FolderIndex<'a, C> {
    pub fn new(catalog: &'a C) -> Self {
        Self {
            catalog,
            cache: HashMap::new(),
            inserted: 0,
        }
    }

    /// Return the id of `dir`, creating it and any missing ancestors.
    pub fn resolve(&mut self, dir: &Path) -> Result<FolderId, StoreError> {
        if let Some(&id) = self.cache.get(dir) {
            return Ok(id);
        }

        let mut missing = Vec::new();
        let mut known = None;
        let mut current = Some(dir);

        while let Some(path) = current {
            if let Some(&id) = self.cache.get(path) {
                known = Some(id);
                break;
            }
            if let Some(folder) = self.catalog.folder_by_path(path)? {
                self.cache.insert(path.to_path_buf(), folder.id);
                known = Some(folder.id);
                break;
            }
            missing.push(path);
            current = path.parent();
        }

        let mut resolved = known;
        for path in missing.into_iter().rev() {
            let id = self.catalog.insert_folder(path, resolved)?;
            tracing::trace!(path = %path.display(), %id, "created folder");
            self.cache.insert(path.to_path_buf(), id);
            self.inserted += 1;
            resolved = Some(id);
        }

        resolved.ok_or(StoreError::EmptyPath)
    }

    /// Number of folder rows this index created.
    pub fn inserted(&self) -> u64 {
        self.inserted
    }
}
