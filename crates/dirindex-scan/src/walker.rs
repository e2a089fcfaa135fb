//! Sequential incremental tree walker.

use std::fs::{self, Metadata};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, error, info, warn};
use walkdir::{DirEntry, WalkDir};

use dirindex_core::{
    EntryError, EntryKind, ExclusionPatterns, FileEntryRecord, FolderId, IndexConfig, IndexError,
    WalkSummary,
};
use dirindex_store::{Catalog, ErrorMemo, FolderIndex};

use crate::hasher::Hasher;
use crate::progress::ProgressCounter;
use crate::visited::VisitedTargets;

/// What the walk does after an entry has been visited.
#[derive(Debug, PartialEq, Eq)]
enum Visit {
    /// Keep going; directories are entered.
    Descend,
    /// Do not enter this directory.
    Prune,
    /// Walk this canonical directory as a nested root.
    Follow(PathBuf),
}

/// Walks directory trees and keeps a catalog in step with them.
///
/// Every entry is fully classified, possibly hashed and written before the
/// next one is read. The walker owns the per-invocation state: the folder
/// id cache and the set of symlink targets already walked. Reuse one walker
/// across several roots so links shared between them are followed once.
pub struct TreeWalker<'a, C: Catalog + ?Sized> {
    catalog: &'a C,
    folders: FolderIndex<'a, C>,
    memo: ErrorMemo<'a, C>,
    exclusions: ExclusionPatterns,
    hasher: Hasher,
    progress: Arc<ProgressCounter>,
    visited: VisitedTargets,
    follow_symlinks: bool,
}

impl<'a, C: Catalog + ?Sized> TreeWalker<'a, C> {
    pub fn new(catalog: &'a C, config: &IndexConfig, progress: Arc<ProgressCounter>) -> Self {
        Self {
            catalog,
            folders: FolderIndex::new(catalog),
            memo: ErrorMemo::new(catalog, config.retry_errors),
            exclusions: config.exclusions(),
            hasher: Hasher::instrumented(config.instrument_hashing),
            progress,
            visited: VisitedTargets::new(),
            follow_symlinks: config.follow_symlinks,
        }
    }

    /// Replace the exclusion list built from the config.
    pub fn with_exclusions(mut self, exclusions: ExclusionPatterns) -> Self {
        self.exclusions = exclusions;
        self
    }

    pub fn exclusions(&self) -> &ExclusionPatterns {
        &self.exclusions
    }

    /// Symlink targets walked so far.
    pub fn visited(&self) -> &VisitedTargets {
        &self.visited
    }

    /// Walk one root.
    ///
    /// Entry-level failures are written to the catalog and counted in the
    /// summary. Only a root that cannot be made absolute fails the call.
    pub fn walk(&mut self, root: &Path) -> Result<WalkSummary, IndexError> {
        let root = std::path::absolute(root).map_err(|e| IndexError::io(root, e))?;
        // A symlinked root registers its target when the link itself is visited.
        let is_link = fs::symlink_metadata(&root).is_ok_and(|m| m.file_type().is_symlink());
        if !is_link {
            if let Ok(canonical) = root.canonicalize() {
                self.visited.visit(&canonical);
            }
        }

        info!(root = %root.display(), "walking");
        let mut summary = WalkSummary::new();
        self.walk_tree(&root, &mut summary);
        info!(
            root = %root.display(),
            entries = summary.total_entries(),
            hashed = summary.hashed,
            unchanged = summary.unchanged,
            errors = summary.errors,
            "walk finished"
        );
        Ok(summary)
    }

    fn walk_tree(&mut self, root: &Path, summary: &mut WalkSummary) {
        let mut entries = WalkDir::new(root)
            .follow_links(false)
            .follow_root_links(false)
            .sort_by_file_name()
            .into_iter();

        while let Some(next) = entries.next() {
            let entry = match next {
                Ok(entry) => entry,
                Err(err) => {
                    self.record_walk_error(err, summary);
                    continue;
                }
            };

            match self.visit(&entry, summary) {
                Visit::Descend => {}
                Visit::Prune => {
                    // On a non-directory this would skip the remaining siblings.
                    if entry.file_type().is_dir() {
                        entries.skip_current_dir();
                    }
                }
                Visit::Follow(target) => {
                    debug!(link = %entry.path().display(), target = %target.display(), "following symlink");
                    self.walk_tree(&target, summary);
                }
            }
        }
    }

    fn visit(&mut self, entry: &DirEntry, summary: &mut WalkSummary) -> Visit {
        let path = entry.path();

        match self.memo.should_skip(path) {
            Ok(true) => {
                debug!(path = %path.display(), "skipping remembered error");
                summary.skipped_errors += 1;
                return Visit::Prune;
            }
            Ok(false) => {}
            Err(err) => {
                error!(path = %path.display(), error = %err, "error memo lookup failed");
            }
        }

        let kind = EntryKind::from_file_type(entry.file_type());
        let folder_id = match self.folders.resolve(path.parent().unwrap_or(path)) {
            Ok(id) => id,
            Err(err) => {
                let err = EntryError::FolderResolution(Box::new(err));
                self.record_error(path, kind, None, err, summary);
                return Visit::Prune;
            }
        };

        let metadata = match fs::symlink_metadata(path) {
            Ok(metadata) => metadata,
            Err(err) => {
                self.record_error(path, kind, Some(folder_id), EntryError::Metadata(err), summary);
                return Visit::Prune;
            }
        };
        let kind = EntryKind::from_file_type(metadata.file_type());

        let link_target = if kind == EntryKind::Symlink {
            match fs::read_link(path) {
                Ok(target) => Some(target),
                Err(err) => {
                    let err = EntryError::SymlinkRead(err);
                    self.record_error(path, kind, Some(folder_id), err, summary);
                    return Visit::Prune;
                }
            }
        } else {
            None
        };

        if kind == EntryKind::Fifo {
            summary.fifos += 1;
            self.record_error(path, kind, Some(folder_id), EntryError::Fifo, summary);
            return Visit::Prune;
        }

        let mut record = FileEntryRecord::new(path, kind)
            .with_metadata(&metadata)
            .with_folder(Some(folder_id));
        record.symlink_target = link_target;

        if let Some(pattern) = self.exclusions.first_match(path) {
            debug!(path = %path.display(), pattern, "excluded");
            record.exclusion_pattern = Some(pattern.to_string());
            summary.excluded += 1;
            self.write(&record);
            return Visit::Prune;
        }

        match kind {
            EntryKind::Directory => {
                summary.dirs += 1;
                self.write(&record);
                // Register the directory itself so empty leaves get a folder row.
                if let Err(err) = self.folders.resolve(path) {
                    warn!(path = %path.display(), error = %err, "could not register folder");
                }
                Visit::Descend
            }
            EntryKind::Symlink => self.visit_symlink(record, summary),
            EntryKind::File => {
                self.index_file(record, summary);
                Visit::Descend
            }
            EntryKind::Fifo | EntryKind::Other => {
                summary.other += 1;
                self.write(&record);
                Visit::Descend
            }
        }
    }

    fn visit_symlink(&mut self, record: FileEntryRecord, summary: &mut WalkSummary) -> Visit {
        if !self.follow_symlinks {
            summary.symlinks += 1;
            self.progress.update(&record.path, record.size);
            self.write(&record);
            return Visit::Descend;
        }

        let target: Metadata = match fs::metadata(&record.path) {
            Ok(target) => target,
            Err(err) => {
                warn!(path = %record.path.display(), error = %err, "dangling symlink");
                summary.symlinks += 1;
                self.progress.update(&record.path, record.size);
                self.write(&record);
                return Visit::Descend;
            }
        };

        if target.is_file() {
            // Index the link like the file it points at.
            let mut followed = FileEntryRecord::new(&record.path, EntryKind::File)
                .with_metadata(&target)
                .with_folder(record.folder_id);
            followed.symlink_target = record.symlink_target;
            self.index_file(followed, summary);
            return Visit::Descend;
        }

        summary.symlinks += 1;
        self.progress.update(&record.path, record.size);
        self.write(&record);

        if !target.is_dir() {
            return Visit::Descend;
        }

        let canonical = match record.path.canonicalize() {
            Ok(canonical) => canonical,
            Err(err) => {
                warn!(path = %record.path.display(), error = %err, "cannot resolve symlink target");
                return Visit::Descend;
            }
        };

        if self.visited.visit(&canonical) {
            Visit::Follow(canonical)
        } else {
            summary.symlink_loops += 1;
            let err = EntryError::SymlinkLoop { target: canonical };
            self.record_error(&record.path, record.kind, record.folder_id, err, summary);
            Visit::Descend
        }
    }

    /// Hash a regular file unless its stored record is still current.
    ///
    /// A stored record counts as current only if it has the same modification
    /// time and carries a hash, so error and excluded rows are re-evaluated.
    fn index_file(&mut self, mut record: FileEntryRecord, summary: &mut WalkSummary) {
        self.progress.update(&record.path, record.size);

        match self.catalog.entry(&record.path) {
            Ok(Some(stored))
                if stored.hash.is_some()
                    && stored.modified.is_some()
                    && stored.modified == record.modified =>
            {
                summary.unchanged += 1;
                return;
            }
            Ok(_) => {}
            Err(err) => {
                error!(path = %record.path.display(), error = %err, "stored entry lookup failed");
            }
        }

        match self.hasher.hash_file(&record.path) {
            Ok(output) => {
                record.hash = Some(output.hash);
                summary.hashed += 1;
                summary.bytes_hashed += output.bytes;
                self.write(&record);
            }
            Err(err) => {
                let (path, kind, folder_id) = (record.path, record.kind, record.folder_id);
                self.record_error(&path, kind, folder_id, EntryError::Hash(err), summary);
            }
        }
    }

    fn record_error(
        &self,
        path: &Path,
        kind: EntryKind,
        folder_id: Option<FolderId>,
        err: EntryError,
        summary: &mut WalkSummary,
    ) {
        if err.is_policy_skip() {
            debug!(path = %path.display(), "{err}");
        } else {
            warn!(path = %path.display(), "{err}");
            summary.errors += 1;
        }
        if err.is_recorded() {
            self.write(&FileEntryRecord::failed(path, kind, folder_id, &err));
        }
    }

    fn record_walk_error(&self, err: walkdir::Error, summary: &mut WalkSummary) {
        let Some(path) = err.path().map(Path::to_path_buf) else {
            warn!(error = %err, "walk error without a path");
            summary.errors += 1;
            return;
        };

        let message = err.to_string();
        let source = err.into_io_error().unwrap_or_else(|| io::Error::other(message));
        self.record_listing_error(&path, source, summary);
    }

    /// Overwrite the record of a path that could not be reached or listed.
    fn record_listing_error(&self, path: &Path, source: io::Error, summary: &mut WalkSummary) {
        let kind = fs::symlink_metadata(path)
            .map(|m| EntryKind::from_file_type(m.file_type()))
            .unwrap_or(EntryKind::File);
        self.record_error(path, kind, None, EntryError::WalkEnumeration(source), summary);
    }

    /// Upsert a record. Catalog failures are logged and the walk goes on.
    fn write(&self, record: &FileEntryRecord) {
        if let Err(err) = self.catalog.upsert_entry(record) {
            error!(path = %record.path.display(), error = %err, "failed to write entry");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dirindex_store::MemoryCatalog;
    use std::fs;
    use tempfile::TempDir;

    fn walker(catalog: &MemoryCatalog, config: IndexConfig) -> TreeWalker<'_, MemoryCatalog> {
        TreeWalker::new(catalog, &config, Arc::new(ProgressCounter::new()))
    }

    #[test]
    fn test_walk_records_every_entry() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join("sub")).unwrap();
        fs::write(temp.path().join("sub/a.bin"), b"abc").unwrap();
        fs::write(temp.path().join("top.txt"), b"").unwrap();

        let catalog = MemoryCatalog::new();
        let summary = walker(&catalog, IndexConfig::default()).walk(temp.path()).unwrap();

        assert_eq!(summary.dirs, 2);
        assert_eq!(summary.hashed, 2);
        assert_eq!(summary.bytes_hashed, 3);
        assert_eq!(catalog.entry_count().unwrap(), 4);

        let dir = catalog.entry(&temp.path().join("sub")).unwrap().unwrap();
        assert_eq!(dir.kind, EntryKind::Directory);
        assert!(dir.hash.is_none());
        assert_eq!(dir.size, 0);
    }

    #[test]
    fn test_excluded_file_is_not_hashed() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("notes.txt"), b"secret").unwrap();

        let catalog = MemoryCatalog::new();
        let config = IndexConfig::builder()
            .exclude_patterns(vec!["*.txt".to_string()])
            .build()
            .unwrap();
        let summary = walker(&catalog, config).walk(temp.path()).unwrap();

        assert_eq!(summary.excluded, 1);
        assert_eq!(summary.hashed, 0);
        let record = catalog.entry(&temp.path().join("notes.txt")).unwrap().unwrap();
        assert_eq!(record.exclusion_pattern.as_deref(), Some("*.txt"));
        assert!(record.hash.is_none());
        assert_eq!(record.size, 6);
    }

    #[test]
    fn test_progress_counts_files_only() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join("d")).unwrap();
        fs::write(temp.path().join("d/f"), b"12345").unwrap();

        let catalog = MemoryCatalog::new();
        let progress = Arc::new(ProgressCounter::new());
        TreeWalker::new(&catalog, &IndexConfig::default(), progress.clone())
            .walk(temp.path())
            .unwrap();

        let snapshot = progress.snapshot();
        assert_eq!(snapshot.files_processed, 1);
        assert_eq!(snapshot.bytes_processed, 5);
        assert_eq!(snapshot.last_path, temp.path().join("d/f"));
    }

    #[test]
    fn test_missing_root_is_recorded() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("gone");

        let catalog = MemoryCatalog::new();
        let summary = walker(&catalog, IndexConfig::default()).walk(&missing).unwrap();

        assert_eq!(summary.errors, 1);
        let record = catalog.entry(&missing).unwrap().unwrap();
        assert!(record.error.unwrap().starts_with("walking file: "));
    }

    #[cfg(unix)]
    #[test]
    fn test_unfollowed_symlink_has_target_and_no_hash() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("real"), b"data").unwrap();
        std::os::unix::fs::symlink("real", temp.path().join("link")).unwrap();

        let catalog = MemoryCatalog::new();
        let summary = walker(&catalog, IndexConfig::default()).walk(temp.path()).unwrap();

        assert_eq!(summary.symlinks, 1);
        let link = catalog.entry(&temp.path().join("link")).unwrap().unwrap();
        assert_eq!(link.kind, EntryKind::Symlink);
        assert_eq!(link.symlink_target, Some(PathBuf::from("real")));
        assert!(link.hash.is_none());
    }

    #[cfg(unix)]
    #[test]
    fn test_followed_file_symlink_is_hashed() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("real"), b"data").unwrap();
        std::os::unix::fs::symlink("real", temp.path().join("link")).unwrap();

        let catalog = MemoryCatalog::new();
        let config = IndexConfig::builder().follow_symlinks(true).build().unwrap();
        walker(&catalog, config).walk(temp.path()).unwrap();

        let real = catalog.entry(&temp.path().join("real")).unwrap().unwrap();
        let link = catalog.entry(&temp.path().join("link")).unwrap().unwrap();
        assert_eq!(link.kind, EntryKind::File);
        assert_eq!(link.hash, real.hash);
        assert_eq!(link.symlink_target, Some(PathBuf::from("real")));
    }

    #[cfg(unix)]
    #[test]
    fn test_followed_file_symlink_counted_once() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("real"), b"data").unwrap();
        std::os::unix::fs::symlink("real", temp.path().join("link")).unwrap();

        let catalog = MemoryCatalog::new();
        let config = IndexConfig::builder().follow_symlinks(true).build().unwrap();
        let summary = walker(&catalog, config).walk(temp.path()).unwrap();

        assert_eq!(summary.symlinks, 0);
        assert_eq!(summary.hashed, 2);
        assert_eq!(summary.total_entries(), catalog.entry_count().unwrap() as u64);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_hash_failure_is_recorded_and_indexing_goes_on() {
        let temp = TempDir::new().unwrap();
        // Opening a directory succeeds on Linux but reading it fails.
        let unreadable = temp.path().join("unreadable");
        fs::create_dir(&unreadable).unwrap();
        let good = temp.path().join("good");
        fs::write(&good, b"hello").unwrap();

        let catalog = MemoryCatalog::new();
        let mut walker = walker(&catalog, IndexConfig::default());
        let mut summary = WalkSummary::new();

        walker.index_file(FileEntryRecord::new(&unreadable, EntryKind::File), &mut summary);
        let metadata = fs::metadata(&good).unwrap();
        walker.index_file(
            FileEntryRecord::new(&good, EntryKind::File).with_metadata(&metadata),
            &mut summary,
        );

        let failed = catalog.entry(&unreadable).unwrap().unwrap();
        assert!(failed.error.unwrap().starts_with("hashing file: "));
        assert!(failed.hash.is_none());

        assert!(catalog.entry(&good).unwrap().unwrap().hash.is_some());
        assert_eq!(summary.errors, 1);
        assert_eq!(summary.hashed, 1);
    }

    #[test]
    fn test_listing_error_replaces_directory_record() {
        let temp = TempDir::new().unwrap();
        let sub = temp.path().join("sub");
        fs::create_dir(&sub).unwrap();
        fs::write(sub.join("x"), b"1").unwrap();
        fs::write(temp.path().join("z"), b"2").unwrap();

        let catalog = MemoryCatalog::new();
        let mut walker = walker(&catalog, IndexConfig::default());
        let mut summary = walker.walk(temp.path()).unwrap();

        let denied = io::Error::from(io::ErrorKind::PermissionDenied);
        walker.record_listing_error(&sub, denied, &mut summary);

        let record = catalog.entry(&sub).unwrap().unwrap();
        assert_eq!(record.kind, EntryKind::Directory);
        assert!(record.error.unwrap().starts_with("walking file: "));
        assert!(record.folder_id.is_none());
        assert_eq!(summary.errors, 1);
        assert!(catalog.entry(&temp.path().join("z")).unwrap().unwrap().hash.is_some());

        // The next run leaves the failed directory alone.
        let rerun = super::TreeWalker::new(
            &catalog,
            &IndexConfig::default(),
            Arc::new(ProgressCounter::new()),
        )
        .walk(temp.path())
        .unwrap();
        assert_eq!(rerun.skipped_errors, 1);
    }
}
