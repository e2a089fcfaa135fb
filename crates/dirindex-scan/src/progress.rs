//! Walk progress counters.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Point-in-time copy of the progress counters.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressSnapshot {
    /// Files and symlinks processed so far.
    pub files_processed: u64,
    /// Bytes of those entries, by metadata size.
    pub bytes_processed: u64,
    /// Most recently processed path.
    pub last_path: PathBuf,
    /// Time elapsed since the counter was created.
    pub elapsed: Duration,
}

/// Counters shared between the walker (one writer) and reporters.
///
/// The counts are plain atomics. The last path sits behind a short-lived
/// lock so a reader never observes a torn path.
#[derive(Debug)]
pub struct ProgressCounter {
    files: AtomicU64,
    bytes: AtomicU64,
    last_path: Mutex<PathBuf>,
    start: Instant,
}

impl ProgressCounter {
    pub fn new() -> Self {
        Self {
            files: AtomicU64::new(0),
            bytes: AtomicU64::new(0),
            last_path: Mutex::new(PathBuf::new()),
            start: Instant::now(),
        }
    }

    /// Record one processed entry.
    pub fn update(&self, path: &Path, size: u64) {
        self.files.fetch_add(1, Ordering::Relaxed);
        self.bytes.fetch_add(size, Ordering::Relaxed);
        let mut last = self.last_path.lock();
        last.clear();
        last.push(path);
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            files_processed: self.files.load(Ordering::Relaxed),
            bytes_processed: self.bytes.load(Ordering::Relaxed),
            last_path: self.last_path.lock().clone(),
            elapsed: self.start.elapsed(),
        }
    }
}

impl Default for ProgressCounter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_update_accumulates() {
        let progress = ProgressCounter::new();
        progress.update(Path::new("/a/one"), 10);
        progress.update(Path::new("/a/two"), 32);

        let snapshot = progress.snapshot();
        assert_eq!(snapshot.files_processed, 2);
        assert_eq!(snapshot.bytes_processed, 42);
        assert_eq!(snapshot.last_path, PathBuf::from("/a/two"));
    }

    #[test]
    fn test_empty_snapshot() {
        let snapshot = ProgressCounter::default().snapshot();
        assert_eq!(snapshot.files_processed, 0);
        assert!(snapshot.last_path.as_os_str().is_empty());
    }

    #[test]
    fn test_readers_see_consistent_totals() {
        let progress = Arc::new(ProgressCounter::new());
        let writer = {
            let progress = progress.clone();
            std::thread::spawn(move || {
                for i in 0..1000 {
                    progress.update(Path::new(&format!("/f/{i}")), 1);
                }
            })
        };

        let mut last = 0;
        while !writer.is_finished() {
            let seen = progress.snapshot().files_processed;
            assert!(seen >= last);
            last = seen;
        }
        writer.join().unwrap();

        let snapshot = progress.snapshot();
        assert_eq!(snapshot.files_processed, 1000);
        assert_eq!(snapshot.bytes_processed, 1000);
    }
}
