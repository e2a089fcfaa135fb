//! Incremental tree walking engine for dirindex.
//!
//! This crate walks directory trees sequentially and keeps a catalog in
//! step with them.
//!
//! # Overview
//!
//! `dirindex-scan` decides, entry by entry, what to store:
//!
//! - **Exclusions** halt descent into matched directories
//! - **Remembered errors** are skipped unless retry is requested
//! - **Unchanged files** (same modification time) keep their stored hash
//! - **Everything else** is hashed with SHA-256 and upserted
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use dirindex_scan::{IndexConfig, ProgressCounter, TreeWalker};
//! use dirindex_store::SledCatalog;
//!
//! let catalog = SledCatalog::open("index.db").unwrap();
//! let progress = Arc::new(ProgressCounter::new());
//! let mut walker = TreeWalker::new(&catalog, &IndexConfig::default(), progress);
//!
//! let summary = walker.walk("/srv/data".as_ref()).unwrap();
//! println!("Hashed {} files", summary.hashed);
//! ```
//!
//! # Progress Monitoring
//!
//! Share the counter with a [`StatusReporter`] to redraw a status line
//! while the walk runs:
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use dirindex_scan::{ProgressCounter, StatusReporter};
//!
//! # async fn run() {
//! let progress = Arc::new(ProgressCounter::new());
//! let reporter = StatusReporter::spawn(progress.clone(), Duration::from_secs(1), 80);
//! // ... walk on a blocking task ...
//! reporter.shutdown().await;
//! # }
//! ```

mod hasher;
mod progress;
mod report;
mod visited;
mod walker;

pub use hasher::{HashOutput, Hasher};
pub use progress::{ProgressCounter, ProgressSnapshot};
pub use report::{StatusReporter, status_lines, terminal_width, truncate_path};
pub use visited::VisitedTargets;
pub use walker::TreeWalker;

// Re-export core types for convenience
pub use dirindex_core::{
    ContentHash, EntryError, EntryKind, ExclusionPatterns, FileEntryRecord, HashError,
    IndexConfig, IndexError, WalkSummary,
};
