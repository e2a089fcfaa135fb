//! Core types and traits for dirindex.
//!
//! This crate provides the data structures shared by the catalog and the
//! tree walker: persisted entry and folder records, walk configuration,
//! error kinds, and the exclusion-pattern matcher.

mod config;
mod error;
mod patterns;
mod record;
mod summary;

pub use config::{IndexConfig, IndexConfigBuilder};
pub use error::{EntryError, HashError, IndexError};
pub use patterns::{ExclusionPattern, ExclusionPatterns, pattern_matches};
pub use record::{
    ContentHash, EntryKind, FileEntryRecord, FolderId, FolderRecord, extension_of, timestamp,
};
pub use summary::WalkSummary;
