//! Catalog persistence for dirindex.
//!
//! The walker only needs point lookups and upsert-by-key writes; those are
//! described by the [`Catalog`] trait. Two engines are provided:
//!
//! - [`SledCatalog`], an on-disk store built on sled trees, used by the CLI;
//! - [`MemoryCatalog`], a concurrent in-memory map for tests and dry runs.
//!
//! On top of the trait sit the two lookups the walker performs for every
//! entry: [`FolderIndex`] (directory path to folder id, creating parent
//! chains on demand) and [`ErrorMemo`] (skip paths that failed before).
//!
//! # Example
//!
//! ```rust,no_run
//! use dirindex_store::{Catalog, FolderIndex, SledCatalog};
//! use std::path::Path;
//!
//! let catalog = SledCatalog::open("index.db").unwrap();
//! let mut folders = FolderIndex::new(&catalog);
//! let id = folders.resolve(Path::new("/var/log")).unwrap();
//!
//! let folder = catalog.folder(id).unwrap().unwrap();
//! assert_eq!(folder.path, Path::new("/var/log"));
//! ```

mod catalog;
mod error;
mod folders;
mod memo;
mod memory;
mod sled_store;

pub use catalog::Catalog;
pub use error::StoreError;
pub use folders::FolderIndex;
pub use memo::ErrorMemo;
pub use memory::MemoryCatalog;
pub use sled_store::SledCatalog;

// Re-export core types for convenience
pub use dirindex_core::{ContentHash, FileEntryRecord, FolderId, FolderRecord};
