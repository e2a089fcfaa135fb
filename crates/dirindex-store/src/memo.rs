//! Remembered entry errors.

use std::path::Path;

use crate::catalog::Catalog;
use crate::error::StoreError;

/// Decides whether a path is skipped because an earlier run failed on it.
pub struct ErrorMemo<'a, C: Catalog + ?Sized> {
    catalog: &'a C,
    retry: bool,
}

impl<'a, C: Catalog + ?Sized> ErrorMemo<'a, C> {
    /// With `retry` set, remembered errors never cause a skip.
    pub fn new(catalog: &'a C, retry: bool) -> Self {
        Self { catalog, retry }
    }

    pub fn should_skip(&self, path: &Path) -> Result<bool, StoreError> {
        if self.retry {
            return Ok(false);
        }
        Ok(self.catalog.stored_error(path)?.is_some())
    }
}
