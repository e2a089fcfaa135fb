//! Resolved symlink target tracking.

use std::path::{Path, PathBuf};

use dashmap::DashSet;

/// Canonical directories already walked during one invocation.
///
/// Insertion doubles as the membership test: the first [`visit`] of a
/// target returns `true`, every later one `false`, so a cycle of links is
/// walked once and then reported.
///
/// [`visit`]: VisitedTargets::visit
#[derive(Debug, Default)]
pub struct VisitedTargets {
    seen: DashSet<PathBuf>,
}

impl VisitedTargets {
    pub fn new() -> Self {
        Self {
            seen: DashSet::new(),
        }
    }

    /// Mark a target visited. Returns `true` if it had not been seen.
    pub fn visit(&self, target: &Path) -> bool {
        self.seen.insert(target.to_path_buf())
    }

    pub fn has_visited(&self, target: &Path) -> bool {
        self.seen.contains(target)
    }
}
