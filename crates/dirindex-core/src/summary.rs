//! Per-walk outcome counters.

use std::ops::AddAssign;

use serde::{Deserialize, Serialize};

/// What happened to the entries of one walk.
///
/// Unlike the live progress counters these are plain integers owned by the
/// walker and returned when a root has been processed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalkSummary {
    /// Directory records written.
    pub dirs: u64,
    /// Files whose content was hashed and stored.
    pub hashed: u64,
    /// Files left untouched because their modification time was unchanged.
    pub unchanged: u64,
    /// Symlink records written without a hash.
    pub symlinks: u64,
    pub fifos: u64,
    /// Sockets and devices.
    pub other: u64,
    pub excluded: u64,
    /// Error records written.
    pub errors: u64,
    /// Entries skipped because a previous run stored an error for them.
    pub skipped_errors: u64,
    /// Followed symlinks whose target had already been walked.
    pub symlink_loops: u64,
    /// Bytes streamed through the hasher.
    pub bytes_hashed: u64,
}

impl WalkSummary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of entries that reached a terminal outcome.
    pub fn total_entries(&self) -> u64 {
        self.dirs
            + self.hashed
            + self.unchanged
            + self.symlinks
            + self.fifos
            + self.other
            + self.excluded
            + self.errors
            + self.skipped_errors
    }
}

impl AddAssign for WalkSummary {
    fn add_assign(&mut self, rhs: Self) {
        self.dirs += rhs.dirs;
        self.hashed += rhs.hashed;
        self.unchanged += rhs.unchanged;
        self.symlinks += rhs.symlinks;
        self.fifos += rhs.fifos;
        self.other += rhs.other;
        self.excluded += rhs.excluded;
        self.errors += rhs.errors;
        self.skipped_errors += rhs.skipped_errors;
        self.symlink_loops += rhs.symlink_loops;
        self.bytes_hashed += rhs.bytes_hashed;
    }
}
