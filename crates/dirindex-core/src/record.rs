//! Persisted catalog records.

use std::fmt;
use std::fs::Metadata;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, SubsecRound, Utc};
use compact_str::CompactString;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use strum::{AsRefStr, Display, EnumString};

use crate::error::EntryError;

/// Surrogate key of a folder row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FolderId(pub u64);

impl FolderId {
    /// Create a new FolderId from a u64.
    pub fn new(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for FolderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// SHA-256 content digest.
///
/// Serialized as a lower-case hex string so catalog rows stay readable
/// and the hash index can be keyed by the same text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentHash(pub [u8; 32]);

impl ContentHash {
    /// Create a new ContentHash from raw bytes.
    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the hash as a hex string.
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }

    /// Parse a 64 character hex string.
    pub fn from_hex(hex: &str) -> Option<Self> {
        if hex.len() != 64 || !hex.is_ascii() {
            return None;
        }
        let mut bytes = [0u8; 32];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16).ok()?;
        }
        Some(Self(bytes))
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for ContentHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ContentHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let hex = String::deserialize(deserializer)?;
        Self::from_hex(&hex)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid content hash: {hex}")))
    }
}

/// Type of a catalogued entry.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum EntryKind {
    File,
    #[strum(serialize = "dir")]
    #[serde(rename = "dir")]
    Directory,
    Symlink,
    Fifo,
    /// Sockets, block and character devices.
    Other,
}

impl EntryKind {
    /// Classify a file type as returned by `lstat`.
    pub fn from_file_type(file_type: std::fs::FileType) -> Self {
        if file_type.is_dir() {
            Self::Directory
        } else if file_type.is_symlink() {
            Self::Symlink
        } else if file_type.is_file() {
            Self::File
        } else if is_fifo(file_type) {
            Self::Fifo
        } else {
            Self::Other
        }
    }

    /// Check if this is a directory.
    pub fn is_dir(&self) -> bool {
        matches!(self, Self::Directory)
    }
}

#[cfg(unix)]
fn is_fifo(file_type: std::fs::FileType) -> bool {
    use std::os::unix::fs::FileTypeExt;
    file_type.is_fifo()
}

#[cfg(not(unix))]
fn is_fifo(_file_type: std::fs::FileType) -> bool {
    false
}

/// One catalog row per filesystem path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntryRecord {
    /// Absolute path, the primary key.
    pub path: PathBuf,

    /// Final path component.
    pub name: CompactString,

    /// Suffix of the name starting at its last `.`, empty when none.
    pub extension: CompactString,

    pub kind: EntryKind,

    pub created: Option<DateTime<Utc>>,

    /// Modification time at second resolution. Drives the incremental skip.
    pub modified: Option<DateTime<Utc>>,

    /// Size in bytes, zero for directories.
    pub size: u64,

    pub hash: Option<ContentHash>,

    pub symlink_target: Option<PathBuf>,

    /// First exclusion pattern that matched this path.
    pub exclusion_pattern: Option<String>,

    /// Last error recorded for this path.
    pub error: Option<String>,

    /// Folder that contains this entry.
    pub folder_id: Option<FolderId>,
}

impl FileEntryRecord {
    /// Create a bare record for a path with name and extension filled in.
    pub fn new(path: impl Into<PathBuf>, kind: EntryKind) -> Self {
        let path = path.into();
        let name = file_name_of(&path);
        let extension = CompactString::new(extension_of(&name));
        Self {
            path,
            name,
            extension,
            kind,
            created: None,
            modified: None,
            size: 0,
            hash: None,
            symlink_target: None,
            exclusion_pattern: None,
            error: None,
            folder_id: None,
        }
    }

    /// Create a record carrying an entry-level error and nothing else.
    pub fn failed(
        path: impl Into<PathBuf>,
        kind: EntryKind,
        folder_id: Option<FolderId>,
        error: &EntryError,
    ) -> Self {
        let mut record = Self::new(path, kind);
        record.folder_id = folder_id;
        record.error = Some(error.to_string());
        record
    }

    /// Fill timestamps and size from filesystem metadata.
    pub fn with_metadata(mut self, metadata: &Metadata) -> Self {
        let modified = metadata.modified().ok().map(timestamp);
        self.modified = modified;
        self.created = creation_time(metadata).map(timestamp).or(modified);
        self.size = if metadata.is_dir() { 0 } else { metadata.len() };
        self
    }

    pub fn with_folder(mut self, folder_id: Option<FolderId>) -> Self {
        self.folder_id = folder_id;
        self
    }

    /// Check whether the entry is marked with a stored error.
    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }

    pub fn is_excluded(&self) -> bool {
        self.exclusion_pattern.is_some()
    }
}

/// One row per directory ever traversed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderRecord {
    pub id: FolderId,
    pub path: PathBuf,
    /// `None` only for the filesystem root.
    pub parent_id: Option<FolderId>,
}

/// Convert a system time to the catalog's timestamp resolution.
pub fn timestamp(time: SystemTime) -> DateTime<Utc> {
    DateTime::<Utc>::from(time).trunc_subsecs(0)
}

/// Extension of a file name, including the leading dot.
///
/// Dot-files count as all extension (`.bashrc` -> `.bashrc`).
pub fn extension_of(name: &str) -> &str {
    name.rfind('.').map(|i| &name[i..]).unwrap_or("")
}

fn file_name_of(path: &Path) -> CompactString {
    path.file_name()
        .map(|n| CompactString::new(n.to_string_lossy()))
        .unwrap_or_else(|| CompactString::new(path.to_string_lossy()))
}

/// Creation time as recorded by the platform.
///
/// Linux reports the inode change time, the closest portable stand-in for
/// a birth time on filesystems that do not expose one.
#[cfg(target_os = "linux")]
fn creation_time(metadata: &Metadata) -> Option<SystemTime> {
    use std::os::unix::fs::MetadataExt;
    let secs = u64::try_from(metadata.ctime()).ok()?;
    let nanos = u32::try_from(metadata.ctime_nsec()).ok()?;
    SystemTime::UNIX_EPOCH.checked_add(std::time::Duration::new(secs, nanos))
}

#[cfg(not(target_os = "linux"))]
fn creation_time(metadata: &Metadata) -> Option<SystemTime> {
    metadata.created().ok()
}
