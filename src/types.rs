//! Core data types used throughout the isnapshot library
//!
//! ## Overview
//!
//! The types in this module represent:
//! - **File System State**: [`EntryKind`], [`FileStatus`] - what a source entry looked like when it was visited
//! - **Configuration**: [`SnapshotConfig`] - knobs for a snapshot run
//! - **Operations**: [`TransferStats`], [`SnapshotReport`] - results of a run
//!
//! ## Examples
//!
//! ```rust
//! use isnapshot::types::SnapshotConfig;
//!
//! let config = SnapshotConfig {
//!     force_full_copy: true,
//!     exclude_pattern: Some("*.tmp".to_string()),
//!     ..Default::default()
//! };
//! assert_eq!(config.date_format, "%m-%d-%y-%H-%M-%S");
//! ```

use crate::error::{Result, SnapshotError};
use crate::utils;
use filetime::FileTime;
use std::fs;
use std::os::unix::fs::{FileTypeExt, MetadataExt};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default snapshot directory name format (`month-day-year-hour-minute-second`)
pub const DEFAULT_DATE_FORMAT: &str = "%m-%d-%y-%H-%M-%S";

/// Default mode for the snapshot directory and its missing ancestors
pub const DEFAULT_SNAPSHOT_MODE: u32 = 0o755;

/// Kind of a filesystem entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// Regular file
    Regular,
    /// Directory
    Directory,
    /// Symbolic link (never followed)
    Symlink,
    /// Named pipe
    Fifo,
    /// Block device node
    BlockDevice,
    /// Character device node
    CharDevice,
    /// Unix domain socket
    Socket,
    /// Anything else the platform reports
    Unknown,
}

impl EntryKind {
    /// Classify a file type reported by `symlink_metadata`
    pub fn from_file_type(file_type: fs::FileType) -> Self {
        if file_type.is_symlink() {
            EntryKind::Symlink
        } else if file_type.is_dir() {
            EntryKind::Directory
        } else if file_type.is_file() {
            EntryKind::Regular
        } else if file_type.is_fifo() {
            EntryKind::Fifo
        } else if file_type.is_block_device() {
            EntryKind::BlockDevice
        } else if file_type.is_char_device() {
            EntryKind::CharDevice
        } else if file_type.is_socket() {
            EntryKind::Socket
        } else {
            EntryKind::Unknown
        }
    }

    /// Whether the entry is recreated with `mknod`
    pub fn is_node(self) -> bool {
        matches!(
            self,
            EntryKind::BlockDevice | EntryKind::CharDevice | EntryKind::Socket
        )
    }
}

/// Attributes of an entry captured once at visit time
///
/// Captured with link-status semantics: a symlink describes itself, not its
/// target. The same record drives the copy-or-link decision and is written
/// back onto the new copy, so an entry is never re-stat'ed mid-visit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileStatus {
    /// Entry kind
    pub kind: EntryKind,
    /// Size in bytes
    pub size: u64,
    /// Permission bits including setuid, setgid and sticky
    pub permissions: u32,
    /// Owner user id
    pub uid: u32,
    /// Owner group id
    pub gid: u32,
    /// Last modification time
    pub modified: FileTime,
    /// Last access time
    pub accessed: FileTime,
    /// Device number for device nodes
    pub rdev: u64,
    /// Literal target of a symbolic link
    pub symlink_target: Option<PathBuf>,
}

impl FileStatus {
    /// Capture the status of `path` without following symlinks
    ///
    /// # Errors
    ///
    /// - [`SnapshotError::Stat`] if the entry cannot be stat'ed
    /// - [`SnapshotError::ReadLink`] if the entry is a symlink whose target cannot be read
    pub fn capture(path: &Path) -> Result<Self> {
        let metadata = fs::symlink_metadata(path).map_err(|source| SnapshotError::Stat {
            path: path.to_path_buf(),
            source,
        })?;

        let mut status = Self::from_metadata(&metadata);
        if status.kind == EntryKind::Symlink {
            let target = utils::read_symlink(path).map_err(|source| SnapshotError::ReadLink {
                path: path.to_path_buf(),
                source,
            })?;
            status.symlink_target = Some(target);
        }
        Ok(status)
    }

    /// Build a status record from already fetched metadata
    ///
    /// The symlink target is left empty.
    pub fn from_metadata(metadata: &fs::Metadata) -> Self {
        Self {
            kind: EntryKind::from_file_type(metadata.file_type()),
            size: metadata.len(),
            permissions: utils::get_permissions(metadata),
            uid: metadata.uid(),
            gid: metadata.gid(),
            modified: FileTime::from_last_modification_time(metadata),
            accessed: FileTime::from_last_access_time(metadata),
            rdev: metadata.rdev(),
            symlink_target: None,
        }
    }

    /// Copy of this record with different permission bits
    pub fn with_permissions(&self, permissions: u32) -> Self {
        Self {
            permissions,
            ..self.clone()
        }
    }
}

/// Configuration for a snapshot run
#[derive(Debug, Clone)]
pub struct SnapshotConfig {
    /// strftime-style format naming snapshot directories
    pub date_format: String,
    /// Glob matched against absolute source paths; matches are skipped
    pub exclude_pattern: Option<String>,
    /// Copy every regular file even when the previous snapshot has it unchanged
    pub force_full_copy: bool,
    /// Track total and copied byte counts
    pub count_bytes: bool,
    /// Creation mask applied to final directory permissions
    pub creation_mask: u32,
    /// Mode for the snapshot directory and missing ancestors
    pub snapshot_mode: u32,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            date_format: DEFAULT_DATE_FORMAT.to_string(),
            exclude_pattern: None,
            force_full_copy: false,
            count_bytes: false,
            creation_mask: utils::process_umask(),
            snapshot_mode: DEFAULT_SNAPSHOT_MODE,
        }
    }
}

/// Counters accumulated while walking the source trees
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransferStats {
    /// Size of every regular file considered (byte counting only)
    pub total_bytes: u64,
    /// Size of every regular file copied (byte counting only)
    pub bytes_copied: u64,
    /// Regular files copied in full
    pub files_copied: usize,
    /// Regular files linked into the previous snapshot
    pub files_linked: usize,
    /// Directories recreated
    pub directories: usize,
    /// Symbolic links recreated
    pub symlinks: usize,
    /// FIFOs, device nodes and sockets recreated
    pub special_files: usize,
    /// Entries skipped by the exclusion pattern
    pub excluded: usize,
    /// Metadata replication steps that failed
    pub metadata_failures: usize,
}

impl TransferStats {
    /// Total number of entries written into the snapshot
    pub fn entries(&self) -> usize {
        self.files_copied + self.files_linked + self.directories + self.symlinks + self.special_files
    }
}

/// Result of a completed snapshot run
#[derive(Debug, Clone)]
pub struct SnapshotReport {
    /// The snapshot directory created by this run
    pub snapshot_path: PathBuf,
    /// The snapshot unchanged files were linked into, if any
    pub previous_snapshot: Option<PathBuf>,
    /// Transfer counters
    pub stats: TransferStats,
    /// Wall-clock time of the run
    pub duration: Duration,
}
