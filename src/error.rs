//! Error types for the isnapshot library
//!
//! This module defines all error types that can occur while building a
//! snapshot. Per-entry errors always carry the offending path so a failed
//! run can be diagnosed from the error message alone.

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Type alias for Results in the isnapshot library
pub type Result<T> = std::result::Result<T, SnapshotError>;

/// Metadata replication step that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataStep {
    /// Access and modification times
    Times,
    /// Owner and group
    Ownership,
    /// Permission bits
    Permissions,
}

impl std::fmt::Display for MetadataStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            MetadataStep::Times => "time",
            MetadataStep::Ownership => "ownership",
            MetadataStep::Permissions => "permissions",
        };
        f.write_str(name)
    }
}

/// Main error type for all snapshot operations
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// Entry metadata could not be read
    #[error("could not stat {path:?}: {source}")]
    Stat {
        /// Entry that could not be stat'ed
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// Source or destination could not be opened
    #[error("unable to open {path:?}: {source}")]
    Open {
        /// Path that could not be opened
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// Directory, fifo, device node or symlink could not be created
    #[error("cannot create {path:?}: {source}")]
    Creation {
        /// Path that could not be created
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// Short or failed write while copying file content
    #[error("incomplete copy of {path:?}: {source}")]
    Copy {
        /// Source file being copied
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// Timestamp, ownership or permissions could not be applied
    #[error("could not set {step} on {path:?}: {source}")]
    Metadata {
        /// Destination path
        path: PathBuf,
        /// Which replication step failed
        step: MetadataStep,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// Symbolic link target could not be read
    #[error("cannot read symlink {path:?}: {source}")]
    ReadLink {
        /// Symlink path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// Entry is none of the handled kinds
    #[error("unrecognized file type: {path:?}")]
    UnrecognizedType {
        /// Path to the unrecognized entry
        path: PathBuf,
    },

    /// Destination root could not be opened while locating snapshots
    #[error("could not open root directory {path:?}: {source}")]
    LocatorOpen {
        /// Destination root
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// A snapshot with the same name already exists
    #[error("backup already exists for {0:?}")]
    SnapshotExists(PathBuf),

    /// Exclusion pattern does not compile
    #[error("invalid exclude pattern: {0}")]
    InvalidPattern(String),

    /// Timestamp format cannot name and re-parse snapshots
    #[error("invalid date format: {0}")]
    InvalidTimestampFormat(String),

    /// Bad arguments
    #[error("{0}")]
    Usage(String),

    /// I/O errors outside of per-entry processing
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl SnapshotError {
    /// Create a usage error with a custom message
    pub fn usage(msg: impl Into<String>) -> Self {
        SnapshotError::Usage(msg.into())
    }

    /// Path the error refers to, if any
    pub fn path(&self) -> Option<&Path> {
        match self {
            SnapshotError::Stat { path, .. }
            | SnapshotError::Open { path, .. }
            | SnapshotError::Creation { path, .. }
            | SnapshotError::Copy { path, .. }
            | SnapshotError::Metadata { path, .. }
            | SnapshotError::ReadLink { path, .. }
            | SnapshotError::UnrecognizedType { path }
            | SnapshotError::LocatorOpen { path, .. } => Some(path),
            SnapshotError::SnapshotExists(path) => Some(path),
            _ => None,
        }
    }

    /// Check if this error was raised while processing a single entry
    ///
    /// Entry failures abort the enclosing directory; everything else is a
    /// failure to set up the run itself.
    pub fn is_entry_failure(&self) -> bool {
        matches!(
            self,
            SnapshotError::Stat { .. }
                | SnapshotError::Open { .. }
                | SnapshotError::Creation { .. }
                | SnapshotError::Copy { .. }
                | SnapshotError::ReadLink { .. }
                | SnapshotError::UnrecognizedType { .. }
        )
    }
}
