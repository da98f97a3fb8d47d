//! Previous-snapshot locator
//!
//! Scans a destination root for subdirectories whose names decode under the
//! active [`TimestampFormat`] and picks the one with the latest decoded time.
//! Names that do not decode are skipped, so unrelated files can live next to
//! the snapshots.
//!
//! ## Tie-breaking
//!
//! Directory enumeration order carries no meaning, so when two names decode
//! to the same time the lexically greatest name wins. The result is the same
//! on every filesystem.

use crate::error::{Result, SnapshotError};
use crate::timestamp::TimestampFormat;
use crate::utils;
use chrono::NaiveDateTime;
use std::cmp::Ordering;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, trace, warn};

/// A snapshot directory found under a destination root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotEntry {
    /// Full path of the snapshot directory
    pub path: PathBuf,
    /// Directory name
    pub name: OsString,
    /// Time decoded from the name
    pub taken_at: NaiveDateTime,
}

impl SnapshotEntry {
    fn cmp_recency(&self, other: &Self) -> Ordering {
        self.taken_at
            .cmp(&other.taken_at)
            .then_with(|| self.name.cmp(&other.name))
    }
}

/// List every snapshot under `root`, oldest first
///
/// # Errors
///
/// [`SnapshotError::LocatorOpen`] if `root` cannot be read.
pub fn scan_snapshots(root: &Path, format: &TimestampFormat) -> Result<Vec<SnapshotEntry>> {
    let entries = fs::read_dir(root).map_err(|source| SnapshotError::LocatorOpen {
        path: root.to_path_buf(),
        source,
    })?;

    let mut snapshots = Vec::new();
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable entry in {:?}: {}", root, e);
                continue;
            }
        };

        let name = entry.file_name();
        if utils::is_ignorable_name(&name) {
            continue;
        }

        let Some(taken_at) = name.to_str().and_then(|s| format.parse(s)) else {
            trace!("Ignoring {:?}: does not match {}", name, format);
            continue;
        };

        if !entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
            trace!("Ignoring {:?}: not a directory", name);
            continue;
        }

        snapshots.push(SnapshotEntry {
            path: entry.path(),
            name,
            taken_at,
        });
    }

    snapshots.sort_by(SnapshotEntry::cmp_recency);
    Ok(snapshots)
}

/// Find the most recent snapshot under `root`
///
/// Returns `Ok(None)` when `root` holds no snapshot.
///
/// # Errors
///
/// [`SnapshotError::LocatorOpen`] if `root` cannot be read.
pub fn locate_previous(root: &Path, format: &TimestampFormat) -> Result<Option<PathBuf>> {
    let latest = scan_snapshots(root, format)?.pop();
    match &latest {
        Some(entry) => debug!("Latest snapshot under {:?} is {:?}", root, entry.name),
        None => debug!("No snapshot under {:?}", root),
    }
    Ok(latest.map(|entry| entry.path))
}
