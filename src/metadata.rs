//! Metadata replication
//!
//! Writes the timestamps, ownership and permission bits of a captured
//! [`FileStatus`] onto a destination path. Every step is attempted even if an
//! earlier one fails; the failures are collected in a [`Replication`] so the
//! caller can report them without aborting the entry.

use crate::error::{MetadataStep, SnapshotError};
use crate::types::FileStatus;
use crate::utils::{self, SETID_BITS};
use std::path::Path;
use tracing::trace;

/// Outcome of a metadata replication
#[derive(Debug, Default)]
#[must_use]
pub struct Replication {
    failures: Vec<SnapshotError>,
}

impl Replication {
    /// True only if every step succeeded
    pub fn succeeded(&self) -> bool {
        self.failures.is_empty()
    }

    /// Failed steps, in the order they were attempted
    pub fn failures(&self) -> &[SnapshotError] {
        &self.failures
    }

    /// Consume the outcome, returning the failed steps
    pub fn into_failures(self) -> Vec<SnapshotError> {
        self.failures
    }

    fn record(&mut self, path: &Path, step: MetadataStep, result: std::io::Result<()>) -> bool {
        match result {
            Ok(()) => true,
            Err(source) => {
                self.failures.push(SnapshotError::Metadata {
                    path: path.to_path_buf(),
                    step,
                    source,
                });
                false
            }
        }
    }
}

/// Apply times, then ownership, then permissions from `status` onto `dest`
///
/// When ownership cannot be changed the setuid and setgid bits are dropped
/// before permissions are applied, so a file never ends up privileged for
/// the wrong owner.
pub fn replicate(dest: &Path, status: &FileStatus) -> Replication {
    let mut replication = Replication::default();

    replication.record(
        dest,
        MetadataStep::Times,
        filetime::set_file_times(dest, status.accessed, status.modified),
    );

    let owned = replication.record(
        dest,
        MetadataStep::Ownership,
        std::os::unix::fs::chown(dest, Some(status.uid), Some(status.gid)),
    );
    let permissions = effective_permissions(status.permissions, owned);

    replication.record(
        dest,
        MetadataStep::Permissions,
        utils::set_permissions(dest, permissions),
    );

    trace!("Replicated metadata onto {:?} ({:o})", dest, permissions);
    replication
}

/// Permission bits to apply once ownership has been attempted
///
/// setuid and setgid are only kept when the owner was replicated.
pub fn effective_permissions(permissions: u32, owned: bool) -> u32 {
    if owned {
        permissions
    } else {
        permissions & !SETID_BITS
    }
}

/// Apply ownership from `status` onto the symlink `dest` itself
pub fn replicate_link_ownership(dest: &Path, status: &FileStatus) -> Replication {
    let mut replication = Replication::default();
    replication.record(
        dest,
        MetadataStep::Ownership,
        std::os::unix::fs::lchown(dest, Some(status.uid), Some(status.gid)),
    );
    replication
}
