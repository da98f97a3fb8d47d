//! Tree walker and copy-or-link decision engine
//!
//! [`TreeWalker`] visits a source tree depth-first and reproduces every entry
//! underneath a new snapshot directory:
//!
//! | Entry        | Action                                                        |
//! |--------------|---------------------------------------------------------------|
//! | directory    | recreated, children processed, then permissions and times set |
//! | regular file | linked into the previous snapshot if unchanged, else copied   |
//! | symlink      | recreated with its literal target, ownership on the link      |
//! | FIFO         | recreated with `mkfifo`                                       |
//! | device/socket| recreated with `mknod`                                        |
//!
//! ## Change Detection
//!
//! A regular file is unchanged when its modification time equals, exactly,
//! the modification time of the file at the same relative path in the
//! previous snapshot. Size and content are never compared. Copies get the
//! source's modification time, so the next run sees them as unchanged.
//!
//! ## Failure Semantics
//!
//! The first failing entry aborts the directory that contains it, and that
//! failure propagates to every ancestor, so a directory is never presented
//! as complete when part of it is missing. Entries finished before the
//! failure are left in place. Metadata replication failures are the
//! exception: they are logged, counted and otherwise ignored.
//!
//! Excluded entries count as successes so an exclusion never aborts the
//! enclosing directory.

use crate::copy;
use crate::dirs;
use crate::error::{Result, SnapshotError};
use crate::link;
use crate::metadata::{self, Replication};
use crate::special;
use crate::types::{EntryKind, FileStatus, SnapshotConfig, TransferStats};
use crate::utils::{self, OWNER_RWX};
use filetime::FileTime;
use globset::GlobMatcher;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, trace, warn};

/// Walks source trees into one snapshot directory
#[derive(Debug)]
pub struct TreeWalker<'a> {
    config: &'a SnapshotConfig,
    exclude: Option<&'a GlobMatcher>,
    snapshot_root: &'a Path,
    previous_root: Option<&'a Path>,
    skip: Vec<PathBuf>,
    stats: TransferStats,
}

impl<'a> TreeWalker<'a> {
    /// Create a walker writing into `snapshot_root`, linking into `previous_root`
    pub fn new(
        config: &'a SnapshotConfig,
        exclude: Option<&'a GlobMatcher>,
        snapshot_root: &'a Path,
        previous_root: Option<&'a Path>,
    ) -> Self {
        Self {
            config,
            exclude,
            snapshot_root,
            previous_root,
            skip: Vec::new(),
            stats: TransferStats::default(),
        }
    }

    /// Never descend into `path` (given in absolute form)
    ///
    /// Used to keep the destination root out of its own snapshots when a
    /// source contains it.
    pub fn skip_path(mut self, path: PathBuf) -> Self {
        self.skip.push(path);
        self
    }

    /// Counters accumulated so far
    pub fn stats(&self) -> &TransferStats {
        &self.stats
    }

    /// Consume the walker, returning its counters
    pub fn into_stats(self) -> TransferStats {
        self.stats
    }

    /// Process `source` and, for a directory, everything beneath it
    ///
    /// # Errors
    ///
    /// Returns the first entry failure encountered; see the module docs.
    pub fn process(&mut self, source: &Path) -> Result<()> {
        let status = FileStatus::capture(source)?;

        if self.is_excluded(source)? {
            debug!("excluded {}", source.display());
            self.stats.excluded += 1;
            return Ok(());
        }

        let dest = utils::join_path(self.snapshot_root, source);
        let previous = self.previous_root.map(|root| utils::join_path(root, source));

        match status.kind {
            EntryKind::Directory => self.process_directory(source, &dest, &status),
            EntryKind::Regular => self.process_regular(source, &dest, previous.as_deref(), &status),
            EntryKind::Symlink => self.process_symlink(&dest, &status),
            EntryKind::Fifo => {
                special::create_fifo(&dest, &status)?;
                self.stats.special_files += 1;
                self.note(metadata::replicate(&dest, &status));
                Ok(())
            }
            EntryKind::BlockDevice | EntryKind::CharDevice | EntryKind::Socket => {
                special::create_node(&dest, &status)?;
                self.stats.special_files += 1;
                self.note(metadata::replicate(&dest, &status));
                Ok(())
            }
            EntryKind::Unknown => Err(SnapshotError::UnrecognizedType {
                path: source.to_path_buf(),
            }),
        }
    }

    fn is_excluded(&self, source: &Path) -> Result<bool> {
        if self.exclude.is_none() && self.skip.is_empty() {
            return Ok(false);
        }
        let absolute = utils::absolute_path(source)?;
        if self.skip.iter().any(|skip| *skip == absolute) {
            return Ok(true);
        }
        Ok(self.exclude.is_some_and(|matcher| matcher.is_match(&absolute)))
    }

    fn process_directory(&mut self, source: &Path, dest: &Path, status: &FileStatus) -> Result<()> {
        let working_mode = status.permissions | OWNER_RWX;
        dirs::create_dir_all_reporting(dest, working_mode, &mut |created: &Path| {
            info!("mkdir {}", created.display());
        })?;
        // The owner must be able to fill the directory whatever the source mode says
        utils::set_permissions(dest, working_mode).map_err(|e| SnapshotError::Creation {
            path: dest.to_path_buf(),
            source: e,
        })?;

        let entries = fs::read_dir(source).map_err(|e| SnapshotError::Open {
            path: source.to_path_buf(),
            source: e,
        })?;
        for entry in entries {
            let entry = entry.map_err(|e| SnapshotError::Open {
                path: source.to_path_buf(),
                source: e,
            })?;
            if utils::is_ignorable_name(&entry.file_name()) {
                continue;
            }
            self.process(&entry.path())?;
        }

        let final_status = status.with_permissions(status.permissions & !self.config.creation_mask);
        self.note(metadata::replicate(dest, &final_status));
        self.stats.directories += 1;
        Ok(())
    }

    fn process_regular(
        &mut self,
        source: &Path,
        dest: &Path,
        previous: Option<&Path>,
        status: &FileStatus,
    ) -> Result<()> {
        if self.config.count_bytes {
            self.stats.total_bytes += status.size;
        }

        match self.unchanged_in_previous(previous, status) {
            Some(previous) => {
                link::mirror_link(previous, dest)?;
                self.stats.files_linked += 1;
            }
            None => {
                if self.config.count_bytes {
                    self.stats.bytes_copied += status.size;
                }
                copy::copy_file(source, dest, status)?;
                self.note(metadata::replicate(dest, status));
                self.stats.files_copied += 1;
            }
        }
        Ok(())
    }

    /// The previous snapshot's copy of a file, if it can stand in for `status`
    fn unchanged_in_previous<'p>(
        &self,
        previous: Option<&'p Path>,
        status: &FileStatus,
    ) -> Option<&'p Path> {
        if self.config.force_full_copy {
            return None;
        }
        let previous = previous?;
        match fs::metadata(previous) {
            Ok(metadata) if FileTime::from_last_modification_time(&metadata) == status.modified => {
                Some(previous)
            }
            Ok(_) => {
                trace!("{:?} changed since previous snapshot", previous);
                None
            }
            Err(e) => {
                trace!("No usable previous copy at {:?}: {}", previous, e);
                None
            }
        }
    }

    fn process_symlink(&mut self, dest: &Path, status: &FileStatus) -> Result<()> {
        // Captured together with the status
        let target = status.symlink_target.as_deref().ok_or_else(|| SnapshotError::ReadLink {
            path: dest.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidData, "symlink target missing"),
        })?;
        link::recreate_symlink(target, dest)?;
        self.note(metadata::replicate_link_ownership(dest, status));
        self.stats.symlinks += 1;
        Ok(())
    }

    fn note(&mut self, replication: Replication) {
        for failure in replication.into_failures() {
            warn!("{}", failure);
            self.stats.metadata_failures += 1;
        }
    }
}
