//! Snapshot runs
//!
//! [`Snapshotter`] ties the pieces together for one run:
//!
//! 1. locate the most recent snapshot under the destination root
//! 2. create a new snapshot directory named after the current time
//! 3. walk every source root into it, linking unchanged files into the
//!    previous snapshot
//!
//! ## Examples
//!
//! ```rust,no_run
//! use isnapshot::SnapshotterBuilder;
//! use std::path::PathBuf;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let snapshotter = SnapshotterBuilder::new()
//!     .exclude_pattern("*.tmp")
//!     .count_bytes(true)
//!     .build(vec![PathBuf::from("/home/user/work")], PathBuf::from("/backup"))?;
//!
//! let report = snapshotter.snapshot()?;
//! println!("Copied {} of {} bytes", report.stats.bytes_copied, report.stats.total_bytes);
//! # Ok(())
//! # }
//! ```

use crate::dirs;
use crate::error::{Result, SnapshotError};
use crate::locator;
use crate::timestamp::TimestampFormat;
use crate::types::{SnapshotConfig, SnapshotReport};
use crate::utils;
use crate::walker::TreeWalker;
use chrono::{Local, NaiveDateTime};
use globset::{GlobBuilder, GlobMatcher};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, instrument};

/// Creates snapshots of a fixed set of source roots under one destination root
#[derive(Debug)]
pub struct Snapshotter {
    sources: Vec<PathBuf>,
    destination: PathBuf,
    config: SnapshotConfig,
    format: TimestampFormat,
    exclude: Option<GlobMatcher>,
}

impl Snapshotter {
    /// Source roots, as given
    pub fn sources(&self) -> &[PathBuf] {
        &self.sources
    }

    /// Absolute destination root
    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// Active configuration
    pub fn config(&self) -> &SnapshotConfig {
        &self.config
    }

    /// Most recent snapshot under the destination root
    ///
    /// A destination root that does not exist yet has no snapshots.
    pub fn previous_snapshot(&self) -> Result<Option<PathBuf>> {
        match locator::locate_previous(&self.destination, &self.format) {
            Err(SnapshotError::LocatorOpen { source, .. })
                if source.kind() == io::ErrorKind::NotFound =>
            {
                Ok(None)
            }
            other => other,
        }
    }

    /// Take a snapshot named after the current local time
    pub fn snapshot(&self) -> Result<SnapshotReport> {
        self.snapshot_at(Local::now().naive_local())
    }

    /// Take a snapshot named after `now`
    ///
    /// # Errors
    ///
    /// - [`SnapshotError::LocatorOpen`] if the destination root exists but cannot be read
    /// - [`SnapshotError::SnapshotExists`] if a snapshot with this name already exists
    /// - [`SnapshotError::Creation`] if the snapshot directory cannot be created
    /// - the first entry failure from any source root
    #[instrument(skip(self), fields(destination = ?self.destination))]
    pub fn snapshot_at(&self, now: NaiveDateTime) -> Result<SnapshotReport> {
        let start = Instant::now();

        let previous = self.previous_snapshot()?;
        let name = self.format.render(now)?;
        let snapshot_path = self.destination.join(&name);

        info!("backing up to {}", snapshot_path.display());

        if fs::symlink_metadata(&snapshot_path).is_ok() {
            return Err(SnapshotError::SnapshotExists(snapshot_path));
        }

        dirs::create_dir_all_reporting(&snapshot_path, self.config.snapshot_mode, &mut |created: &Path| {
            info!("mkdir {}", created.display());
        })?;

        if let Some(previous) = &previous {
            info!("using previous backup at {}", previous.display());
        }

        let mut walker = TreeWalker::new(
            &self.config,
            self.exclude.as_ref(),
            &snapshot_path,
            previous.as_deref(),
        )
        .skip_path(self.destination.clone());

        for source in &self.sources {
            if let Err(e) = walker.process(source) {
                debug!("Snapshot {} failed with partial counts {:?}", name, walker.stats());
                return Err(e);
            }
        }

        let stats = walker.into_stats();
        info!(
            "Snapshot {} complete: {} copied, {} linked, {} entries",
            name,
            stats.files_copied,
            stats.files_linked,
            stats.entries()
        );

        Ok(SnapshotReport {
            snapshot_path,
            previous_snapshot: previous,
            stats,
            duration: start.elapsed(),
        })
    }
}

/// Builder for [`Snapshotter`]
///
/// # Default Values
///
/// - `date_format`: `%m-%d-%y-%H-%M-%S`
/// - `exclude_pattern`: none
/// - `force_full_copy`: false
/// - `count_bytes`: false
/// - `creation_mask`: the process umask
/// - `snapshot_mode`: `0o755`
#[derive(Debug, Default)]
pub struct SnapshotterBuilder {
    config: SnapshotConfig,
}

impl SnapshotterBuilder {
    /// Create a new builder with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the strftime-style format naming snapshot directories
    ///
    /// The same format decodes existing snapshot names, so it has to
    /// round-trip; [`build`](Self::build) rejects formats that don't.
    pub fn date_format(mut self, format: impl Into<String>) -> Self {
        self.config.date_format = format.into();
        self
    }

    /// Skip source entries whose absolute path matches `pattern`
    ///
    /// `*` also matches `/`, so `*.o` excludes object files at any depth
    /// and `*/target` excludes every `target` directory with its contents.
    pub fn exclude_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.config.exclude_pattern = Some(pattern.into());
        self
    }

    /// Copy every regular file instead of linking unchanged ones
    pub fn force_full_copy(mut self, force: bool) -> Self {
        self.config.force_full_copy = force;
        self
    }

    /// Track total and copied byte counts
    pub fn count_bytes(mut self, count: bool) -> Self {
        self.config.count_bytes = count;
        self
    }

    /// Set the creation mask applied to final directory permissions
    pub fn creation_mask(mut self, mask: u32) -> Self {
        self.config.creation_mask = mask & 0o777;
        self
    }

    /// Set the mode of the snapshot directory and missing ancestors
    pub fn snapshot_mode(mut self, mode: u32) -> Self {
        self.config.snapshot_mode = mode & utils::PERMISSION_BITS;
        self
    }

    /// Replace the whole configuration
    pub fn config(mut self, config: SnapshotConfig) -> Self {
        self.config = config;
        self
    }

    /// Validate the configuration and build the [`Snapshotter`]
    ///
    /// # Errors
    ///
    /// - [`SnapshotError::Usage`] if `sources` is empty
    /// - [`SnapshotError::InvalidTimestampFormat`] if the date format does not round-trip
    /// - [`SnapshotError::InvalidPattern`] if the exclude pattern does not compile
    pub fn build(self, sources: Vec<PathBuf>, destination: PathBuf) -> Result<Snapshotter> {
        if sources.is_empty() {
            return Err(SnapshotError::usage("not enough arguments"));
        }

        let format = TimestampFormat::new(self.config.date_format.clone())?;

        let exclude = self
            .config
            .exclude_pattern
            .as_deref()
            .map(|pattern| {
                GlobBuilder::new(pattern)
                    .literal_separator(false)
                    .build()
                    .map(|glob| glob.compile_matcher())
                    .map_err(|e| SnapshotError::InvalidPattern(e.to_string()))
            })
            .transpose()?;

        // Mirror links store this path, so it must not be relative
        let destination = utils::absolute_path(&destination)?;

        Ok(Snapshotter {
            sources,
            destination,
            config: self.config,
            format,
            exclude,
        })
    }
}
